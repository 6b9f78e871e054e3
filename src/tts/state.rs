//! Observable phase of the text-to-speech dispatcher.

/// `Idle → Synthesizing → Idle`, then `Playing` while a clip is audible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsPhase {
    #[default]
    Idle,
    Synthesizing,
    Playing,
}

impl TtsPhase {
    pub fn is_busy(&self) -> bool {
        !matches!(self, TtsPhase::Idle)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TtsPhase::Idle => "Idle",
            TtsPhase::Synthesizing => "Generating speech",
            TtsPhase::Playing => "Playing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_is_the_only_quiet_phase() {
        assert!(!TtsPhase::Idle.is_busy());
        assert!(TtsPhase::Synthesizing.is_busy());
        assert!(TtsPhase::Playing.is_busy());
        assert_eq!(TtsPhase::Playing.label(), "Playing");
    }
}
