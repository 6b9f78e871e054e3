//! Observable phase of the speech-to-text dispatcher.
//!
//! ```text
//! Idle ──transcribe()──▶ Capturing ──clip ready──▶ Transcribing ──▶ Idle
//!                            │                          │
//!                            └──────────error───────────┴──▶ Failed
//! Failed ──next transcribe()──▶ Capturing
//! ```

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SttPhase {
    #[default]
    Idle,
    /// The microphone or on-device recogniser is listening.
    Capturing,
    /// A clip is being sent to a remote recogniser.
    Transcribing,
    /// The last attempt ended with an error.
    Failed,
}

impl SttPhase {
    /// `true` while a capture or transcription is in flight.  Callers use it
    /// to refuse a second concurrent capture.
    pub fn is_busy(&self) -> bool {
        matches!(self, SttPhase::Capturing | SttPhase::Transcribing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SttPhase::Idle => "Idle",
            SttPhase::Capturing => "Listening",
            SttPhase::Transcribing => "Transcribing",
            SttPhase::Failed => "Error",
        }
    }
}
