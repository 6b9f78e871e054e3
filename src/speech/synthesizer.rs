//! On-device speech synthesis, the fallback of the text-to-speech dispatcher
//! for widely-supported languages.
//!
//! Native synthesis speaks directly to the output device and hands back no
//! audio, so the dispatcher returns a placeholder reference on this path.

use async_trait::async_trait;
use tokio::process::Command;

use super::recognizer::SpeechError;

/// Speaks `text` in `locale` (e.g. `en-US`).
///
/// Returns once speech has started; completion is not awaited.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str, locale: &str) -> Result<(), SpeechError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechSynthesizer>) {}
};

/// Synthesiser for hosts without a configured TTS program.
#[derive(Debug, Default, Clone)]
pub struct UnavailableSynthesizer;

#[async_trait]
impl SpeechSynthesizer for UnavailableSynthesizer {
    async fn speak(&self, _text: &str, locale: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable(format!("no synthesiser configured for {locale}")))
    }
}

// ---------------------------------------------------------------------------
// CommandSynthesizer
// ---------------------------------------------------------------------------

/// Runs an external TTS program such as `espeak-ng`.
///
/// Arguments may contain `{locale}` (`en-US`) and `{lang}` (`en`); the text
/// is appended as the final argument.
#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
}

impl CommandSynthesizer {
    /// Build from a command line; `None` for an empty command.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn expand_args(&self, locale: &str) -> Vec<String> {
        let lang = locale.split('-').next().unwrap_or(locale);
        self.args
            .iter()
            .map(|a| a.replace("{locale}", locale).replace("{lang}", lang))
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str, locale: &str) -> Result<(), SpeechError> {
        let mut child = Command::new(&self.program)
            .args(self.expand_args(locale))
            .arg(text)
            .spawn()
            .map_err(|e| SpeechError::Unavailable(format!("{}: {e}", self.program)))?;

        let program = self.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    log::warn!("synth: {program} exited with {status}");
                }
                Err(e) => log::warn!("synth: waiting on {program} failed: {e}"),
                Ok(_) => {}
            }
        });

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer (test only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub struct MockSynthesizer {
    fail: bool,
    pub spoken: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl MockSynthesizer {
    pub fn ok() -> Self {
        Self {
            fail: false,
            spoken: Default::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            spoken: Default::default(),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn speak(&self, text: &str, locale: &str) -> Result<(), SpeechError> {
        if self.fail {
            return Err(SpeechError::Unavailable("mock synthesiser".into()));
        }
        self.spoken
            .lock()
            .unwrap()
            .push((text.to_string(), locale.to_string()));
        Ok(())
    }
}
