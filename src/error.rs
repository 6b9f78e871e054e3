//! Error taxonomy shared by the dispatchers.
//!
//! [`DispatchError`] is what `translate`, `transcribe` and `synthesize`
//! return.  Remote failures are normally absorbed by a fallback strategy and
//! only reach the caller when no fallback applies.

use thiserror::Error;

use crate::audio::AudioError;
use crate::speech::SpeechError;

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

/// Errors surfaced by the translation, speech-to-text and text-to-speech
/// dispatchers.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Empty input, or identical source and target languages.
    #[error("invalid request: {0}")]
    Validation(String),

    /// No translation endpoint is configured for either direction.
    #[error("no translation model available for {from} to {to}")]
    UnsupportedLanguagePair { from: String, to: String },

    /// The language has no ASR/TTS route.
    #[error("language not supported: {0}")]
    UnsupportedLanguage(String),

    /// Non-2xx response, transport failure, or an unusable response body.
    #[error("remote call failed: {0}")]
    RemoteCall(String),

    /// Capture or recognition finished without any text.
    #[error("no speech detected")]
    NoSpeechDetected,

    /// Microphone or playback failure.
    #[error("audio error: {0}")]
    Audio(#[from] AudioError),

    /// Platform speech recogniser/synthesiser failure.
    #[error("speech engine error: {0}")]
    Speech(#[from] SpeechError),
}

impl From<reqwest::Error> for DispatchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DispatchError::RemoteCall("request timed out".into())
        } else {
            DispatchError::RemoteCall(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_pair_names_both_languages() {
        let e = DispatchError::UnsupportedLanguagePair {
            from: "en".into(),
            to: "luo".into(),
        };
        assert_eq!(e.to_string(), "no translation model available for en to luo");
        // Language codes are payload, not a wrapped cause.
        assert!(std::error::Error::source(&e).is_none());
    }

    #[test]
    fn no_speech_display() {
        assert_eq!(DispatchError::NoSpeechDetected.to_string(), "no speech detected");
    }

    #[test]
    fn audio_error_converts() {
        let e: DispatchError = AudioError::NoDevice.into();
        assert!(matches!(e, DispatchError::Audio(AudioError::NoDevice)));
    }
}
