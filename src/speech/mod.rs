//! Platform speech capabilities used as fallbacks by the dispatchers.
//!
//! * [`SpeechRecognizer`] — on-device recognition (Whisper when built with
//!   the `whisper` feature).
//! * [`SpeechSynthesizer`] — on-device synthesis through an external program.

pub mod recognizer;
pub mod synthesizer;

pub use recognizer::{SpeechError, SpeechRecognizer, UnavailableRecognizer};
#[cfg(feature = "whisper")]
pub use recognizer::WhisperRecognizer;
pub use synthesizer::{CommandSynthesizer, SpeechSynthesizer, UnavailableSynthesizer};

#[cfg(test)]
pub use recognizer::MockRecognizer;
#[cfg(test)]
pub use synthesizer::MockSynthesizer;
