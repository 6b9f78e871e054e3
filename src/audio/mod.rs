//! Audio adapter — finite microphone recordings and cancellable playback.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → Vec<f32> → downmix → resample(sample_rate)
//!           → LINEAR16 → hound WAV AudioClip → dispatcher
//!
//! SpeechAudio → AudioClip → AudioPlayer (external command) ⟂ StopSignal
//! ```
//!
//! Both live operations take a [`StopSignal`]; a caller keeps the matching
//! [`StopHandle`] to end them early.

pub mod capture;
pub mod pcm;
pub mod playback;
pub mod stop;

pub use capture::{AudioCapturer, AudioClip, AudioError, UnavailableCapturer};
#[cfg(feature = "microphone")]
pub use capture::CpalCapturer;
pub use playback::{AudioPlayer, CommandPlayer, UnavailablePlayer};
pub use stop::{stop_channel, StopHandle, StopSignal};

#[cfg(test)]
pub use capture::MockCapturer;
#[cfg(test)]
pub use playback::MockPlayer;
