//! Text-to-speech dispatcher and playback.
//!
//! ```text
//! synthesize(text, lang)
//!   Widely:      cloud (key > 10 chars) ─▶ native synthesiser
//!   LowResource: custom endpoint        ─▶ silent placeholder
//!
//! play(&SpeechAudio) ─▶ Playback { stop(), wait() }
//! ```

pub mod audio;
pub mod dispatcher;
pub mod playback;
pub mod state;

pub use audio::{SpeechAudio, SpeechSource, SILENT_WAV};
pub use dispatcher::{
    CloudSynthesis, CustomSynthesis, NativeSynthesis, SilencePlaceholder, TextToSpeechDispatcher,
    TtsJob,
};
pub use playback::Playback;
pub use state::TtsPhase;
