//! Speech-to-text dispatcher.
//!
//! ```text
//!                       ┌────────── Widely ──────────┐
//! transcribe(lang) ─▶ profile ─▶ cloud (key > 10 chars) ─▶ native (10 s cutoff)
//!                       └──────── LowResource ───────┘
//!                                 custom endpoint ─▶ demo transcript (demo mode)
//! ```
//!
//! Unknown languages fail before the microphone is touched.

pub mod dispatcher;
pub mod state;

pub use dispatcher::{
    CloudRecognition, CustomRecognition, DemoTranscript, NativeRecognition,
    SpeechToTextDispatcher, SttJob, DEMO_TRANSCRIPT,
};
pub use state::SttPhase;
