//! Agricultural translation assistant: English ↔ Giriama text translation,
//! speech-to-text and text-to-speech behind ordered fallback chains.
//!
//! # Layout
//!
//! ```text
//! service ─┬─ translate ─┐
//!          ├─ stt ───────┼─ fallback ─ remote ─ registry
//!          ├─ tts ───────┘      │
//!          └─ history           └─ speech / audio (platform capabilities)
//! ```
//!
//! [`service::TranslationService`] is the usual entry point.

pub mod audio;
pub mod config;
pub mod error;
pub mod fallback;
pub mod history;
pub mod language;
pub mod phase;
pub mod registry;
pub mod remote;
pub mod service;
pub mod speech;
pub mod stt;
pub mod translate;
pub mod tts;

pub use error::{DispatchError, Result};
pub use service::{Origin, Platform, TranslationService};
