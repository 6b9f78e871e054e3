//! Configuration for the translation service.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each
//! dispatcher, `AppPaths` for cross-platform directories, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, HistoryConfig, SpeechConfig, TranslationConfig};
