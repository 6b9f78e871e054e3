//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\agri-translate\
//!   macOS:   ~/Library/Application Support/agri-translate/
//!   Linux:   ~/.config/agri-translate/
//!
//! Data dir (history store, Whisper models):
//!   Windows: %LOCALAPPDATA%\agri-translate\
//!   macOS:   ~/Library/Application Support/agri-translate/
//!   Linux:   ~/.local/share/agri-translate/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory backing the key-value store (one JSON file per key).
    pub store_dir: PathBuf,
    /// Directory for GGML Whisper model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "agri-translate";

    /// Resolves all paths using the `dirs` crate, falling back to the
    /// current directory when the platform has no standard location.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            store_dir: data_dir.join("store"),
            models_dir: data_dir.join("models"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_namespaced_by_app() {
        let paths = AppPaths::new();
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths.config_dir.ends_with("agri-translate"));
        assert!(paths.store_dir.ends_with("store"));
        assert!(paths
            .models_dir
            .parent()
            .is_some_and(|p| p.ends_with("agri-translate")));
    }
}
