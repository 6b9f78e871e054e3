//! Application settings structs, defaults and TOML persistence.
//!
//! Precedence, lowest first: built-in defaults, `settings.toml`, `AGRI_*`
//! environment variables (see [`AppConfig::apply_env`]), then runtime
//! reconfiguration through the endpoint registry.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::language::{LanguageNormalizer, LanguageProfile, TokenMapping};
use crate::registry::{EndpointOverrides, EndpointTables};

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Generation parameters sent with every remote translation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub max_length: u32,
    pub num_beams: u32,
    /// Per-request timeout for the translation endpoint.
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_length: 150,
            num_beams: 5,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings shared by the speech-to-text and text-to-speech dispatchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Fixed capture window for cloud and custom recognition.
    pub record_secs: u64,
    /// Safety cutoff for the on-device recogniser.
    pub native_timeout_secs: u64,
    /// Rate microphone clips are resampled to, and the rate declared to the
    /// cloud recogniser.
    pub sample_rate: u32,
    /// A cloud key is only used when it is longer than this.
    pub min_cloud_key_len: usize,
    /// Per-request timeout for ASR/TTS endpoints.
    pub timeout_secs: u64,
    /// Voice requested from the cloud synthesiser.
    pub cloud_voice: String,
    /// On-device synthesiser command; `{locale}` and `{lang}` are expanded and
    /// the text is appended.
    pub synth_command: Vec<String>,
    /// Player command; the audio file path is appended.
    pub player_command: Vec<String>,
    /// GGML model for the on-device recogniser (feature `whisper`).
    pub whisper_model: Option<PathBuf>,
    /// Input device name; `None` means the system default.
    pub input_device: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            record_secs: 5,
            native_timeout_secs: 10,
            sample_rate: crate::audio::pcm::TARGET_SAMPLE_RATE,
            min_cloud_key_len: 10,
            timeout_secs: 30,
            cloud_voice: "en-US-Wavenet-D".into(),
            synth_command: vec!["espeak-ng".into(), "-v".into(), "{lang}".into()],
            player_command: vec![
                "ffplay".into(),
                "-nodisp".into(),
                "-autoexit".into(),
                "-loglevel".into(),
                "quiet".into(),
            ],
            whisper_model: None,
            input_device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Remote history endpoint.  Entries are only forwarded when this is set.
    pub remote_url: Option<String>,
    /// Overrides the store directory from [`AppPaths`].
    pub store_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use agri_translate::config::AppConfig;
///
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env(|name| std::env::var(name).ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Enables the canned speech-to-text answer for the low-resource tier.
    pub demo_mode: bool,
    pub translation: TranslationConfig,
    pub speech: SpeechConfig,
    pub history: HistoryConfig,
    pub endpoints: EndpointTables,
    pub languages: Vec<LanguageProfile>,
    /// Application-code to model-token table.
    pub normalizer: Vec<TokenMapping>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            demo_mode: false,
            translation: TranslationConfig::default(),
            speech: SpeechConfig::default(),
            history: HistoryConfig::default(),
            endpoints: EndpointTables::default(),
            languages: LanguageProfile::defaults(),
            normalizer: TokenMapping::defaults(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }

    /// Layer `AGRI_*` variables over the loaded settings.
    ///
    /// `lookup` is normally `|name| std::env::var(name).ok()`; tests pass a
    /// closure over a fixed map.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides = EndpointOverrides::from_lookup(&lookup);
        if !overrides.is_empty() {
            log::debug!("config: applying endpoint overrides from environment");
            self.endpoints.merge(&overrides);
        }

        if let Some(url) = lookup("AGRI_HISTORY_URL").filter(|v| !v.trim().is_empty()) {
            self.history.remote_url = Some(url);
        }

        if let Some(raw) = lookup("AGRI_DEMO_MODE") {
            match parse_flag(&raw) {
                Some(flag) => self.demo_mode = flag,
                None => log::warn!("config: ignoring AGRI_DEMO_MODE={raw:?}"),
            }
        }
    }

    pub fn normalizer(&self) -> LanguageNormalizer {
        LanguageNormalizer::new(self.languages.clone(), self.normalizer.clone())
    }

    /// Store directory, honouring the `history.store_dir` override.
    pub fn store_dir(&self) -> PathBuf {
        self.history
            .store_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().store_dir)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
