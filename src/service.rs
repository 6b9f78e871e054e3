//! One object bundling the dispatchers, the shared registry and history.
//!
//! A UI (or the CLI) builds a [`TranslationService`] once and calls it from
//! any task.  Every dispatcher sees the same [`SharedRegistry`], so
//! [`configure`](TranslationService::configure) takes effect for the next
//! request of each kind.

use std::sync::Arc;

use anyhow::Context as _;

use crate::audio::{AudioCapturer, AudioPlayer, CommandPlayer, StopSignal, UnavailablePlayer};
use crate::config::AppConfig;
use crate::error::Result;
use crate::history::{HistoryStore, NewHistoryItem};
use crate::language::LanguageNormalizer;
use crate::registry::{new_shared_registry, write_registry, EndpointOverrides, SharedRegistry};
use crate::speech::{CommandSynthesizer, SpeechRecognizer, SpeechSynthesizer, UnavailableSynthesizer};
use crate::stt::SpeechToTextDispatcher;
use crate::translate::TranslationDispatcher;
use crate::tts::{Playback, SpeechAudio, TextToSpeechDispatcher};

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Host audio and speech capabilities handed to the dispatchers.
#[derive(Clone)]
pub struct Platform {
    pub capturer: Arc<dyn AudioCapturer>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub player: Arc<dyn AudioPlayer>,
}

impl Platform {
    /// Real capabilities where this build and `config` provide them,
    /// `Unavailable*` stand-ins elsewhere.
    pub fn from_config(config: &AppConfig) -> Self {
        let capturer = microphone(config);
        let recognizer = native_recognizer(config, &capturer);

        let synthesizer: Arc<dyn SpeechSynthesizer> =
            match CommandSynthesizer::from_command(&config.speech.synth_command) {
                Some(synth) => Arc::new(synth),
                None => Arc::new(UnavailableSynthesizer),
            };
        let player: Arc<dyn AudioPlayer> =
            match CommandPlayer::from_command(&config.speech.player_command) {
                Some(player) => Arc::new(player),
                None => Arc::new(UnavailablePlayer),
            };

        Self {
            capturer,
            recognizer,
            synthesizer,
            player,
        }
    }
}

#[cfg(feature = "microphone")]
fn microphone(config: &AppConfig) -> Arc<dyn AudioCapturer> {
    Arc::new(crate::audio::CpalCapturer::new(
        config.speech.input_device.clone(),
        config.speech.sample_rate,
    ))
}

#[cfg(not(feature = "microphone"))]
fn microphone(_config: &AppConfig) -> Arc<dyn AudioCapturer> {
    Arc::new(crate::audio::UnavailableCapturer)
}

#[cfg(feature = "whisper")]
fn native_recognizer(config: &AppConfig, capturer: &Arc<dyn AudioCapturer>) -> Arc<dyn SpeechRecognizer> {
    let model = config
        .speech
        .whisper_model
        .clone()
        .unwrap_or_else(|| crate::config::AppPaths::new().models_dir.join("ggml-base.bin"));
    let window = std::time::Duration::from_secs(config.speech.native_timeout_secs);

    match crate::speech::WhisperRecognizer::load(&model, Arc::clone(capturer), window) {
        Ok(recognizer) => {
            log::info!("service: on-device recognition with {}", model.display());
            Arc::new(recognizer)
        }
        Err(e) => {
            log::warn!("service: on-device recognition disabled: {e}");
            Arc::new(crate::speech::UnavailableRecognizer)
        }
    }
}

#[cfg(not(feature = "whisper"))]
fn native_recognizer(_config: &AppConfig, _capturer: &Arc<dyn AudioCapturer>) -> Arc<dyn SpeechRecognizer> {
    Arc::new(crate::speech::UnavailableRecognizer)
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Where a translation was requested from; decides the history flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Dashboard,
    /// The public landing-page demo.  Never forwarded to remote history.
    Demo,
    Other,
}

// ---------------------------------------------------------------------------
// TranslationService
// ---------------------------------------------------------------------------

pub struct TranslationService {
    registry: SharedRegistry,
    normalizer: Arc<LanguageNormalizer>,
    translator: TranslationDispatcher,
    speech_to_text: SpeechToTextDispatcher,
    text_to_speech: TextToSpeechDispatcher,
    history: HistoryStore,
}

impl TranslationService {
    pub fn new(config: &AppConfig, platform: Platform, history: HistoryStore) -> Self {
        let registry = new_shared_registry(config.endpoints.clone());
        let normalizer = Arc::new(config.normalizer());

        let translator = TranslationDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&normalizer),
            &config.translation,
        );
        let speech_to_text = SpeechToTextDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&normalizer),
            platform.capturer,
            platform.recognizer,
            &config.speech,
            config.demo_mode,
        );
        let text_to_speech = TextToSpeechDispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&normalizer),
            platform.synthesizer,
            platform.player,
            &config.speech,
        );

        Self {
            registry,
            normalizer,
            translator,
            speech_to_text,
            text_to_speech,
            history,
        }
    }

    /// Build with host capabilities and the history store from `config`.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let dir = config.store_dir();
        let history = HistoryStore::open(&dir, config.history.remote_url.clone())
            .with_context(|| format!("opening history store at {}", dir.display()))?;
        Ok(Self::new(config, Platform::from_config(config), history))
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn translator(&self) -> &TranslationDispatcher {
        &self.translator
    }

    pub fn speech_to_text(&self) -> &SpeechToTextDispatcher {
        &self.speech_to_text
    }

    pub fn text_to_speech(&self) -> &TextToSpeechDispatcher {
        &self.text_to_speech
    }

    /// Apply a partial endpoint reconfiguration.
    pub fn configure(&self, overrides: &EndpointOverrides) {
        write_registry(&self.registry).configure(overrides);
        log::info!("service: endpoints reconfigured");
    }

    pub async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        self.translator.translate(text, source, target).await
    }

    /// Translate, then record the result under the languages' labels.
    /// Nothing is recorded when translation fails.
    pub async fn translate_and_record(
        &self,
        text: &str,
        source: &str,
        target: &str,
        origin: Origin,
    ) -> Result<String> {
        let translated = self.translator.translate(text, source, target).await?;
        self.history.record(
            NewHistoryItem::new(
                text,
                translated.clone(),
                self.normalizer.label(source),
                self.normalizer.label(target),
            )
            .from_dashboard(origin == Origin::Dashboard)
            .demo(origin == Origin::Demo),
        );
        Ok(translated)
    }

    pub async fn transcribe(&self, language: &str, stop: StopSignal) -> Result<String> {
        self.speech_to_text.transcribe(language, stop).await
    }

    pub async fn synthesize(&self, text: &str, language: &str) -> Result<SpeechAudio> {
        self.text_to_speech.synthesize(text, language).await
    }

    pub fn play(&self, audio: &SpeechAudio) -> Playback {
        self.text_to_speech.play(audio)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MockCapturer, MockPlayer};
    use crate::error::DispatchError;
    use crate::registry::{Capability, EndpointConfig, EndpointTables};
    use crate::speech::{MockRecognizer, MockSynthesizer};
    use crate::tts::SpeechSource;
    use mockito::Server;
    use tempfile::{tempdir, TempDir};

    fn mock_platform() -> Platform {
        Platform {
            capturer: Arc::new(MockCapturer::ok(b"wav")),
            recognizer: Arc::new(MockRecognizer::ok("mvua inanyesha")),
            synthesizer: Arc::new(MockSynthesizer::ok()),
            player: Arc::new(MockPlayer::default()),
        }
    }

    fn service(config: AppConfig) -> (TempDir, TranslationService) {
        let dir = tempdir().unwrap();
        let history = HistoryStore::open(dir.path(), None).unwrap();
        (dir, TranslationService::new(&config, mock_platform(), history))
    }

    fn offline_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.endpoints = EndpointTables::empty();
        config.endpoints.translation.insert(
            "en-gir".into(),
            EndpointConfig::new("http://127.0.0.1:9/en-to-gir"),
        );
        config.translation.timeout_secs = 5;
        config.speech.timeout_secs = 5;
        config
    }

    #[tokio::test]
    async fn translate_and_record_uses_language_labels() {
        let (_dir, svc) = service(offline_config());
        let out = svc
            .translate_and_record("Crop Rotation", "en", "gir", Origin::Dashboard)
            .await
            .unwrap();
        assert_eq!(out, "kubadilisha mimea");

        let items = svc.history().list().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_lang, "English");
        assert_eq!(items[0].target_lang, "Giriama");
        assert_eq!(items[0].translated_text, "kubadilisha mimea");
        assert!(items[0].from_dashboard);
        assert!(!items[0].is_demo);
    }

    #[tokio::test]
    async fn failed_translation_records_nothing() {
        let (_dir, svc) = service(offline_config());
        let err = svc
            .translate_and_record("", "en", "gir", Origin::Demo)
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert!(svc.history().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn configure_reaches_every_dispatcher() {
        let mut server = Server::new_async().await;
        let _mt = server
            .mock("POST", "/mt")
            .with_status(200)
            .with_body(r#"{"output":{"translations":"mbegu"}}"#)
            .create_async()
            .await;

        let (_dir, svc) = service(offline_config());
        svc.configure(&EndpointOverrides {
            en_to_giriama_url: Some(format!("{}/mt", server.url())),
            giriama_tts_url: Some(format!("{}/tts", server.url())),
            ..Default::default()
        });

        assert_eq!(svc.translate("seeds", "en", "gir").await.unwrap(), "mbegu");
        let tts = crate::registry::read_registry(svc.registry())
            .resolve(Capability::Tts, "gir")
            .unwrap();
        assert!(tts.url.ends_with("/tts"));
    }

    #[tokio::test]
    async fn speech_round_trip_through_the_facade() {
        let (_dir, svc) = service(offline_config());

        let heard = svc.transcribe("en", StopSignal::never()).await.unwrap();
        assert_eq!(heard, "Mvua inanyesha");

        let audio = svc.synthesize("Mvula", "gir").await.unwrap();
        assert_eq!(audio.source, SpeechSource::Placeholder);
        svc.play(&audio).wait().await.unwrap();
    }

    #[tokio::test]
    async fn empty_commands_select_unavailable_backends() {
        let mut config = AppConfig::default();
        config.speech.player_command.clear();
        config.speech.synth_command.clear();
        let platform = Platform::from_config(&config);

        let err = platform
            .player
            .play(&crate::audio::AudioClip::wav(b"RIFF".to_vec()), StopSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::audio::AudioError::Unavailable(_)));

        let err = platform.synthesizer.speak("mvua", "sw-KE").await.unwrap_err();
        assert!(matches!(err, crate::speech::SpeechError::Unavailable(_)));
    }

    #[cfg(not(feature = "whisper"))]
    #[tokio::test]
    async fn default_build_has_no_on_device_recognition() {
        let platform = Platform::from_config(&AppConfig::default());
        let err = platform
            .recognizer
            .recognize("en-US", StopSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, crate::speech::SpeechError::Unavailable(_)));
    }
}
