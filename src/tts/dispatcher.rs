//! Text-to-speech dispatch per language tier, and playback.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::json;

use super::audio::{SpeechAudio, SpeechSource};
use super::playback::Playback;
use super::state::TtsPhase;
use crate::audio::{stop_channel, AudioPlayer};
use crate::config::SpeechConfig;
use crate::error::{DispatchError, Result};
use crate::fallback::{FallbackChain, Outcome, Strategy};
use crate::language::{LanguageNormalizer, Tier};
use crate::phase::PhaseCell;
use crate::registry::{read_registry, Capability, EndpointConfig, SharedRegistry};
use crate::remote;
use crate::speech::SpeechSynthesizer;

/// One synthesis request.
#[derive(Debug, Clone)]
pub struct TtsJob {
    pub text: String,
    /// Canonical application code.
    pub language: String,
    pub locale: String,
}

fn tts_endpoint(registry: &SharedRegistry, language: &str) -> Option<EndpointConfig> {
    read_registry(registry).resolve(Capability::Tts, language)
}

fn decode_audio(encoded: Option<&str>) -> Result<Vec<u8>> {
    let encoded = encoded
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| DispatchError::RemoteCall("response carried no audio".into()))?;
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| DispatchError::RemoteCall(format!("audio is not valid base64: {e}")))
}

// ---------------------------------------------------------------------------
// CloudSynthesis
// ---------------------------------------------------------------------------

/// Cloud TTS (Google `text:synthesize` wire format), MP3 output.
pub struct CloudSynthesis {
    registry: SharedRegistry,
    client: reqwest::Client,
    voice: String,
    min_key_len: usize,
}

impl CloudSynthesis {
    pub fn new(registry: SharedRegistry, config: &SpeechConfig) -> Self {
        Self {
            registry,
            client: remote::build_client(config.timeout_secs),
            voice: config.cloud_voice.clone(),
            min_key_len: config.min_cloud_key_len,
        }
    }

    async fn call(&self, job: &TtsJob) -> Result<SpeechAudio> {
        let endpoint = tts_endpoint(&self.registry, &job.language)
            .filter(|e| e.bearer().is_some_and(|k| k.len() > self.min_key_len))
            .ok_or_else(|| {
                DispatchError::RemoteCall(format!("no usable cloud TTS key for {}", job.language))
            })?;

        let body = json!({
            "input": { "text": job.text },
            "voice": {
                "languageCode": job.locale,
                "name": self.voice,
                "ssmlGender": "FEMALE",
            },
            "audioConfig": {
                "audioEncoding": "MP3",
                "speakingRate": 1.0,
                "pitch": 0.0,
            }
        });
        let response = remote::post_json(&self.client, &endpoint, &body).await?;
        let bytes = decode_audio(response["audioContent"].as_str())?;
        Ok(SpeechAudio::mp3(bytes, SpeechSource::Cloud))
    }
}

#[async_trait]
impl Strategy<TtsJob, SpeechAudio> for CloudSynthesis {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn attempt(&self, job: &TtsJob) -> Outcome<SpeechAudio> {
        Outcome::or_next(self.call(job).await)
    }
}

// ---------------------------------------------------------------------------
// NativeSynthesis
// ---------------------------------------------------------------------------

/// Speaks through the on-device synthesiser and returns the silent
/// reference, since the device output cannot be captured as a clip.
pub struct NativeSynthesis {
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl NativeSynthesis {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { synthesizer }
    }
}

#[async_trait]
impl Strategy<TtsJob, SpeechAudio> for NativeSynthesis {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn attempt(&self, job: &TtsJob) -> Outcome<SpeechAudio> {
        Outcome::or_abort(
            self.synthesizer
                .speak(&job.text, &job.locale)
                .await
                .map(|()| SpeechAudio::silent(SpeechSource::Native))
                .map_err(DispatchError::from),
        )
    }
}

// ---------------------------------------------------------------------------
// CustomSynthesis
// ---------------------------------------------------------------------------

/// Custom TTS model endpoint for low-resource languages.
pub struct CustomSynthesis {
    registry: SharedRegistry,
    client: reqwest::Client,
}

impl CustomSynthesis {
    pub fn new(registry: SharedRegistry, config: &SpeechConfig) -> Self {
        Self {
            registry,
            client: remote::build_client(config.timeout_secs),
        }
    }

    async fn call(&self, job: &TtsJob) -> Result<SpeechAudio> {
        let endpoint = tts_endpoint(&self.registry, &job.language).ok_or_else(|| {
            DispatchError::RemoteCall(format!("no TTS endpoint configured for {}", job.language))
        })?;
        let body = json!({ "input": { "text": job.text } });
        let response = remote::post_json(&self.client, &endpoint, &body).await?;
        let bytes = decode_audio(response.pointer("/output/audio_data").and_then(|v| v.as_str()))?;
        Ok(SpeechAudio::mp3(bytes, SpeechSource::Custom))
    }
}

#[async_trait]
impl Strategy<TtsJob, SpeechAudio> for CustomSynthesis {
    fn name(&self) -> &'static str {
        "custom"
    }

    async fn attempt(&self, job: &TtsJob) -> Outcome<SpeechAudio> {
        Outcome::or_next(self.call(job).await)
    }
}

// ---------------------------------------------------------------------------
// SilencePlaceholder
// ---------------------------------------------------------------------------

/// Always answers with the silent reference.
pub struct SilencePlaceholder;

#[async_trait]
impl Strategy<TtsJob, SpeechAudio> for SilencePlaceholder {
    fn name(&self) -> &'static str {
        "silence"
    }

    async fn attempt(&self, _job: &TtsJob) -> Outcome<SpeechAudio> {
        Outcome::Done(SpeechAudio::silent(SpeechSource::Placeholder))
    }
}

// ---------------------------------------------------------------------------
// TextToSpeechDispatcher
// ---------------------------------------------------------------------------

pub struct TextToSpeechDispatcher {
    normalizer: Arc<LanguageNormalizer>,
    widely: FallbackChain<TtsJob, SpeechAudio>,
    low_resource: FallbackChain<TtsJob, SpeechAudio>,
    player: Arc<dyn AudioPlayer>,
    phase: PhaseCell<TtsPhase>,
}

impl TextToSpeechDispatcher {
    /// Widely-supported tier: `cloud`, `native`.  Low-resource tier:
    /// `custom`, `silence`.
    pub fn new(
        registry: SharedRegistry,
        normalizer: Arc<LanguageNormalizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn AudioPlayer>,
        config: &SpeechConfig,
    ) -> Self {
        let widely = FallbackChain::new("synthesize")
            .then(CloudSynthesis::new(Arc::clone(&registry), config))
            .then(NativeSynthesis::new(synthesizer));
        let low_resource = FallbackChain::new("synthesize")
            .then(CustomSynthesis::new(registry, config))
            .then(SilencePlaceholder);

        Self {
            normalizer,
            widely,
            low_resource,
            player,
            phase: PhaseCell::new(),
        }
    }

    pub fn phase(&self) -> TtsPhase {
        self.phase.get()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<TtsPhase> {
        self.phase.subscribe()
    }

    pub fn strategy_names(&self, tier: Tier) -> Vec<&'static str> {
        match tier {
            Tier::Widely => self.widely.names(),
            Tier::LowResource => self.low_resource.names(),
        }
    }

    /// Produce a playable reference for `text` spoken in `language`.
    ///
    /// Low-resource synthesis never fails past validation: the silent
    /// placeholder is the last resort.
    pub async fn synthesize(&self, text: &str, language: &str) -> Result<SpeechAudio> {
        if text.trim().is_empty() {
            return Err(DispatchError::Validation("nothing to speak".into()));
        }
        let profile = self
            .normalizer
            .profile(language)
            .ok_or_else(|| DispatchError::UnsupportedLanguage(language.to_string()))?;
        let job = TtsJob {
            text: text.to_string(),
            language: profile.code.clone(),
            locale: profile.locale.clone(),
        };
        log::info!("synthesize: {} ({} chars)", job.language, job.text.chars().count());

        self.phase.set(TtsPhase::Synthesizing);
        let chain = match profile.tier {
            Tier::Widely => &self.widely,
            Tier::LowResource => &self.low_resource,
        };
        let result = chain.run(&job).await;
        self.phase.set(TtsPhase::Idle);
        result
    }

    /// Start playing `audio` in the background.
    ///
    /// Placeholders are not sent to the player and yield an already
    /// finished [`Playback`].
    pub fn play(&self, audio: &SpeechAudio) -> Playback {
        if audio.is_placeholder() || audio.bytes.is_empty() {
            return Playback::finished();
        }

        let (handle, signal) = stop_channel();
        let player = Arc::clone(&self.player);
        let clip = audio.to_clip();
        let phase = self.phase.clone();

        phase.set(TtsPhase::Playing);
        let task = tokio::spawn(async move {
            let result = player.play(&clip, signal).await;
            if let Err(e) = &result {
                log::warn!("synthesize: playback failed: {e}");
            }
            phase.set(TtsPhase::Idle);
            result
        });
        Playback::running(handle, task)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioClip, AudioError, MockPlayer, StopSignal};
    use crate::registry::{new_shared_registry, EndpointTables};
    use crate::speech::MockSynthesizer;
    use crate::tts::SILENT_WAV;
    use mockito::{Matcher, Server};

    const GOOD_KEY: &str = "google-tts-key-0123";

    struct Harness {
        synthesizer: Arc<MockSynthesizer>,
        player: Arc<MockPlayer>,
        dispatcher: TextToSpeechDispatcher,
    }

    fn harness(tts: &[(&str, EndpointConfig)], synthesizer: MockSynthesizer) -> Harness {
        let mut tables = EndpointTables::empty();
        for (lang, cfg) in tts {
            tables.tts.insert(lang.to_string(), cfg.clone());
        }
        let synthesizer = Arc::new(synthesizer);
        let player = Arc::new(MockPlayer::default());
        let dispatcher = TextToSpeechDispatcher::new(
            new_shared_registry(tables),
            Arc::new(LanguageNormalizer::default()),
            synthesizer.clone(),
            player.clone(),
            &SpeechConfig {
                timeout_secs: 5,
                ..Default::default()
            },
        );
        Harness {
            synthesizer,
            player,
            dispatcher,
        }
    }

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn chains_per_tier() {
        let h = harness(&[], MockSynthesizer::ok());
        assert_eq!(h.dispatcher.strategy_names(Tier::Widely), vec!["cloud", "native"]);
        assert_eq!(h.dispatcher.strategy_names(Tier::LowResource), vec!["custom", "silence"]);
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let h = harness(&[], MockSynthesizer::ok());
        let err = h.dispatcher.synthesize("  ", "en").await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert!(h.synthesizer.spoken.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_language() {
        let h = harness(&[], MockSynthesizer::ok());
        let err = h.dispatcher.synthesize("habari", "luo").await.unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedLanguage(_)));
    }

    #[tokio::test]
    async fn cloud_returns_mp3() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tts")
            .match_header("authorization", format!("Bearer {GOOD_KEY}").as_str())
            .match_body(Matcher::Json(json!({
                "input": { "text": "Water the seedlings" },
                "voice": { "languageCode": "en-US", "name": "en-US-Wavenet-D", "ssmlGender": "FEMALE" },
                "audioConfig": { "audioEncoding": "MP3", "speakingRate": 1.0, "pitch": 0.0 }
            })))
            .with_status(200)
            .with_body(json!({ "audioContent": b64(b"ID3-mp3") }).to_string())
            .create_async()
            .await;

        let h = harness(
            &[("en", EndpointConfig::new(format!("{}/tts", server.url())).with_key(GOOD_KEY))],
            MockSynthesizer::ok(),
        );
        let audio = h.dispatcher.synthesize("Water the seedlings", "en").await.unwrap();
        assert_eq!(audio.source, SpeechSource::Cloud);
        assert_eq!(audio.bytes, b"ID3-mp3");
        assert_eq!(audio.mime, "audio/mp3");
        assert_eq!(h.dispatcher.phase(), TtsPhase::Idle);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn short_key_goes_straight_to_native() {
        let h = harness(
            &[("en", EndpointConfig::new("http://127.0.0.1:9").with_key("tiny"))],
            MockSynthesizer::ok(),
        );
        let audio = h.dispatcher.synthesize("Hello", "en").await.unwrap();
        assert_eq!(audio.source, SpeechSource::Native);
        assert_eq!(audio.bytes, SILENT_WAV.to_vec());
        assert_eq!(
            h.synthesizer.spoken.lock().unwrap().as_slice(),
            [("Hello".to_string(), "en-US".to_string())]
        );
    }

    #[tokio::test]
    async fn cloud_failure_then_native_failure_escapes() {
        let h = harness(
            &[("en", EndpointConfig::new("http://127.0.0.1:9").with_key(GOOD_KEY))],
            MockSynthesizer::failing(),
        );
        let err = h.dispatcher.synthesize("Hello", "en").await.unwrap_err();
        assert!(matches!(err, DispatchError::Speech(_)));
    }

    #[tokio::test]
    async fn custom_endpoint_returns_audio() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/tts-giriama")
            .match_body(Matcher::Json(json!({ "input": { "text": "Dzulu ni dzema" } })))
            .with_status(200)
            .with_body(json!({ "output": { "audio_data": b64(b"gir-mp3") } }).to_string())
            .create_async()
            .await;

        let h = harness(
            &[("gir", EndpointConfig::new(format!("{}/tts-giriama", server.url())))],
            MockSynthesizer::ok(),
        );
        let audio = h.dispatcher.synthesize("Dzulu ni dzema", "gir").await.unwrap();
        assert_eq!(audio.source, SpeechSource::Custom);
        assert_eq!(audio.bytes, b"gir-mp3");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn low_resource_failure_still_returns_a_reference() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/tts-giriama")
            .with_status(502)
            .create_async()
            .await;

        for url in [format!("{}/tts-giriama", server.url()), "http://127.0.0.1:9".into()] {
            let h = harness(&[("gir", EndpointConfig::new(url))], MockSynthesizer::failing());
            let audio = h.dispatcher.synthesize("Mvula", "gir").await.unwrap();
            assert_eq!(audio.source, SpeechSource::Placeholder);
            assert!(audio.to_data_url().starts_with("data:audio/wav;base64,"));
        }
    }

    #[tokio::test]
    async fn low_resource_without_endpoint_is_silent_not_an_error() {
        let h = harness(&[], MockSynthesizer::ok());
        let audio = h.dispatcher.synthesize("Mvula", "gir").await.unwrap();
        assert!(audio.is_placeholder());
    }

    #[tokio::test]
    async fn invalid_base64_falls_back() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/t")
            .with_status(200)
            .with_body(r#"{"output":{"audio_data":"%%%not base64%%%"}}"#)
            .create_async()
            .await;

        let h = harness(&[("gir", EndpointConfig::new(format!("{}/t", server.url())))], MockSynthesizer::ok());
        let audio = h.dispatcher.synthesize("Mvula", "gir").await.unwrap();
        assert_eq!(audio.source, SpeechSource::Placeholder);
    }

    #[tokio::test]
    async fn play_hands_real_audio_to_the_player() {
        let h = harness(&[], MockSynthesizer::ok());
        let audio = SpeechAudio::mp3(b"mp3".to_vec(), SpeechSource::Custom);

        h.dispatcher.play(&audio).wait().await.unwrap();
        let played = h.player.played.lock().unwrap();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].mime, "audio/mp3");
        drop(played);
        assert_eq!(h.dispatcher.phase(), TtsPhase::Idle);
    }

    #[tokio::test]
    async fn placeholders_are_not_played() {
        let h = harness(&[], MockSynthesizer::ok());
        let playback = h.dispatcher.play(&SpeechAudio::silent(SpeechSource::Placeholder));
        assert!(playback.is_finished());
        playback.wait().await.unwrap();
        assert!(h.player.played.lock().unwrap().is_empty());
    }

    /// Plays until told to stop.
    struct EndlessPlayer;

    #[async_trait]
    impl AudioPlayer for EndlessPlayer {
        async fn play(&self, _clip: &AudioClip, mut stop: StopSignal) -> std::result::Result<(), AudioError> {
            stop.stopped().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn stop_ends_playback_early() {
        let dispatcher = TextToSpeechDispatcher::new(
            new_shared_registry(EndpointTables::empty()),
            Arc::new(LanguageNormalizer::default()),
            Arc::new(MockSynthesizer::ok()),
            Arc::new(EndlessPlayer),
            &SpeechConfig::default(),
        );
        let playback = dispatcher.play(&SpeechAudio::mp3(vec![1; 16], SpeechSource::Cloud));
        assert_eq!(dispatcher.phase(), TtsPhase::Playing);

        playback.stop();
        playback.wait().await.unwrap();
        assert_eq!(dispatcher.phase(), TtsPhase::Idle);
    }
}
