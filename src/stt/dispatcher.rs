//! Speech-to-text dispatch per language tier.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::{json, Value};

use super::state::SttPhase;
use crate::audio::{AudioCapturer, AudioClip, AudioError, StopSignal};
use crate::config::SpeechConfig;
use crate::error::{DispatchError, Result};
use crate::fallback::{FallbackChain, Outcome, Strategy};
use crate::language::{LanguageNormalizer, Tier};
use crate::phase::PhaseCell;
use crate::registry::{read_registry, Capability, EndpointConfig, SharedRegistry};
use crate::remote;
use crate::speech::SpeechRecognizer;

/// Canned low-resource transcript returned in demo mode.
pub const DEMO_TRANSCRIPT: &str = "Mimi ni mkulima wa mahindi";

/// One transcription request.
#[derive(Debug, Clone)]
pub struct SttJob {
    /// Canonical application code.
    pub language: String,
    pub locale: String,
    pub stop: StopSignal,
}

fn asr_endpoint(registry: &SharedRegistry, language: &str) -> Option<EndpointConfig> {
    read_registry(registry).resolve(Capability::Asr, language)
}

/// Record one clip for a remote recogniser.  A take with nothing in it is
/// `NoSpeechDetected`, whichever layer noticed.
async fn capture(
    capturer: &dyn AudioCapturer,
    window: Duration,
    stop: &StopSignal,
    phase: &PhaseCell<SttPhase>,
) -> Result<AudioClip> {
    phase.set(SttPhase::Capturing);
    let clip = match capturer.record(window, stop.clone()).await {
        Ok(clip) if !clip.is_empty() => clip,
        Ok(_) | Err(AudioError::Empty) => return Err(DispatchError::NoSpeechDetected),
        Err(e) => return Err(e.into()),
    };
    phase.set(SttPhase::Transcribing);
    Ok(clip)
}

// ---------------------------------------------------------------------------
// CloudRecognition
// ---------------------------------------------------------------------------

/// Cloud speech API (Google `speech:recognize` wire format).
///
/// Skipped without capturing when the key is missing or too short.  A
/// capture failure aborts; remote failures move on to the next strategy.
pub struct CloudRecognition {
    registry: SharedRegistry,
    capturer: Arc<dyn AudioCapturer>,
    client: reqwest::Client,
    window: Duration,
    sample_rate: u32,
    min_key_len: usize,
    phase: PhaseCell<SttPhase>,
}

impl CloudRecognition {
    pub fn new(
        registry: SharedRegistry,
        capturer: Arc<dyn AudioCapturer>,
        config: &SpeechConfig,
        phase: PhaseCell<SttPhase>,
    ) -> Self {
        Self {
            registry,
            capturer,
            client: remote::build_client(config.timeout_secs),
            window: Duration::from_secs(config.record_secs),
            sample_rate: config.sample_rate,
            min_key_len: config.min_cloud_key_len,
            phase,
        }
    }

    fn usable_endpoint(&self, language: &str) -> Option<EndpointConfig> {
        asr_endpoint(&self.registry, language)
            .filter(|e| e.bearer().is_some_and(|k| k.len() > self.min_key_len))
    }

    async fn send(&self, endpoint: &EndpointConfig, clip: &AudioClip, locale: &str) -> Result<String> {
        let body = json!({
            "config": {
                "encoding": "LINEAR16",
                "sampleRateHertz": self.sample_rate,
                "languageCode": locale,
            },
            "audio": {
                "content": base64::engine::general_purpose::STANDARD.encode(&clip.bytes),
            }
        });
        let response = remote::post_json(&self.client, endpoint, &body).await?;
        response
            .pointer("/results/0/alternatives/0/transcript")
            .and_then(remote::non_empty_str)
            .ok_or(DispatchError::NoSpeechDetected)
    }
}

#[async_trait]
impl Strategy<SttJob, String> for CloudRecognition {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn attempt(&self, job: &SttJob) -> Outcome<String> {
        let Some(endpoint) = self.usable_endpoint(&job.language) else {
            return Outcome::TryNext(DispatchError::RemoteCall(format!(
                "no usable cloud ASR key for {}",
                job.language
            )));
        };

        let clip = match capture(self.capturer.as_ref(), self.window, &job.stop, &self.phase).await {
            Ok(clip) => clip,
            Err(e) => return Outcome::Abort(e),
        };

        Outcome::or_next(self.send(&endpoint, &clip, &job.locale).await)
    }
}

// ---------------------------------------------------------------------------
// NativeRecognition
// ---------------------------------------------------------------------------

/// On-device recogniser with a safety cutoff.  Its failures end the chain.
pub struct NativeRecognition {
    recognizer: Arc<dyn SpeechRecognizer>,
    cutoff: Duration,
    phase: PhaseCell<SttPhase>,
}

impl NativeRecognition {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, cutoff: Duration, phase: PhaseCell<SttPhase>) -> Self {
        Self {
            recognizer,
            cutoff,
            phase,
        }
    }
}

#[async_trait]
impl Strategy<SttJob, String> for NativeRecognition {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn attempt(&self, job: &SttJob) -> Outcome<String> {
        self.phase.set(SttPhase::Capturing);
        let stop = job.stop.with_timeout(self.cutoff);
        match self.recognizer.recognize(&job.locale, stop).await {
            Ok(text) if text.trim().is_empty() => Outcome::Abort(DispatchError::NoSpeechDetected),
            Ok(text) => Outcome::Done(text),
            Err(e) => Outcome::Abort(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// CustomRecognition
// ---------------------------------------------------------------------------

/// Custom ASR model endpoint for low-resource languages.
pub struct CustomRecognition {
    registry: SharedRegistry,
    capturer: Arc<dyn AudioCapturer>,
    client: reqwest::Client,
    window: Duration,
    phase: PhaseCell<SttPhase>,
}

impl CustomRecognition {
    pub fn new(
        registry: SharedRegistry,
        capturer: Arc<dyn AudioCapturer>,
        config: &SpeechConfig,
        phase: PhaseCell<SttPhase>,
    ) -> Self {
        Self {
            registry,
            capturer,
            client: remote::build_client(config.timeout_secs),
            window: Duration::from_secs(config.record_secs),
            phase,
        }
    }

    async fn call(&self, job: &SttJob) -> Result<String> {
        let endpoint = asr_endpoint(&self.registry, &job.language).ok_or_else(|| {
            DispatchError::RemoteCall(format!("no ASR endpoint configured for {}", job.language))
        })?;
        let clip = capture(self.capturer.as_ref(), self.window, &job.stop, &self.phase).await?;

        let body = json!({
            "input": {
                "audio_data": base64::engine::general_purpose::STANDARD.encode(&clip.bytes),
            }
        });
        let response = remote::post_json(&self.client, &endpoint, &body).await?;
        extract_transcript(&response)
            .ok_or_else(|| DispatchError::RemoteCall("response carried no transcript".into()))
    }
}

fn extract_transcript(response: &Value) -> Option<String> {
    ["/output/transcription", "/output/transcript", "/transcription", "/transcript"]
        .iter()
        .find_map(|path| response.pointer(path).and_then(remote::non_empty_str))
}

#[async_trait]
impl Strategy<SttJob, String> for CustomRecognition {
    fn name(&self) -> &'static str {
        "custom"
    }

    async fn attempt(&self, job: &SttJob) -> Outcome<String> {
        Outcome::or_next(self.call(job).await)
    }
}

// ---------------------------------------------------------------------------
// DemoTranscript
// ---------------------------------------------------------------------------

/// Fixed transcript for demos without a live backend.
pub struct DemoTranscript;

#[async_trait]
impl Strategy<SttJob, String> for DemoTranscript {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn attempt(&self, _job: &SttJob) -> Outcome<String> {
        Outcome::Done(DEMO_TRANSCRIPT.to_string())
    }
}

// ---------------------------------------------------------------------------
// SpeechToTextDispatcher
// ---------------------------------------------------------------------------

/// Routes a transcription through the chain for the language's tier.
///
/// Concurrent captures are not prevented here; check
/// [`is_busy`](Self::is_busy) before starting one.
pub struct SpeechToTextDispatcher {
    normalizer: Arc<LanguageNormalizer>,
    widely: FallbackChain<SttJob, String>,
    low_resource: FallbackChain<SttJob, String>,
    phase: PhaseCell<SttPhase>,
}

impl SpeechToTextDispatcher {
    /// Widely-supported tier: `cloud`, `native`.  Low-resource tier:
    /// `custom`, plus `demo` when `demo_mode` is on.
    pub fn new(
        registry: SharedRegistry,
        normalizer: Arc<LanguageNormalizer>,
        capturer: Arc<dyn AudioCapturer>,
        recognizer: Arc<dyn SpeechRecognizer>,
        config: &SpeechConfig,
        demo_mode: bool,
    ) -> Self {
        let phase = PhaseCell::new();

        let widely = FallbackChain::new("transcribe")
            .then(CloudRecognition::new(
                Arc::clone(&registry),
                Arc::clone(&capturer),
                config,
                phase.clone(),
            ))
            .then(NativeRecognition::new(
                recognizer,
                Duration::from_secs(config.native_timeout_secs),
                phase.clone(),
            ));

        let mut low_resource = FallbackChain::new("transcribe")
            .then(CustomRecognition::new(registry, capturer, config, phase.clone()));
        if demo_mode {
            low_resource.push(Box::new(DemoTranscript));
        }

        Self {
            normalizer,
            widely,
            low_resource,
            phase,
        }
    }

    pub fn phase(&self) -> SttPhase {
        self.phase.get()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<SttPhase> {
        self.phase.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.phase().is_busy()
    }

    /// Strategy names for a tier, in order.
    pub fn strategy_names(&self, tier: Tier) -> Vec<&'static str> {
        self.chain(tier).names()
    }

    fn chain(&self, tier: Tier) -> &FallbackChain<SttJob, String> {
        match tier {
            Tier::Widely => &self.widely,
            Tier::LowResource => &self.low_resource,
        }
    }

    /// Capture speech in `language` and return the capitalised transcript.
    ///
    /// `stop` ends capture early; whatever was heard so far is transcribed.
    pub async fn transcribe(&self, language: &str, stop: StopSignal) -> Result<String> {
        let profile = self
            .normalizer
            .profile(language)
            .ok_or_else(|| DispatchError::UnsupportedLanguage(language.to_string()))?;
        let job = SttJob {
            language: profile.code.clone(),
            locale: profile.locale.clone(),
            stop,
        };
        log::info!("transcribe: {} ({:?})", job.language, profile.tier);

        let result = self
            .chain(profile.tier)
            .run(&job)
            .await
            .and_then(|text| capitalise(&text).ok_or(DispatchError::NoSpeechDetected));

        self.phase.set(match result {
            Ok(_) => SttPhase::Idle,
            Err(_) => SttPhase::Failed,
        });
        result
    }
}

/// Trimmed text with its first character upper-cased; `None` when blank.
fn capitalise(text: &str) -> Option<String> {
    let mut chars = text.trim().chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
