//! On-device speech recognition, the last resort of the speech-to-text
//! dispatcher for widely-supported languages.
//!
//! [`WhisperRecognizer`] (feature `whisper`) records through an
//! [`AudioCapturer`] until stopped and runs a local Whisper model over the
//! take.  Without the feature, [`UnavailableRecognizer`] reports the gap.

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::StopSignal;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Errors from the platform speech capabilities.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpeechError {
    /// The capability is not present in this build or on this host.
    #[error("speech capability unavailable: {0}")]
    Unavailable(String),

    /// The engine started but failed.
    #[error("{0}")]
    Engine(String),
}

// ---------------------------------------------------------------------------
// SpeechRecognizer
// ---------------------------------------------------------------------------

/// Listens in `locale` (e.g. `en-US`) until `stop` fires.
///
/// Returns whatever was recognised up to that point, which may be empty; the
/// dispatcher turns an empty result into `NoSpeechDetected`.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, locale: &str, stop: StopSignal) -> Result<String, SpeechError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechRecognizer>) {}
};

/// Recogniser for builds without on-device recognition.
#[derive(Debug, Default, Clone)]
pub struct UnavailableRecognizer;

#[async_trait]
impl SpeechRecognizer for UnavailableRecognizer {
    async fn recognize(&self, locale: &str, _stop: StopSignal) -> Result<String, SpeechError> {
        Err(SpeechError::Unavailable(format!(
            "no on-device recogniser for {locale} (build with the `whisper` feature)"
        )))
    }
}

// ---------------------------------------------------------------------------
// WhisperRecognizer
// ---------------------------------------------------------------------------

#[cfg(feature = "whisper")]
pub use whisper::WhisperRecognizer;

#[cfg(feature = "whisper")]
mod whisper {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    use super::{SpeechError, SpeechRecognizer};
    use crate::audio::{pcm, AudioCapturer, AudioError, StopSignal};

    /// Whisper over a fresh microphone take.
    pub struct WhisperRecognizer {
        ctx: Arc<WhisperContext>,
        capturer: Arc<dyn AudioCapturer>,
        max_window: Duration,
    }

    impl WhisperRecognizer {
        /// Load a GGML model.  `max_window` bounds a single take.
        pub fn load(
            model_path: impl AsRef<Path>,
            capturer: Arc<dyn AudioCapturer>,
            max_window: Duration,
        ) -> Result<Self, SpeechError> {
            let path = model_path.as_ref();
            if !path.exists() {
                return Err(SpeechError::Unavailable(format!(
                    "model not found: {}",
                    path.display()
                )));
            }
            let path_str = path.to_str().ok_or_else(|| {
                SpeechError::Unavailable(format!("non-UTF-8 model path: {}", path.display()))
            })?;
            let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
                .map_err(|e| SpeechError::Engine(e.to_string()))?;

            Ok(Self {
                ctx: Arc::new(ctx),
                capturer,
                max_window,
            })
        }

        fn run_model(ctx: &WhisperContext, audio: &[f32], language: &str) -> Result<String, SpeechError> {
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_language(Some(language));
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_n_threads(
                std::thread::available_parallelism()
                    .map(|n| n.get().min(8) as i32)
                    .unwrap_or(4),
            );

            let mut state = ctx
                .create_state()
                .map_err(|e| SpeechError::Engine(e.to_string()))?;
            state
                .full(params, audio)
                .map_err(|e| SpeechError::Engine(e.to_string()))?;

            let n = state
                .full_n_segments()
                .map_err(|e| SpeechError::Engine(e.to_string()))?;
            let mut text = String::new();
            for i in 0..n {
                let segment = state
                    .full_get_segment_text(i)
                    .map_err(|e| SpeechError::Engine(format!("segment {i}: {e}")))?;
                text.push_str(&segment);
            }
            Ok(text.trim().to_string())
        }
    }

    #[async_trait]
    impl SpeechRecognizer for WhisperRecognizer {
        async fn recognize(&self, locale: &str, stop: StopSignal) -> Result<String, SpeechError> {
            let clip = match self.capturer.record(self.max_window, stop).await {
                Ok(clip) => clip,
                // Nothing heard is an empty result, not a failure.
                Err(AudioError::Empty) => return Ok(String::new()),
                Err(e) => return Err(SpeechError::Engine(e.to_string())),
            };

            let audio = pcm::decode_wav(&clip.bytes, pcm::TARGET_SAMPLE_RATE)
                .map_err(|e| SpeechError::Engine(format!("unreadable capture: {e}")))?;
            let language = locale.split('-').next().unwrap_or(locale).to_string();
            let ctx = Arc::clone(&self.ctx);

            tokio::task::spawn_blocking(move || Self::run_model(&ctx, &audio, &language))
                .await
                .map_err(|e| SpeechError::Engine(e.to_string()))?
        }
    }
}

// ---------------------------------------------------------------------------
// MockRecognizer (test only)
// ---------------------------------------------------------------------------

/// A `waiting` mock keeps listening until its stop signal fires.
#[cfg(test)]
pub struct MockRecognizer {
    response: Result<String, SpeechError>,
    waits: bool,
    pub locales: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockRecognizer {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            waits: false,
            locales: Default::default(),
        }
    }

    pub fn err(error: SpeechError) -> Self {
        Self {
            response: Err(error),
            waits: false,
            locales: Default::default(),
        }
    }

    pub fn waiting(mut self) -> Self {
        self.waits = true;
        self
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn recognize(&self, locale: &str, mut stop: StopSignal) -> Result<String, SpeechError> {
        self.locales.lock().unwrap().push(locale.to_string());
        if self.waits {
            stop.stopped().await;
        }
        self.response.clone()
    }
}
