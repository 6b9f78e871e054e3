//! Microphone capture into a finite recording.
//!
//! [`AudioCapturer`] is the seam the speech-to-text dispatcher depends on.
//! [`CpalCapturer`] (feature `microphone`) records from a real input device;
//! [`UnavailableCapturer`] stands in on builds without audio support.
//!
//! A recording ends when its [`StopSignal`] fires or the fixed window
//! elapses, whichever is first.  Whatever was captured up to that point is
//! the result.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::stop::StopSignal;

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

/// An encoded, finite piece of audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Encoded bytes (a WAV file for microphone recordings).
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`, e.g. `audio/wav` or `audio/mp3`.
    pub mime: String,
}

impl AudioClip {
    pub fn wav(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "audio/wav".into(),
        }
    }

    pub fn mp3(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "audio/mp3".into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension matching `mime`, used for scratch files.
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "audio/mp3" | "audio/mpeg" => "mp3",
            "audio/webm" => "webm",
            _ => "wav",
        }
    }
}

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Errors from the capture and playback adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("audio device error: {0}")]
    Device(String),

    #[error("audio stream error: {0}")]
    Stream(String),

    #[error("recording captured no audio")]
    Empty,

    #[error("wav encoding error: {0}")]
    Wav(String),

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("audio support unavailable: {0}")]
    Unavailable(String),
}

impl From<hound::Error> for AudioError {
    fn from(e: hound::Error) -> Self {
        AudioError::Wav(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// AudioCapturer
// ---------------------------------------------------------------------------

/// Records one clip from the microphone.
///
/// `window` is the fixed maximum length; `stop` may end the recording
/// earlier.  Implementations return [`AudioError::Empty`] when nothing at all
/// was captured.
#[async_trait]
pub trait AudioCapturer: Send + Sync {
    async fn record(&self, window: Duration, stop: StopSignal) -> Result<AudioClip, AudioError>;
}

const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn AudioCapturer>) {}
};

// ---------------------------------------------------------------------------
// UnavailableCapturer
// ---------------------------------------------------------------------------

/// Capturer for builds or hosts without microphone support.
#[derive(Debug, Default, Clone)]
pub struct UnavailableCapturer;

#[async_trait]
impl AudioCapturer for UnavailableCapturer {
    async fn record(&self, _window: Duration, _stop: StopSignal) -> Result<AudioClip, AudioError> {
        Err(AudioError::Unavailable(
            "built without the `microphone` feature".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// CpalCapturer
// ---------------------------------------------------------------------------

/// Records from a cpal input device.
///
/// `cpal::Stream` is not `Send` on every platform, so the stream lives on a
/// dedicated thread for the duration of one recording.
#[cfg(feature = "microphone")]
#[derive(Debug, Clone)]
pub struct CpalCapturer {
    /// Input device name; `None` selects the host default.
    device_name: Option<String>,
    /// Rate of the WAV clips handed back.
    sample_rate: u32,
}

#[cfg(feature = "microphone")]
impl CpalCapturer {
    pub fn new(device_name: Option<String>, sample_rate: u32) -> Self {
        Self {
            device_name,
            sample_rate,
        }
    }

    fn capture_until(
        device_name: Option<&str>,
        target_rate: u32,
        done: std::sync::mpsc::Receiver<()>,
    ) -> Result<AudioClip, AudioError> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
        use std::sync::{Arc, Mutex};

        let host = cpal::default_host();
        let device = match device_name {
            Some(wanted) => host
                .input_devices()
                .map_err(|e| AudioError::Device(e.to_string()))?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false)),
            None => host.default_input_device(),
        }
        .ok_or(AudioError::NoDevice)?;

        let supported = device
            .default_input_config()
            .map_err(|e| AudioError::Device(e.to_string()))?;
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let config: cpal::StreamConfig = supported.into();

        let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = sink.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err: cpal::StreamError| {
                    log::error!("capture: cpal stream error: {err}");
                },
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        // Either an explicit stop or the async side going away ends the take.
        let _ = done.recv();
        drop(stream);

        let samples = match buffer.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        if samples.is_empty() {
            return Err(AudioError::Empty);
        }

        log::debug!(
            "capture: {} samples @ {sample_rate} Hz, {channels} ch",
            samples.len()
        );

        let wav = super::pcm::device_buffer_to_wav(&samples, channels, sample_rate, target_rate)?;
        Ok(AudioClip::wav(wav))
    }
}

#[cfg(feature = "microphone")]
#[async_trait]
impl AudioCapturer for CpalCapturer {
    async fn record(&self, window: Duration, stop: StopSignal) -> Result<AudioClip, AudioError> {
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        let device_name = self.device_name.clone();
        let target_rate = self.sample_rate;

        std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let outcome = Self::capture_until(device_name.as_deref(), target_rate, done_rx);
                let _ = result_tx.send(outcome);
            })
            .map_err(|e| AudioError::Device(e.to_string()))?;

        let mut stop = stop.with_timeout(window);
        stop.stopped().await;
        let _ = done_tx.send(());

        result_rx
            .await
            .map_err(|_| AudioError::Stream("capture thread exited early".into()))?
    }
}

// ---------------------------------------------------------------------------
// MockCapturer (test only)
// ---------------------------------------------------------------------------

/// Test double that returns a pre-configured clip, counts calls and records
/// the window it was given.  A `waiting` mock holds the take open until the
/// stop signal or the window ends it, like a real microphone.
#[cfg(test)]
pub struct MockCapturer {
    response: Result<AudioClip, AudioError>,
    waits: bool,
    calls: std::sync::atomic::AtomicUsize,
    windows: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl MockCapturer {
    fn with_response(response: Result<AudioClip, AudioError>) -> Self {
        Self {
            response,
            waits: false,
            calls: Default::default(),
            windows: Default::default(),
        }
    }

    pub fn ok(bytes: &[u8]) -> Self {
        Self::with_response(Ok(AudioClip::wav(bytes.to_vec())))
    }

    pub fn err(error: AudioError) -> Self {
        Self::with_response(Err(error))
    }

    pub fn waiting(mut self) -> Self {
        self.waits = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn windows(&self) -> Vec<Duration> {
        self.windows.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl AudioCapturer for MockCapturer {
    async fn record(&self, window: Duration, stop: StopSignal) -> Result<AudioClip, AudioError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.windows.lock().unwrap().push(window);
        if self.waits {
            stop.with_timeout(window).stopped().await;
        }
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
