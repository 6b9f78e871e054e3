//! Handle to a clip that is playing in the background.

use tokio::task::JoinHandle;

use crate::audio::{AudioError, StopHandle};
use crate::error::{DispatchError, Result};

/// A running (or already finished) playback.
///
/// Dropping the handle does not stop the audio; call [`stop`](Self::stop).
#[derive(Debug)]
pub struct Playback {
    stop: Option<StopHandle>,
    task: Option<JoinHandle<std::result::Result<(), AudioError>>>,
}

impl Playback {
    pub(crate) fn running(stop: StopHandle, task: JoinHandle<std::result::Result<(), AudioError>>) -> Self {
        Self {
            stop: Some(stop),
            task: Some(task),
        }
    }

    /// A playback with nothing to play.
    pub fn finished() -> Self {
        Self {
            stop: None,
            task: None,
        }
    }

    /// Halt output early.  No effect once playback has ended.
    pub fn stop(&self) {
        if let Some(stop) = &self.stop {
            stop.stop();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for playback to end, naturally or through [`stop`](Self::stop).
    pub async fn wait(self) -> Result<()> {
        let Some(task) = self.task else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result.map_err(DispatchError::from),
            Err(e) => Err(AudioError::Playback(format!("playback task failed: {e}")).into()),
        }
    }
}
