//! Cancellation for the live operations (capture, recognition, playback).
//!
//! A [`StopHandle`] is held by the caller (usually a UI "stop" button); the
//! matching [`StopSignal`] is handed to the operation.  A signal may also
//! carry a deadline, which is how the fixed capture window and the native
//! recognition cutoff are enforced.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// StopHandle
// ---------------------------------------------------------------------------

/// Caller side of a stop channel.  Cloneable; any clone can stop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Request an early stop.  Idempotent.
    pub fn stop(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

// ---------------------------------------------------------------------------
// StopSignal
// ---------------------------------------------------------------------------

/// Operation side of a stop channel.
///
/// [`stopped`](Self::stopped) resolves when the handle fires or the optional
/// deadline passes.  Dropping the handle without firing is not a stop.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Create a linked handle/signal pair.
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (
        StopHandle {
            tx: std::sync::Arc::new(tx),
        },
        StopSignal {
            rx: Some(rx),
            deadline: None,
        },
    )
}

impl StopSignal {
    /// A signal nobody can fire; only a deadline (if added) ends it.
    pub fn never() -> Self {
        Self {
            rx: None,
            deadline: None,
        }
    }

    /// Copy of this signal that additionally fires `after` from now.
    ///
    /// An earlier existing deadline is kept.
    pub fn with_timeout(&self, after: Duration) -> Self {
        let candidate = Instant::now() + after;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            rx: self.rx.clone(),
            deadline: Some(deadline),
        }
    }

    /// Non-blocking check.
    pub fn is_stopped(&self) -> bool {
        let flagged = self.rx.as_ref().is_some_and(|rx| *rx.borrow());
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        flagged || expired
    }

    /// Wait until the handle fires or the deadline passes.
    ///
    /// Pending forever for [`StopSignal::never`] without a deadline.
    pub async fn stopped(&mut self) {
        let deadline = self.deadline;
        let flag = async {
            match self.rx.as_mut() {
                Some(rx) => {
                    // A dropped sender means nobody can stop us any more.
                    if rx.wait_for(|stopped| *stopped).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        match deadline {
            Some(d) => {
                tokio::select! {
                    _ = flag => {}
                    _ = tokio::time::sleep_until(d) => {}
                }
            }
            None => flag.await,
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::never()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
