//! Watch-backed cell publishing a dispatcher's current phase.
//!
//! The dispatcher writes; any number of UI tasks hold a
//! [`watch::Receiver`] and react to changes.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared writer for a phase value.  Clones write to the same channel.
#[derive(Debug)]
pub struct PhaseCell<P> {
    tx: Arc<watch::Sender<P>>,
}

impl<P> Clone for PhaseCell<P> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<P: Copy + Default> PhaseCell<P> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(P::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn set(&self, phase: P) {
        // send_replace also succeeds with no subscribers.
        self.tx.send_replace(phase);
    }

    pub fn get(&self) -> P {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<P> {
        self.tx.subscribe()
    }
}

impl<P: Copy + Default> Default for PhaseCell<P> {
    fn default() -> Self {
        Self::new()
    }
}
