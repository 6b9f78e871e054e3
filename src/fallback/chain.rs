//! [`Strategy`], [`Outcome`] and the [`FallbackChain`] that runs them.

use async_trait::async_trait;

use crate::error::DispatchError;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What a single strategy made of a request.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The request is answered; later strategies are not consulted.
    Done(T),
    /// This strategy could not answer; try the next one.  The error is kept
    /// and returned if no later strategy succeeds.
    TryNext(DispatchError),
    /// Stop the chain and return this error immediately.
    Abort(DispatchError),
}

impl<T> Outcome<T> {
    /// `Ok` becomes `Done`, `Err` becomes `TryNext`.
    pub fn or_next(result: Result<T, DispatchError>) -> Self {
        match result {
            Ok(value) => Outcome::Done(value),
            Err(e) => Outcome::TryNext(e),
        }
    }

    /// `Ok` becomes `Done`, `Err` becomes `Abort`.
    pub fn or_abort(result: Result<T, DispatchError>) -> Self {
        match result {
            Ok(value) => Outcome::Done(value),
            Err(e) => Outcome::Abort(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// One way of answering a request of type `R` with a `T`.
#[async_trait]
pub trait Strategy<R: Sync, T: Send>: Send + Sync {
    /// Short identifier used in logs and by [`FallbackChain::names`].
    fn name(&self) -> &'static str;

    async fn attempt(&self, request: &R) -> Outcome<T>;
}

// ---------------------------------------------------------------------------
// FallbackChain
// ---------------------------------------------------------------------------

/// Strategies evaluated strictly in insertion order.
pub struct FallbackChain<R: Sync, T: Send> {
    label: &'static str,
    strategies: Vec<Box<dyn Strategy<R, T>>>,
}

impl<R: Sync, T: Send> FallbackChain<R, T> {
    /// Empty chain; `label` prefixes its log lines (e.g. `"translate"`).
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            strategies: Vec::new(),
        }
    }

    /// Append a strategy (builder style).
    pub fn then(mut self, strategy: impl Strategy<R, T> + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn push(&mut self, strategy: Box<dyn Strategy<R, T>>) {
        self.strategies.push(strategy);
    }

    /// Strategy names in evaluation order.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the strategies in order.
    ///
    /// Returns the first `Done` value.  An `Abort` ends the run with its
    /// error; when every strategy asked for the next one, the last error is
    /// returned.
    pub async fn run(&self, request: &R) -> Result<T, DispatchError> {
        let mut last_error = None;

        for strategy in &self.strategies {
            match strategy.attempt(request).await {
                Outcome::Done(value) => {
                    log::debug!("{}: answered by {}", self.label, strategy.name());
                    return Ok(value);
                }
                Outcome::TryNext(e) => {
                    log::warn!("{}: {} failed, falling back: {e}", self.label, strategy.name());
                    last_error = Some(e);
                }
                Outcome::Abort(e) => {
                    log::warn!("{}: {} aborted: {e}", self.label, strategy.name());
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            DispatchError::RemoteCall(format!("{}: no strategy available", self.label))
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
