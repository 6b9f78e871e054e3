//! Ordered fallback chains.
//!
//! Every dispatcher resolves a request by walking a list of named
//! strategies in order.  A strategy either produces the answer, asks for the
//! next one to be tried, or aborts the whole chain:
//!
//! ```text
//! request ─▶ [remote] ─TryNext─▶ [dictionary] ─TryNext─▶ [placeholder]
//!               │                    │                        │
//!             Done                 Done                     Done
//! ```

pub mod chain;

pub use chain::{FallbackChain, Outcome, Strategy};
