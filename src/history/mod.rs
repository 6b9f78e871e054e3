//! Translation history.
//!
//! [`HistoryStore`] keeps a newest-first log under `translationHistory` in a
//! [`LocalStore`], along with the preferences that decide whether entries
//! are also forwarded to a remote history service.

pub mod entry;
pub mod local;
pub mod store;

pub use entry::{HistoryItem, NewHistoryItem};
pub use local::{LocalStore, StoreError};
pub use store::{
    HistoryStore, AUTO_TRANSLATE_KEY, HISTORY_ENABLED_KEY, HISTORY_KEY, LOGGED_IN_KEY,
};
