//! Translation dispatcher.
//!
//! ```text
//! translate(text, src, tgt)
//!   ├─ validate (non-empty, src != tgt after alias resolution)
//!   ├─ registry: src-tgt, else tgt-src, else UnsupportedLanguagePair
//!   └─ chain: remote ─▶ dictionary ─▶ placeholder
//! ```

pub mod dictionary;
pub mod dispatcher;

pub use dictionary::PhraseDictionary;
pub use dispatcher::{
    DictionaryFallback, PlaceholderFallback, RemoteTranslation, TranslationDispatcher,
    TranslationJob,
};
