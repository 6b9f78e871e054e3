//! Language profiles and code normalisation.

pub mod normalize;
pub mod profile;

pub use normalize::{LanguageNormalizer, Role, TokenMapping};
pub use profile::{LanguageProfile, Tier};
