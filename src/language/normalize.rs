//! Mapping between application language codes and model tokens.
//!
//! The translation model for Giriama was trained with Swahili tokens, so the
//! application code `gir` must reach the endpoint as `sw`.  The mapping is a
//! table of explicit entries rather than a hard-coded branch, which keeps an
//! asymmetric rule (e.g. remap only in source position) expressible from
//! configuration.

use serde::{Deserialize, Serialize};

use super::profile::LanguageProfile;

/// Position a code occupies in a translation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Source,
    Target,
    /// Matches either position.
    Any,
}

impl Role {
    fn covers(self, other: Role) -> bool {
        self == Role::Any || other == Role::Any || self == other
    }
}

/// One mapping entry: `app_code` in `role` position becomes `token`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMapping {
    pub app_code: String,
    pub role: Role,
    pub token: String,
}

impl TokenMapping {
    /// `gir` → `sw` in both positions.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                app_code: "gir".into(),
                role: Role::Source,
                token: "sw".into(),
            },
            Self {
                app_code: "gir".into(),
                role: Role::Target,
                token: "sw".into(),
            },
        ]
    }
}

// ---------------------------------------------------------------------------
// LanguageNormalizer
// ---------------------------------------------------------------------------

/// Resolves aliases, looks up profiles, and maps codes to model tokens.
#[derive(Debug, Clone)]
pub struct LanguageNormalizer {
    profiles: Vec<LanguageProfile>,
    mappings: Vec<TokenMapping>,
}

impl LanguageNormalizer {
    pub fn new(profiles: Vec<LanguageProfile>, mappings: Vec<TokenMapping>) -> Self {
        Self { profiles, mappings }
    }

    /// Profile for `code` (or one of its aliases).
    pub fn profile(&self, code: &str) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.matches(code))
    }

    /// Application code for `code`, resolving aliases.  Unknown codes are
    /// returned trimmed and lower-cased.
    pub fn canonical(&self, code: &str) -> String {
        let code = code.trim();
        match self.profile(code) {
            Some(p) => p.code.clone(),
            None => code.to_ascii_lowercase(),
        }
    }

    /// Human-readable label, falling back to the code itself.
    pub fn label(&self, code: &str) -> String {
        self.profile(code)
            .map(|p| p.label.clone())
            .unwrap_or_else(|| code.to_string())
    }

    /// Token the remote model expects for `code` in `role` position.
    ///
    /// The first matching table entry wins; without one the canonical code
    /// is used unchanged.
    pub fn normalize(&self, code: &str, role: Role) -> String {
        let canonical = self.canonical(code);
        self.mappings
            .iter()
            .find(|m| m.app_code.eq_ignore_ascii_case(&canonical) && m.role.covers(role))
            .map(|m| m.token.clone())
            .unwrap_or(canonical)
    }

    /// `(source_token, target_token)` for a request, always using the
    /// requested roles.
    pub fn tokens(&self, source: &str, target: &str) -> (String, String) {
        (
            self.normalize(source, Role::Source),
            self.normalize(target, Role::Target),
        )
    }
}

impl Default for LanguageNormalizer {
    fn default() -> Self {
        Self::new(LanguageProfile::defaults(), TokenMapping::defaults())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn giriama_becomes_swahili_in_both_positions() {
        let n = LanguageNormalizer::default();
        assert_eq!(n.tokens("en", "gir"), ("en".to_string(), "sw".to_string()));
        assert_eq!(n.tokens("gir", "en"), ("sw".to_string(), "en".to_string()));
    }

    #[test]
    fn alias_is_canonicalised_before_mapping() {
        let n = LanguageNormalizer::default();
        assert_eq!(n.canonical("nyf"), "gir");
        assert_eq!(n.normalize("nyf", Role::Target), "sw");
    }

    #[test]
    fn unknown_codes_pass_through() {
        let n = LanguageNormalizer::default();
        assert_eq!(n.normalize(" LUO ", Role::Source), "luo");
        assert_eq!(n.label("luo"), "luo");
        assert!(n.profile("luo").is_none());
    }

    #[test]
    fn asymmetric_table_only_maps_source() {
        let n = LanguageNormalizer::new(
            LanguageProfile::defaults(),
            vec![TokenMapping {
                app_code: "gir".into(),
                role: Role::Source,
                token: "sw".into(),
            }],
        );
        assert_eq!(n.normalize("gir", Role::Source), "sw");
        assert_eq!(n.normalize("gir", Role::Target), "gir");
    }

    #[test]
    fn any_role_entry_covers_both() {
        let n = LanguageNormalizer::new(
            LanguageProfile::defaults(),
            vec![TokenMapping {
                app_code: "en".into(),
                role: Role::Any,
                token: "eng_Latn".into(),
            }],
        );
        assert_eq!(n.tokens("en", "gir").0, "eng_Latn");
        assert_eq!(n.tokens("gir", "en").1, "eng_Latn");
    }

    #[test]
    fn labels_come_from_profiles() {
        let n = LanguageNormalizer::default();
        assert_eq!(n.label("gir"), "Giriama");
        assert_eq!(n.label("en"), "English");
    }
}
