//! Supported languages and how each one is routed.

use serde::{Deserialize, Serialize};

/// Routing class of a language for speech services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    /// Served by a cloud speech service, with an on-device fallback.
    Widely,
    /// Served by a custom model endpoint, with a static fallback.
    LowResource,
}

/// One application language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageProfile {
    /// Application-facing code, e.g. `"gir"`.
    pub code: String,
    /// Human-readable name used in history entries and placeholders.
    pub label: String,
    /// BCP-47 locale handed to cloud and on-device speech engines.
    pub locale: String,
    pub tier: Tier,
    /// Other codes the UI may send for this language.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LanguageProfile {
    pub fn matches(&self, code: &str) -> bool {
        self.code.eq_ignore_ascii_case(code)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(code))
    }

    /// English and Giriama.
    ///
    /// The landing page's language picker uses `nyf` for Giriama while the
    /// dashboard and endpoints use `gir`.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                code: "en".into(),
                label: "English".into(),
                locale: "en-US".into(),
                tier: Tier::Widely,
                aliases: Vec::new(),
            },
            Self {
                code: "gir".into(),
                label: "Giriama".into(),
                locale: "sw-KE".into(),
                tier: Tier::LowResource,
                aliases: vec!["nyf".into()],
            },
        ]
    }
}
