//! Endpoint tables and the runtime-reconfigurable registry.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

pub const GOOGLE_ASR_URL: &str = "https://speech.googleapis.com/v1/speech:recognize";
pub const GOOGLE_TTS_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

// ---------------------------------------------------------------------------
// EndpointConfig / Capability
// ---------------------------------------------------------------------------

/// Where to send one kind of request, and with which credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    /// Sent as a bearer token when present and non-empty.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Non-empty credential, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Translation,
    Asr,
    Tts,
}

// ---------------------------------------------------------------------------
// EndpointTables
// ---------------------------------------------------------------------------

/// Per-capability endpoint maps.
///
/// Translation keys are directions (`"en-gir"`); ASR and TTS keys are bare
/// language codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointTables {
    pub translation: BTreeMap<String, EndpointConfig>,
    pub asr: BTreeMap<String, EndpointConfig>,
    pub tts: BTreeMap<String, EndpointConfig>,
}

impl Default for EndpointTables {
    fn default() -> Self {
        let local = |path: &str| EndpointConfig::new(format!("http://localhost:8080{path}"));
        Self {
            translation: BTreeMap::from([
                ("en-gir".to_string(), local("/api/translate/en-to-gir")),
                ("gir-en".to_string(), local("/api/translate/gir-to-en")),
            ]),
            asr: BTreeMap::from([
                ("en".to_string(), EndpointConfig::new(GOOGLE_ASR_URL)),
                ("gir".to_string(), local("/api/asr-giriama")),
            ]),
            tts: BTreeMap::from([
                ("en".to_string(), EndpointConfig::new(GOOGLE_TTS_URL)),
                ("gir".to_string(), local("/api/tts-giriama")),
            ]),
        }
    }
}

impl EndpointTables {
    /// Tables with no endpoints at all.
    pub fn empty() -> Self {
        Self {
            translation: BTreeMap::new(),
            asr: BTreeMap::new(),
            tts: BTreeMap::new(),
        }
    }

    fn table(&self, capability: Capability) -> &BTreeMap<String, EndpointConfig> {
        match capability {
            Capability::Translation => &self.translation,
            Capability::Asr => &self.asr,
            Capability::Tts => &self.tts,
        }
    }

    fn table_mut(&mut self, capability: Capability) -> &mut BTreeMap<String, EndpointConfig> {
        match capability {
            Capability::Translation => &mut self.translation,
            Capability::Asr => &mut self.asr,
            Capability::Tts => &mut self.tts,
        }
    }

    fn set_url(&mut self, capability: Capability, key: &str, url: &str) {
        self.table_mut(capability)
            .entry(key.to_string())
            .and_modify(|e| e.url = url.to_string())
            .or_insert_with(|| EndpointConfig::new(url));
    }

    /// Set a credential.  Without an existing entry, one is created only
    /// when a well-known `default_url` exists.
    fn set_key(&mut self, capability: Capability, key: &str, api_key: &str, default_url: Option<&str>) {
        let table = self.table_mut(capability);
        if let Some(entry) = table.get_mut(key) {
            entry.api_key = Some(api_key.to_string());
        } else if let Some(url) = default_url {
            table.insert(key.to_string(), EndpointConfig::new(url).with_key(api_key));
        } else {
            log::debug!("registry: ignoring credential for unconfigured endpoint {key}");
        }
    }

    /// Merge every field present in `overrides`; absent fields are untouched.
    pub fn merge(&mut self, overrides: &EndpointOverrides) {
        use Capability::*;

        let o = overrides;
        if let Some(url) = &o.en_to_giriama_url {
            self.set_url(Translation, "en-gir", url);
        }
        if let Some(key) = &o.en_to_giriama_key {
            self.set_key(Translation, "en-gir", key, None);
        }
        if let Some(url) = &o.giriama_to_en_url {
            self.set_url(Translation, "gir-en", url);
        }
        if let Some(key) = &o.giriama_to_en_key {
            self.set_key(Translation, "gir-en", key, None);
        }
        if let Some(url) = &o.giriama_asr_url {
            self.set_url(Asr, "gir", url);
        }
        if let Some(key) = &o.giriama_asr_key {
            self.set_key(Asr, "gir", key, None);
        }
        if let Some(url) = &o.giriama_tts_url {
            self.set_url(Tts, "gir", url);
        }
        if let Some(key) = &o.giriama_tts_key {
            self.set_key(Tts, "gir", key, None);
        }
        if let Some(key) = &o.google_asr_key {
            self.set_key(Asr, "en", key, Some(GOOGLE_ASR_URL));
        }
        if let Some(key) = &o.google_tts_key {
            self.set_key(Tts, "en", key, Some(GOOGLE_TTS_URL));
        }
    }
}

// ---------------------------------------------------------------------------
// EndpointOverrides
// ---------------------------------------------------------------------------

/// A partial reconfiguration.  Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointOverrides {
    pub en_to_giriama_url: Option<String>,
    pub en_to_giriama_key: Option<String>,
    pub giriama_to_en_url: Option<String>,
    pub giriama_to_en_key: Option<String>,
    pub giriama_asr_url: Option<String>,
    pub giriama_asr_key: Option<String>,
    pub giriama_tts_url: Option<String>,
    pub giriama_tts_key: Option<String>,
    pub google_asr_key: Option<String>,
    pub google_tts_key: Option<String>,
}

impl EndpointOverrides {
    /// Environment variable feeding each field.
    pub const ENV_VARS: [&'static str; 10] = [
        "AGRI_EN_TO_GIR_URL",
        "AGRI_EN_TO_GIR_KEY",
        "AGRI_GIR_TO_EN_URL",
        "AGRI_GIR_TO_EN_KEY",
        "AGRI_GIR_ASR_URL",
        "AGRI_GIR_ASR_KEY",
        "AGRI_GIR_TTS_URL",
        "AGRI_GIR_TTS_KEY",
        "AGRI_GOOGLE_ASR_KEY",
        "AGRI_GOOGLE_TTS_KEY",
    ];

    /// Collect overrides through `lookup` (normally `std::env::var`).
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let [a, b, c, d, e, f, g, h, i, j] = Self::ENV_VARS;
        Self {
            en_to_giriama_url: get(a),
            en_to_giriama_key: get(b),
            giriama_to_en_url: get(c),
            giriama_to_en_key: get(d),
            giriama_asr_url: get(e),
            giriama_asr_key: get(f),
            giriama_tts_url: get(g),
            giriama_tts_key: get(h),
            google_asr_key: get(i),
            google_tts_key: get(j),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// EndpointRegistry
// ---------------------------------------------------------------------------

/// Result of a translation lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub endpoint: EndpointConfig,
    /// `true` when only the reverse direction was configured.  The caller
    /// still sends the requested source/target roles.
    pub reversed: bool,
}

/// Holds the current endpoint tables.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    tables: EndpointTables,
}

impl EndpointRegistry {
    pub fn new(tables: EndpointTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &EndpointTables {
        &self.tables
    }

    /// Merge a partial reconfiguration.
    pub fn configure(&mut self, overrides: &EndpointOverrides) {
        self.tables.merge(overrides);
    }

    pub fn resolve(&self, capability: Capability, key: &str) -> Option<EndpointConfig> {
        self.tables.table(capability).get(key).cloned()
    }

    /// Exact direction first, then the reverse direction.
    pub fn resolve_translation(&self, source: &str, target: &str) -> Option<ResolvedEndpoint> {
        let direct = direction_key(source, target);
        if let Some(endpoint) = self.resolve(Capability::Translation, &direct) {
            return Some(ResolvedEndpoint {
                endpoint,
                reversed: false,
            });
        }
        let reverse = direction_key(target, source);
        self.resolve(Capability::Translation, &reverse)
            .map(|endpoint| ResolvedEndpoint {
                endpoint,
                reversed: true,
            })
    }
}

/// `"{source}-{target}"`.
pub fn direction_key(source: &str, target: &str) -> String {
    format!("{source}-{target}")
}

// ---------------------------------------------------------------------------
// SharedRegistry
// ---------------------------------------------------------------------------

/// Registry handle shared by the dispatchers.
///
/// Reconfiguration is not coordinated with in-flight requests: a request
/// reads the endpoint once, at dispatch time.
pub type SharedRegistry = Arc<RwLock<EndpointRegistry>>;

pub fn new_shared_registry(tables: EndpointTables) -> SharedRegistry {
    Arc::new(RwLock::new(EndpointRegistry::new(tables)))
}

/// Read access that survives a poisoned lock.
pub fn read_registry(registry: &SharedRegistry) -> std::sync::RwLockReadGuard<'_, EndpointRegistry> {
    registry.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Write access that survives a poisoned lock.
pub fn write_registry(registry: &SharedRegistry) -> std::sync::RwLockWriteGuard<'_, EndpointRegistry> {
    registry.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
