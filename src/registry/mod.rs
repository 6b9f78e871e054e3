//! Endpoint registry — which remote model serves which capability.
//!
//! ```text
//! defaults ─▶ settings.toml ─▶ AGRI_* env vars ─▶ configure(overrides) at runtime
//!                                   │
//!                                   ▼
//!                       SharedRegistry (Arc<RwLock<…>>)
//!                         │          │          │
//!                   translate   transcribe   synthesize
//! ```

pub mod endpoints;

pub use endpoints::{
    direction_key, new_shared_registry, read_registry, write_registry, Capability,
    EndpointConfig, EndpointOverrides, EndpointRegistry, EndpointTables, ResolvedEndpoint,
    SharedRegistry, GOOGLE_ASR_URL, GOOGLE_TTS_URL,
};
