//! Text translation with remote → dictionary → placeholder fallback.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::dictionary::PhraseDictionary;
use crate::config::TranslationConfig;
use crate::error::{DispatchError, Result};
use crate::fallback::{FallbackChain, Outcome, Strategy};
use crate::language::LanguageNormalizer;
use crate::registry::{read_registry, EndpointConfig, SharedRegistry};
use crate::remote;

// ---------------------------------------------------------------------------
// TranslationJob
// ---------------------------------------------------------------------------

/// A validated request with its endpoint already resolved.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub text: String,
    /// Canonical application codes.
    pub source: String,
    pub target: String,
    pub endpoint: EndpointConfig,
    /// The endpoint was registered for `target → source`.
    pub reversed: bool,
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// One POST to the resolved translation endpoint.
pub struct RemoteTranslation {
    client: reqwest::Client,
    normalizer: Arc<LanguageNormalizer>,
    max_length: u32,
    num_beams: u32,
}

impl RemoteTranslation {
    pub fn new(config: &TranslationConfig, normalizer: Arc<LanguageNormalizer>) -> Self {
        Self {
            client: remote::build_client(config.timeout_secs),
            normalizer,
            max_length: config.max_length,
            num_beams: config.num_beams,
        }
    }

    async fn call(&self, job: &TranslationJob) -> Result<String> {
        // Roles stay as requested even for a reversed endpoint.
        let (source_lang, target_lang) = self.normalizer.tokens(&job.source, &job.target);
        let body = json!({
            "input": {
                "text": job.text,
                "source_lang": source_lang,
                "target_lang": target_lang,
                "max_length": self.max_length,
                "num_beams": self.num_beams,
            }
        });

        let response = remote::post_json(&self.client, &job.endpoint, &body).await?;
        extract_translation(&response)
            .ok_or_else(|| DispatchError::RemoteCall("response carried no translation".into()))
    }
}

/// `output.translations`, or a top-level `translations`; either a string or
/// an array whose first element is used.
fn extract_translation(response: &Value) -> Option<String> {
    let field = match response.pointer("/output/translations") {
        Some(v) if !v.is_null() => v,
        _ => response.get("translations")?,
    };
    match field {
        Value::Array(items) => items.first().and_then(remote::non_empty_str),
        other => remote::non_empty_str(other),
    }
}

#[async_trait]
impl Strategy<TranslationJob, String> for RemoteTranslation {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn attempt(&self, job: &TranslationJob) -> Outcome<String> {
        Outcome::or_next(self.call(job).await)
    }
}

/// Static phrase lookup keyed by the source language.
pub struct DictionaryFallback {
    dictionary: PhraseDictionary,
}

impl DictionaryFallback {
    pub fn new(dictionary: PhraseDictionary) -> Self {
        Self { dictionary }
    }
}

#[async_trait]
impl Strategy<TranslationJob, String> for DictionaryFallback {
    fn name(&self) -> &'static str {
        "dictionary"
    }

    async fn attempt(&self, job: &TranslationJob) -> Outcome<String> {
        match self.dictionary.lookup(&job.source, &job.text) {
            Some(hit) => Outcome::Done(hit.to_string()),
            None => Outcome::TryNext(DispatchError::RemoteCall(
                "phrase not in offline dictionary".into(),
            )),
        }
    }
}

/// `"[{text} translated to {target label}]"`.  Never fails.
pub struct PlaceholderFallback {
    normalizer: Arc<LanguageNormalizer>,
}

impl PlaceholderFallback {
    pub fn new(normalizer: Arc<LanguageNormalizer>) -> Self {
        Self { normalizer }
    }
}

#[async_trait]
impl Strategy<TranslationJob, String> for PlaceholderFallback {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    async fn attempt(&self, job: &TranslationJob) -> Outcome<String> {
        Outcome::Done(format!(
            "[{} translated to {}]",
            job.text,
            self.normalizer.label(&job.target)
        ))
    }
}

// ---------------------------------------------------------------------------
// TranslationDispatcher
// ---------------------------------------------------------------------------

/// Validates requests, resolves the endpoint, and runs the fallback chain.
pub struct TranslationDispatcher {
    registry: SharedRegistry,
    normalizer: Arc<LanguageNormalizer>,
    chain: FallbackChain<TranslationJob, String>,
}

impl TranslationDispatcher {
    /// Standard chain: `remote`, `dictionary`, `placeholder`.
    pub fn new(
        registry: SharedRegistry,
        normalizer: Arc<LanguageNormalizer>,
        config: &TranslationConfig,
    ) -> Self {
        let chain = FallbackChain::new("translate")
            .then(RemoteTranslation::new(config, Arc::clone(&normalizer)))
            .then(DictionaryFallback::new(PhraseDictionary::builtin()))
            .then(PlaceholderFallback::new(Arc::clone(&normalizer)));
        Self::with_chain(registry, normalizer, chain)
    }

    pub fn with_chain(
        registry: SharedRegistry,
        normalizer: Arc<LanguageNormalizer>,
        chain: FallbackChain<TranslationJob, String>,
    ) -> Self {
        Self {
            registry,
            normalizer,
            chain,
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    /// Translate `text` from `source` to `target`.
    ///
    /// Errors only for invalid input or an unconfigured pair; remote
    /// failures resolve through the fallbacks.
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let job = self.prepare(text, source, target)?;
        log::info!(
            "translate: {} -> {} ({} chars)",
            job.source,
            job.target,
            job.text.chars().count()
        );
        self.chain.run(&job).await
    }

    fn prepare(&self, text: &str, source: &str, target: &str) -> Result<TranslationJob> {
        if text.trim().is_empty() {
            return Err(DispatchError::Validation("text is empty".into()));
        }
        let source = self.normalizer.canonical(source);
        let target = self.normalizer.canonical(target);
        if source == target {
            return Err(DispatchError::Validation(format!(
                "source and target are both {source}"
            )));
        }

        let resolved = read_registry(&self.registry)
            .resolve_translation(&source, &target)
            .ok_or_else(|| DispatchError::UnsupportedLanguagePair {
                from: source.clone(),
                to: target.clone(),
            })?;
        if resolved.reversed {
            log::info!("translate: no {source}-{target} model, using the {target}-{source} endpoint");
        }

        Ok(TranslationJob {
            text: text.to_string(),
            source,
            target,
            endpoint: resolved.endpoint,
            reversed: resolved.reversed,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{new_shared_registry, EndpointTables};
    use mockito::{Matcher, Server};

    fn dispatcher_for(tables: EndpointTables) -> TranslationDispatcher {
        TranslationDispatcher::new(
            new_shared_registry(tables),
            Arc::new(LanguageNormalizer::default()),
            &TranslationConfig {
                timeout_secs: 5,
                ..Default::default()
            },
        )
    }

    fn tables_with(direction: &str, url: String) -> EndpointTables {
        let mut tables = EndpointTables::empty();
        tables
            .translation
            .insert(direction.into(), EndpointConfig::new(url).with_key("mt-key"));
        tables
    }

    /// Endpoint that refuses connections.
    fn dead_endpoint() -> String {
        "http://127.0.0.1:9/translate".into()
    }

    #[test]
    fn chain_order_is_inspectable() {
        let d = dispatcher_for(EndpointTables::default());
        assert_eq!(d.strategy_names(), vec!["remote", "dictionary", "placeholder"]);
    }

    #[tokio::test]
    async fn remote_success_with_normalised_tokens() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/en-to-gir")
            .match_header("authorization", "Bearer mt-key")
            .match_body(Matcher::Json(json!({
                "input": {
                    "text": "maize",
                    "source_lang": "en",
                    "target_lang": "sw",
                    "max_length": 150,
                    "num_beams": 5
                }
            })))
            .with_status(200)
            .with_body(r#"{"output":{"translations":"mahindi"}}"#)
            .create_async()
            .await;

        let d = dispatcher_for(tables_with("en-gir", format!("{}/en-to-gir", server.url())));
        assert_eq!(d.translate("maize", "en", "gir").await.unwrap(), "mahindi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn array_translations_use_first_element() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/t")
            .with_status(200)
            .with_body(r#"{"output":{"translations":["mbegu","other"]}}"#)
            .create_async()
            .await;

        let d = dispatcher_for(tables_with("en-gir", format!("{}/t", server.url())));
        assert_eq!(d.translate("seeds", "en", "gir").await.unwrap(), "mbegu");
    }

    #[tokio::test]
    async fn reverse_endpoint_keeps_requested_roles() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/gir-to-en")
            .match_body(Matcher::PartialJson(json!({
                "input": { "source_lang": "en", "target_lang": "sw" }
            })))
            .with_status(200)
            .with_body(r#"{"translations":"udongo"}"#)
            .create_async()
            .await;

        let d = dispatcher_for(tables_with("gir-en", format!("{}/gir-to-en", server.url())));
        assert_eq!(d.translate("soil", "en", "gir").await.unwrap(), "udongo");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn reverse_endpoint_failure_still_returns_a_value() {
        let d = dispatcher_for(tables_with("gir-en", dead_endpoint()));
        let out = d.translate("weather forecast", "en", "gir").await.unwrap();
        assert_eq!(out, "[weather forecast translated to Giriama]");
    }

    #[tokio::test]
    async fn dictionary_fallback_is_case_insensitive() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/t")
            .with_status(500)
            .expect_at_least(2)
            .create_async()
            .await;

        let d = dispatcher_for(tables_with("en-gir", format!("{}/t", server.url())));
        let upper = d.translate("Irrigation System", "en", "gir").await.unwrap();
        let lower = d.translate("irrigation system", "en", "gir").await.unwrap();
        assert_eq!(upper, "mfumo wa kunyunyizia");
        assert_eq!(upper, lower);
    }

    #[tokio::test]
    async fn empty_translation_falls_back() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/t")
            .with_status(200)
            .with_body(r#"{"output":{"translations":""}}"#)
            .create_async()
            .await;

        let d = dispatcher_for(tables_with("gir-en", format!("{}/t", server.url())));
        let out = d.translate("Kilimo Endelevu", "gir", "en").await.unwrap();
        assert_eq!(out, "sustainable farming");
    }

    #[tokio::test]
    async fn placeholder_names_target_language() {
        let d = dispatcher_for(tables_with("gir-en", dead_endpoint()));
        let out = d.translate("Nyumba", "gir", "en").await.unwrap();
        assert_eq!(out, "[Nyumba translated to English]");
    }

    #[tokio::test]
    async fn same_language_is_a_validation_error() {
        let d = dispatcher_for(EndpointTables::default());
        for code in ["en", "gir", "luo"] {
            let err = d.translate("hello", code, code).await.unwrap_err();
            assert!(matches!(err, DispatchError::Validation(_)), "{code}");
        }
        // Aliases are resolved before comparing.
        let err = d.translate("hello", "gir", "nyf").await.unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_text_is_a_validation_error() {
        let d = dispatcher_for(EndpointTables::default());
        for text in ["", "   "] {
            let err = d.translate(text, "en", "gir").await.unwrap_err();
            assert!(matches!(err, DispatchError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn unconfigured_pair_is_unsupported() {
        let d = dispatcher_for(EndpointTables::empty());
        let err = d.translate("hello", "en", "gir").await.unwrap_err();
        assert!(matches!(
            err,
            DispatchError::UnsupportedLanguagePair { ref from, ref to }
                if from == "en" && to == "gir"
        ));
    }

    #[tokio::test]
    async fn reconfiguration_applies_to_the_next_request() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/new")
            .with_status(200)
            .with_body(r#"{"output":{"translations":"mpya"}}"#)
            .create_async()
            .await;

        let registry = new_shared_registry(tables_with("en-gir", dead_endpoint()));
        let d = TranslationDispatcher::new(
            Arc::clone(&registry),
            Arc::new(LanguageNormalizer::default()),
            &TranslationConfig::default(),
        );
        crate::registry::write_registry(&registry).configure(&crate::registry::EndpointOverrides {
            en_to_giriama_url: Some(format!("{}/new", server.url())),
            ..Default::default()
        });
        assert_eq!(d.translate("new", "en", "gir").await.unwrap(), "mpya");
    }

    #[test]
    fn extract_prefers_output_translations() {
        let v = json!({"output": {"translations": "a"}, "translations": "b"});
        assert_eq!(extract_translation(&v).as_deref(), Some("a"));
        assert!(extract_translation(&json!({"output": {}})).is_none());
        assert!(extract_translation(&json!({"output": {"translations": []}})).is_none());
    }
}
