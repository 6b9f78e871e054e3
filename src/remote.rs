//! JSON-over-HTTP calls to model endpoints.
//!
//! Every remote strategy sends exactly one POST per attempt through
//! [`post_json`].  The bearer header is attached only when the endpoint has a
//! non-empty key.

use std::time::Duration;

use serde_json::Value;

use crate::error::DispatchError;
use crate::registry::EndpointConfig;

/// Client with a per-request timeout.  Falls back to a default client if the
/// builder fails.
pub fn build_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// POST `body` to `endpoint` and return the parsed JSON response.
///
/// Non-2xx statuses, unparseable bodies and bodies carrying a top-level
/// `error` member are all reported as [`DispatchError::RemoteCall`].
pub async fn post_json(
    client: &reqwest::Client,
    endpoint: &EndpointConfig,
    body: &Value,
) -> Result<Value, DispatchError> {
    let mut req = client.post(&endpoint.url).json(body);
    if let Some(key) = endpoint.bearer() {
        req = req.bearer_auth(key);
    }

    let response = req.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DispatchError::RemoteCall(format!(
            "{} responded with status {status}",
            endpoint.url
        )));
    }

    let json: Value = response
        .json()
        .await
        .map_err(|e| DispatchError::RemoteCall(format!("invalid JSON response: {e}")))?;

    match json.get("error") {
        Some(err) if !err.is_null() => {
            let message = err["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            Err(DispatchError::RemoteCall(message))
        }
        _ => Ok(json),
    }
}

/// Non-empty trimmed string at `value`, if any.
pub fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
