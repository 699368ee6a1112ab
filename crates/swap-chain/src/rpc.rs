use std::time::Duration;

use crate::error::ChainAdapterError;
use tracing::warn;

use crate::retry::{backoff_delay, is_retryable_network_error};

/// Thin JSON-RPC 2.0 client over `reqwest`. One `call` helper builds the
/// envelope, posts it, and raises on a non-null `error` field — the adapter
/// owns no long-lived connection state beyond the `reqwest::Client` itself.
pub struct RpcTransport {
    primary: String,
    fallbacks: Vec<String>,
    client: reqwest::Client,
    max_retries: u32,
}

impl RpcTransport {
    pub fn new(primary: impl Into<String>, fallbacks: Vec<String>, max_retries: u32) -> Self {
        Self {
            primary: primary.into(),
            fallbacks,
            client: reqwest::Client::new(),
            max_retries,
        }
    }

    /// Calls `method` against the primary endpoint, retrying transient
    /// network failures with exponential backoff. Writes must always go
    /// through the primary to avoid nonce divergence (SPEC_FULL §4.1).
    pub async fn call_primary(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainAdapterError> {
        self.call_with_retry(&self.primary, method, params).await
    }

    /// Calls `method` against the primary, failing over to the configured
    /// fallback endpoints in order on persistent primary failure. Intended
    /// for read-only operations only.
    pub async fn call_with_fallback(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainAdapterError> {
        match self.call_with_retry(&self.primary, method, params.clone()).await {
            Ok(v) => Ok(v),
            Err(primary_err) if primary_err.is_transient() => {
                for fallback in &self.fallbacks {
                    warn!(endpoint = %fallback, "falling back after primary RPC failure");
                    if let Ok(v) = self.call_with_retry(fallback, method, params.clone()).await {
                        return Ok(v);
                    }
                }
                Err(primary_err)
            }
            Err(e) => Err(e),
        }
    }

    async fn call_with_retry(
        &self,
        url: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainAdapterError> {
        let mut attempt = 0;
        loop {
            match self.call_once(url, method, params.clone()).await {
                Ok(v) => return Ok(v),
                Err(e) if is_retryable_network_error(&e) && attempt < self.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        method,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying transient RPC failure"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_once(
        &self,
        url: &str,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainAdapterError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let resp = self
            .client
            .post(url)
            .json(&body)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| ChainAdapterError::Network(e.to_string()))?;

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ChainAdapterError::Network(format!("parsing RPC response: {e}")))?;

        if let Some(err) = json.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error");
            if message.to_lowercase().contains("revert") {
                return Err(ChainAdapterError::Reverted(message.to_string()));
            }
            return Err(ChainAdapterError::Network(format!("RPC error: {message}")));
        }

        Ok(json["result"].clone())
    }
}
