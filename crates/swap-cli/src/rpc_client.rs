use anyhow::{bail, Context};

/// Simple JSON-RPC 2.0 client used by the CLI to talk to a running orchestrator.
///
/// Uses raw HTTP POST with serde_json rather than the full jsonrpsee client
/// to keep the CLI binary lean and dependency-minimal.
pub struct SwapRpcClient {
    url: String,
    client: reqwest::Client,
}

impl SwapRpcClient {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Call a JSON-RPC method and return the `result` field.
    async fn call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> anyhow::Result<serde_json::Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("connecting to orchestrator at {}", self.url))?;

        let json: serde_json::Value = resp.json().await.context("parsing RPC response")?;

        if let Some(err) = json.get("error") {
            bail!("RPC error: {}", err);
        }

        Ok(json["result"].clone())
    }

    pub async fn create(&self, draft: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        self.call("swap_create", serde_json::json!([draft])).await
    }

    pub async fn get(&self, id: &str) -> anyhow::Result<serde_json::Value> {
        self.call("swap_get", serde_json::json!([id])).await
    }

    pub async fn list(
        &self,
        user_address: Option<&str>,
        status: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> anyhow::Result<serde_json::Value> {
        let filter = serde_json::json!({
            "user_address": user_address,
            "status": status,
        });
        self.call("swap_list", serde_json::json!([filter, limit, offset])).await
    }

    pub async fn cancel(&self, id: &str, user_address: &str) -> anyhow::Result<serde_json::Value> {
        self.call("swap_cancel", serde_json::json!([id, user_address])).await
    }

    pub async fn get_events(&self, id: &str) -> anyhow::Result<serde_json::Value> {
        self.call("swap_getEvents", serde_json::json!([id])).await
    }
}
