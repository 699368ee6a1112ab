//! End-to-end smoke test for swap-node.
//!
//! Starts a real orchestrator process against a single configured chain,
//! creates a swap via JSON-RPC, and asserts the lifecycle's read/cancel
//! surface behaves as expected before any chain-side action would occur.
//!
//! Run with:
//!   cargo test -p swap-node --test smoke

use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

struct NodeGuard {
    child: Child,
    data_dir: PathBuf,
}

impl Drop for NodeGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn rpc_call(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });
    let resp = client
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("RPC call {method} failed: {e}"));
    let json: serde_json::Value = resp.json().await.expect("parse RPC JSON");
    if let Some(err) = json.get("error") {
        panic!("RPC error from {method}: {err}");
    }
    json["result"].clone()
}

async fn wait_for_rpc(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "swap_list",
        "params": [{}, 1, 0],
        "id": 1
    });
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.post(url).json(&body).send().await {
            if resp.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    false
}

#[tokio::test]
async fn smoke_create_get_list_cancel() {
    let base_dir = std::env::temp_dir().join(format!("swap_node_e2e_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&base_dir);
    std::fs::create_dir_all(&base_dir).unwrap();

    // ── Operator signing key ────────────────────────────────────────────────
    let key_path = base_dir.join("operator.key");
    std::fs::write(&key_path, "11".repeat(32)).unwrap();

    // ── Token registry ──────────────────────────────────────────────────────
    let registry_path = base_dir.join("registry.json");
    std::fs::write(
        &registry_path,
        serde_json::json!({
            "tokens": [
                { "chain": "ethereum", "symbol": "USDC", "onchain_address": "0xAAA", "decimals": 6 },
                { "chain": "polygon",  "symbol": "USDC", "onchain_address": "0xBBB", "decimals": 6 }
            ],
            "allowed_pairs": [
                { "source_chain": "ethereum", "source_token": "USDC", "target_chain": "polygon", "target_token": "USDC" }
            ]
        })
        .to_string(),
    )
    .unwrap();

    // ── Chain config (an unreachable RPC is fine — the smoke test never
    // waits long enough for a resolver tick to touch it) ───────────────────
    let config_path = base_dir.join("config.json");
    std::fs::write(
        &config_path,
        serde_json::json!({
            "chains": [{
                "chain_name": "ethereum",
                "rpc_url": "http://127.0.0.1:1",
                "htlc_contract_address": "0xCCC",
                "operator_signing_key": key_path.to_str().unwrap(),
                "processing_interval_ms": 60_000
            }, {
                "chain_name": "polygon",
                "rpc_url": "http://127.0.0.1:1",
                "htlc_contract_address": "0xDDD",
                "operator_signing_key": key_path.to_str().unwrap(),
                "processing_interval_ms": 60_000
            }]
        })
        .to_string(),
    )
    .unwrap();

    let rpc_port = free_port();
    let rpc_url = format!("http://127.0.0.1:{}", rpc_port);
    let data_dir = base_dir.join("state");

    let node_bin = env!("CARGO_BIN_EXE_swap-node");
    let child = Command::new(node_bin)
        .args([
            "--data-dir", data_dir.to_str().unwrap(),
            "--rpc-addr", &format!("127.0.0.1:{}", rpc_port),
            "--config", config_path.to_str().unwrap(),
            "--registry", registry_path.to_str().unwrap(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn swap-node");

    let _guard = NodeGuard { child, data_dir: base_dir };

    let http = reqwest::Client::new();
    assert!(
        wait_for_rpc(&http, &rpc_url, Duration::from_secs(20)).await,
        "swap-node did not become ready within 20 seconds"
    );

    // ── Create a swap ────────────────────────────────────────────────────────
    let draft = serde_json::json!({
        "user_address": "0xUser",
        "beneficiary": "0xUser",
        "source_chain": "ethereum",
        "source_token": "USDC",
        "source_amount": "1000000",
        "target_chain": "polygon",
        "target_token": "USDC",
        "expected_amount": "999000",
        "slippage_tolerance": 0.02,
        "expiration_time": chrono::Utc::now().timestamp() + 7_200,
    });
    let created = rpc_call(&http, &rpc_url, "swap_create", serde_json::json!([draft])).await;
    assert_eq!(created["status"], "PENDING");
    let id = created["id"].as_str().unwrap().to_string();
    assert!(created.get("preimage").is_none(), "preimage must never be returned to the client");

    // ── Fetch it back ────────────────────────────────────────────────────────
    let fetched = rpc_call(&http, &rpc_url, "swap_get", serde_json::json!([id])).await;
    assert_eq!(fetched["id"], id);
    assert_eq!(fetched["source_amount"], "1000000");

    // ── List filtered by user ───────────────────────────────────────────────
    let listed = rpc_call(
        &http,
        &rpc_url,
        "swap_list",
        serde_json::json!([{ "user_address": "0xUser" }, 50, 0]),
    )
    .await;
    let listed = listed.as_array().unwrap();
    assert!(listed.iter().any(|s| s["id"] == id));

    // ── Event history has the initiation event ──────────────────────────────
    let events = rpc_call(&http, &rpc_url, "swap_getEvents", serde_json::json!([id])).await;
    let events = events.as_array().unwrap();
    assert_eq!(events[0]["event_type"], "INITIATED");

    // ── Cancel by the originator succeeds ───────────────────────────────────
    let cancelled = rpc_call(
        &http,
        &rpc_url,
        "swap_cancel",
        serde_json::json!([id, "0xUser"]),
    )
    .await;
    assert_eq!(cancelled["status"], "CANCELLED");

    // ── A second cancel attempt fails: no longer PENDING ────────────────────
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "swap_cancel",
        "params": [id, "0xUser"],
        "id": 1
    });
    let resp = http.post(&rpc_url).json(&body).send().await.unwrap();
    let json: serde_json::Value = resp.json().await.unwrap();
    assert!(json.get("error").is_some(), "cancelling a non-pending swap must fail");
}
