//! swap-node — the orchestrator's resolver/API binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the swap store and inventory ledger
//!   2. Load the token registry and per-chain config file
//!   3. Build one chain adapter + resolver engine per configured chain
//!   4. Start the JSON-RPC 2.0 server
//!   5. Run every engine's tick loop until a shutdown signal arrives

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use swap_api::server::RpcServerState;
use swap_api::RpcServer;
use swap_chain::{ChainConfig, HttpChainAdapter};
use swap_crypto::OperatorKeyPair;
use swap_registry::TokenRegistry;
use swap_resolver::{EngineConfig, FixedRatioOracle, ResolverEngine};
use swap_store::SwapStore;

#[derive(Parser, Debug)]
#[command(
    name = "swap-node",
    version,
    about = "Cross-chain swap orchestrator — resolver engines + JSON-RPC API"
)]
struct Args {
    /// Directory for the persistent swap store.
    #[arg(long, default_value = "~/.swap-node/data")]
    data_dir: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8645")]
    rpc_addr: SocketAddr,

    /// Path to the per-chain config JSON file.
    #[arg(long)]
    config: PathBuf,

    /// Path to the token registry JSON file.
    #[arg(long)]
    registry: PathBuf,
}

/// One entry in `--config`'s chain list. Mirrors the enumerated options in
/// the external-interfaces configuration surface.
#[derive(Debug, Deserialize)]
struct ChainFileEntry {
    chain_name: String,
    rpc_url: String,
    #[serde(default)]
    fallback_rpc_urls: Vec<String>,
    htlc_contract_address: String,
    /// Path to a file holding the operator's raw 32-byte secret key, hex-encoded.
    operator_signing_key: PathBuf,
    #[serde(default = "default_gas_limit")]
    gas_limit: u64,
    #[serde(default = "default_max_gas_price")]
    max_gas_price: u64,
    #[serde(default = "default_processing_interval_ms")]
    processing_interval_ms: u64,
    #[serde(default = "default_max_batch_size")]
    max_batch_size: usize,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_confirmation_depth")]
    confirmation_depth: u64,
}

fn default_gas_limit() -> u64 {
    500_000
}
fn default_max_gas_price() -> u64 {
    100_000_000_000
}
fn default_processing_interval_ms() -> u64 {
    swap_core::DEFAULT_PROCESSING_INTERVAL_MS
}
fn default_max_batch_size() -> usize {
    swap_core::DEFAULT_MAX_BATCH_SIZE
}
fn default_max_retries() -> u32 {
    swap_core::DEFAULT_MAX_RETRIES
}
fn default_confirmation_depth() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    chains: Vec<ChainFileEntry>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,swap=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("swap-node starting");

    // ── Swap store + ledger ───────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let store = Arc::new(SwapStore::open(&data_dir).context("opening swap store")?);
    let ledger = Arc::new(store.open_ledger().context("opening inventory ledger")?);

    // ── Token registry ────────────────────────────────────────────────────
    let registry = Arc::new(
        TokenRegistry::from_file(&args.registry)
            .with_context(|| format!("loading token registry from {}", args.registry.display()))?,
    );

    // ── Per-chain config ───────────────────────────────────────────────────
    let config_json = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading config from {}", args.config.display()))?;
    let config_file: ConfigFile =
        serde_json::from_str(&config_json).context("parsing config JSON")?;

    if config_file.chains.is_empty() {
        anyhow::bail!("config file declares no chains");
    }

    // ── Build one adapter per configured chain ──────────────────────────────
    // Built up front, keyed by chain name, so every engine can independently
    // verify another chain's on-chain lock state (SPEC_FULL §4.4 step 2)
    // without holding that chain's signer.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut chain_setups = Vec::new();
    let mut peer_adapters: HashMap<swap_core::ChainId, Arc<dyn swap_chain::ChainAdapter>> = HashMap::new();

    for chain in config_file.chains {
        let secret_hex = std::fs::read_to_string(&chain.operator_signing_key)
            .with_context(|| format!("reading signing key from {}", chain.operator_signing_key.display()))?;
        let secret_bytes = hex::decode(secret_hex.trim())
            .with_context(|| format!("signing key for {} is not valid hex", chain.chain_name))?;
        let secret: [u8; 32] = secret_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("signing key for {} must be exactly 32 bytes", chain.chain_name))?;
        let signer = OperatorKeyPair::from_raw(secret)
            .map_err(|e| anyhow::anyhow!("invalid signing key for {}: {e}", chain.chain_name))?;

        let chain_id = swap_core::ChainId(chain.chain_name.clone());
        let adapter_config = ChainConfig {
            chain_name: chain.chain_name.clone(),
            rpc_url: chain.rpc_url,
            fallback_rpc_urls: chain.fallback_rpc_urls,
            htlc_contract_address: chain.htlc_contract_address,
            max_retries: chain.max_retries,
            confirmation_poll_interval: Duration::from_secs(2),
            gas_limit: chain.gas_limit,
            max_gas_price: chain.max_gas_price,
        };
        let adapter: Arc<dyn swap_chain::ChainAdapter> =
            Arc::new(HttpChainAdapter::new(adapter_config, signer));

        let engine_config = EngineConfig {
            processing_interval: Duration::from_millis(chain.processing_interval_ms),
            max_batch_size: chain.max_batch_size,
            max_retries: chain.max_retries,
            refund_sweep_tick_multiple: swap_core::REFUND_SWEEP_TICK_MULTIPLE,
            confirmation_depth: chain.confirmation_depth,
        };

        peer_adapters.insert(chain_id.clone(), Arc::clone(&adapter));
        chain_setups.push((chain_id, adapter, engine_config));
    }

    let peer_adapters = Arc::new(peer_adapters);

    // ── Build one engine per configured chain ───────────────────────────────
    let mut engine_handles = Vec::new();
    let mut chain_names = HashMap::new();

    for (chain_id, adapter, engine_config) in chain_setups {
        // Deployments without a live price feed quote at par; replace with a
        // DEX/oracle-backed PriceOracle for a real deployment.
        let oracle: Arc<dyn swap_resolver::PriceOracle> = Arc::new(FixedRatioOracle::new(1.0));

        let engine = ResolverEngine::new(
            chain_id.clone(),
            Arc::clone(&store),
            Arc::clone(&ledger),
            Arc::clone(&registry),
            adapter,
            Arc::clone(&peer_adapters),
            oracle,
            engine_config,
        );

        let engine_shutdown_rx = shutdown_rx.clone();
        let name = chain_id.clone();
        let handle = tokio::spawn(async move {
            engine.run(engine_shutdown_rx).await;
        });
        engine_handles.push(handle);
        chain_names.insert(name, ());
    }

    info!(chains = chain_names.len(), "resolver engines started");

    // ── RPC server ─────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState { store: Arc::clone(&store) });
    let rpc_handle = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    info!(addr = %args.rpc_addr, "node ready");

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("shutdown requested, draining resolver engines");
    let _ = shutdown_tx.send(true);

    for handle in engine_handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "resolver engine task panicked during shutdown");
        }
    }
    rpc_handle.stop().ok();

    Ok(())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
