use std::time::Duration;

use async_trait::async_trait;
use swap_core::{Address, Amount, HashLock, LockId, Preimage, Timestamp, TokenSymbol};

use crate::error::ChainAdapterError;
use swap_crypto::OperatorKeyPair;
use tracing::{info, warn};

use crate::adapter::{ChainAdapter, LockRecord, LockState, TxHandle};
use crate::dialect::{DialectCache, LockReadDialect};
use crate::rpc::RpcTransport;

/// Configuration for one chain's [`HttpChainAdapter`] (SPEC_FULL §6,
/// per-chain configuration options).
pub struct ChainConfig {
    pub chain_name: String,
    pub rpc_url: String,
    pub fallback_rpc_urls: Vec<String>,
    pub htlc_contract_address: String,
    pub max_retries: u32,
    pub confirmation_poll_interval: Duration,
    /// Per-chain transaction cap passed through on every `lock` submission.
    pub gas_limit: u64,
    /// Per-chain transaction cap passed through on every `lock` submission.
    pub max_gas_price: u64,
}

/// A thin JSON-RPC-backed [`ChainAdapter`]. One instance per configured
/// chain, each owning its own signer and dialect cache — never shared
/// across two concurrent submitters (SPEC_FULL §5).
pub struct HttpChainAdapter {
    config: ChainConfig,
    transport: RpcTransport,
    signer: OperatorKeyPair,
    dialect: DialectCache,
}

impl HttpChainAdapter {
    pub fn new(config: ChainConfig, signer: OperatorKeyPair) -> Self {
        let transport = RpcTransport::new(
            config.rpc_url.clone(),
            config.fallback_rpc_urls.clone(),
            config.max_retries,
        );
        Self {
            config,
            transport,
            signer,
            dialect: DialectCache::new(),
        }
    }

    async fn probe_contracts_mapping(&self, lock_id: LockId) -> Result<bool, ChainAdapterError> {
        let params = serde_json::json!([self.config.htlc_contract_address, lock_id.to_hex()]);
        match self.transport.call_with_fallback("htlc_contracts", params).await {
            Ok(_) => Ok(true),
            Err(ChainAdapterError::Network(msg)) if msg.to_lowercase().contains("method not found") => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn probe_get_details(&self, lock_id: LockId) -> Result<bool, ChainAdapterError> {
        let params = serde_json::json!([self.config.htlc_contract_address, lock_id.to_hex()]);
        match self.transport.call_with_fallback("htlc_getDetails", params).await {
            Ok(_) => Ok(true),
            Err(ChainAdapterError::Network(msg)) if msg.to_lowercase().contains("method not found") => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn detected_dialect(&self) -> Result<LockReadDialect, ChainAdapterError> {
        self.dialect
            .get_or_detect(
                |id| self.probe_contracts_mapping(id),
                |id| self.probe_get_details(id),
            )
            .await
    }

    fn read_method_for(dialect: LockReadDialect) -> &'static str {
        match dialect {
            LockReadDialect::ContractsMapping => "htlc_contracts",
            LockReadDialect::GetDetails => "htlc_getDetails",
        }
    }

    /// For a non-native token, ensures the HTLC contract's allowance from
    /// the operator covers `value` before a lock is submitted — querying
    /// first and only approving if the current allowance falls short.
    async fn ensure_allowance(&self, token: &TokenSymbol, value: Amount) -> Result<(), ChainAdapterError> {
        let params = serde_json::json!([token.0, self.signer.address.0, self.config.htlc_contract_address]);
        let result = self.transport.call_with_fallback("token_allowance", params).await?;
        let current: Amount = result
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ChainAdapterError::InvalidParams("allowance: non-numeric response".into()))?;
        if current >= value {
            return Ok(());
        }

        let approve_params = serde_json::json!([
            token.0,
            self.config.htlc_contract_address,
            value.to_string(),
        ]);
        let result = self
            .transport
            .call_primary("token_approve", approve_params)
            .await
            .map_err(|_| ChainAdapterError::AllowanceFailed)?;
        if result.as_str().is_none() {
            return Err(ChainAdapterError::AllowanceFailed);
        }
        Ok(())
    }
}

fn parse_lock_state(raw: &str) -> LockState {
    match raw {
        "1" => LockState::Open,
        "2" => LockState::Claimed,
        "3" => LockState::Refunded,
        _ => LockState::Invalid,
    }
}

#[async_trait]
impl ChainAdapter for HttpChainAdapter {
    async fn lock(
        &self,
        lock_id: LockId,
        token: &TokenSymbol,
        beneficiary: &Address,
        hash_lock: HashLock,
        timelock: Timestamp,
        value: Amount,
    ) -> Result<TxHandle, ChainAdapterError> {
        if token.0 != swap_core::NATIVE_TOKEN_SYMBOL {
            self.ensure_allowance(token, value).await?;
        }

        let digest = {
            use sha3::{Digest, Keccak256};
            let mut hasher = Keccak256::new();
            hasher.update(lock_id.as_bytes());
            hasher.update(token.0.as_bytes());
            hasher.update(beneficiary.0.as_bytes());
            hasher.update(hash_lock.0);
            hasher.update(timelock.to_be_bytes());
            hasher.update(value.to_be_bytes());
            hasher.finalize()
        };
        let signature = self.signer.sign(&digest);

        let params = serde_json::json!([
            self.config.htlc_contract_address,
            lock_id.to_hex(),
            token.0,
            beneficiary.0,
            hash_lock.to_hex(),
            timelock,
            value.to_string(),
            hex::encode(signature.to_bytes()),
            self.config.gas_limit,
            self.config.max_gas_price,
        ]);
        let result = self.transport.call_primary("htlc_lock", params).await?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| ChainAdapterError::InvalidParams("lock: missing tx hash in response".into()))?;
        info!(chain = %self.config.chain_name, lock_id = %lock_id, tx_hash, "submitted lock");
        Ok(TxHandle(tx_hash.to_string()))
    }

    async fn claim(&self, lock_id: LockId, preimage: &Preimage) -> Result<TxHandle, ChainAdapterError> {
        let params = serde_json::json!([
            self.config.htlc_contract_address,
            lock_id.to_hex(),
            preimage.to_hex(),
        ]);
        let result = self.transport.call_primary("htlc_claim", params).await?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| ChainAdapterError::InvalidParams("claim: missing tx hash in response".into()))?;
        info!(chain = %self.config.chain_name, lock_id = %lock_id, tx_hash, "submitted claim");
        Ok(TxHandle(tx_hash.to_string()))
    }

    async fn refund(&self, lock_id: LockId) -> Result<TxHandle, ChainAdapterError> {
        let params = serde_json::json!([self.config.htlc_contract_address, lock_id.to_hex()]);
        let result = self.transport.call_primary("htlc_refund", params).await?;
        let tx_hash = result
            .as_str()
            .ok_or_else(|| ChainAdapterError::InvalidParams("refund: missing tx hash in response".into()))?;
        info!(chain = %self.config.chain_name, lock_id = %lock_id, tx_hash, "submitted refund");
        Ok(TxHandle(tx_hash.to_string()))
    }

    async fn get_lock(&self, lock_id: LockId) -> Result<LockRecord, ChainAdapterError> {
        let dialect = self.detected_dialect().await?;
        let method = Self::read_method_for(dialect);
        let params = serde_json::json!([self.config.htlc_contract_address, lock_id.to_hex()]);
        let result = self.transport.call_with_fallback(method, params).await?;

        if result.is_null() {
            return Ok(LockRecord {
                token: TokenSymbol(String::new()),
                beneficiary: Address(String::new()),
                originator: Address(String::new()),
                hash_lock: HashLock([0u8; 32]),
                timelock: 0,
                value: 0,
                state: LockState::Invalid,
            });
        }

        let token = result["token"].as_str().unwrap_or_default().to_string();
        let beneficiary = result["beneficiary"].as_str().unwrap_or_default().to_string();
        let originator = result["originator"].as_str().unwrap_or_default().to_string();
        let hash_lock_hex = result["hashLock"].as_str().unwrap_or_default();
        let timelock = result["timelock"].as_i64().unwrap_or(0);
        let value: Amount = result["value"]
            .as_str()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let state = parse_lock_state(result["state"].as_str().unwrap_or("0"));

        Ok(LockRecord {
            token: TokenSymbol(token),
            beneficiary: Address(beneficiary),
            originator: Address(originator),
            hash_lock: HashLock::from_hex(hash_lock_hex).unwrap_or(HashLock([0u8; 32])),
            timelock,
            value,
            state,
        })
    }

    async fn current_chain_time(&self) -> Result<Timestamp, ChainAdapterError> {
        let result = self
            .transport
            .call_with_fallback("chain_currentTime", serde_json::json!([]))
            .await?;
        result
            .as_i64()
            .ok_or_else(|| ChainAdapterError::InvalidParams("currentChainTime: non-integer response".into()))
    }

    async fn wait_for_confirmation(&self, tx: &TxHandle, depth: u64) -> Result<(), ChainAdapterError> {
        loop {
            let result = self
                .transport
                .call_with_fallback(
                    "chain_getTransactionConfirmations",
                    serde_json::json!([tx.0]),
                )
                .await?;
            let confirmations = result.as_u64().unwrap_or(0);
            if confirmations >= depth {
                return Ok(());
            }
            warn!(tx = %tx, confirmations, depth, "waiting for confirmation depth");
            tokio::time::sleep(self.config.confirmation_poll_interval).await;
        }
    }

    async fn get_balance(&self, token: &TokenSymbol) -> Result<Amount, ChainAdapterError> {
        let params = serde_json::json!([self.config.htlc_contract_address, token.0, self.signer.address.0]);
        let result = self
            .transport
            .call_with_fallback("htlc_balance", params)
            .await?;
        result
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ChainAdapterError::InvalidParams("getBalance: non-numeric response".into()))
    }

    fn chain_name(&self) -> &str {
        &self.config.chain_name
    }

    fn operator_address(&self) -> &Address {
        &self.signer.address
    }
}
