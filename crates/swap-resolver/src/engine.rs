use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use swap_chain::{ChainAdapter, ChainAdapterError, LockState};
use swap_core::{
    within_amount_tolerance, ChainId, EventData, OperationStatus, OperationType, ResolverOperation,
    SwapError, SwapEventType, SwapPatch, SwapStatus, Timestamp, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_PROCESSING_INTERVAL_MS, REFUND_SWEEP_TICK_MULTIPLE,
};
use swap_crypto::LockIdGenerator;
use swap_registry::TokenRegistry;
use swap_store::{InventoryLedger, ResolverRole, SwapStore};
use tracing::{error, info, warn};

use crate::price::PriceOracle;

/// Per-chain tuning, overridable via config (SPEC_FULL §6).
pub struct EngineConfig {
    pub processing_interval: Duration,
    pub max_batch_size: usize,
    pub max_retries: u32,
    pub refund_sweep_tick_multiple: u64,
    pub confirmation_depth: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            processing_interval: Duration::from_millis(DEFAULT_PROCESSING_INTERVAL_MS),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_retries: swap_core::DEFAULT_MAX_RETRIES,
            refund_sweep_tick_multiple: REFUND_SWEEP_TICK_MULTIPLE,
            confirmation_depth: 1,
        }
    }
}

/// `swap-chain` and `swap-core` each own their error enum (SPEC_FULL
/// §7.1); the engine is the one place that needs both, so it maps at the
/// boundary instead of either crate depending on the other.
fn map_chain_error(e: ChainAdapterError) -> SwapError {
    match e {
        ChainAdapterError::InsufficientBalance => SwapError::InsufficientBalance,
        ChainAdapterError::AllowanceFailed => SwapError::AllowanceFailed,
        ChainAdapterError::DuplicateLockId(s) => SwapError::DuplicateLockId(s),
        ChainAdapterError::InvalidParams(s) => SwapError::InvalidParams(s),
        ChainAdapterError::Network(s) => SwapError::Network(s),
        ChainAdapterError::Reverted(s) => SwapError::Reverted(s),
        ChainAdapterError::NotClaimable(s) => SwapError::NotClaimable(s),
        ChainAdapterError::WrongPreimage => SwapError::WrongPreimage,
        ChainAdapterError::ConfirmationTimeout(s) => SwapError::ConfirmationTimeout(s),
        ChainAdapterError::DialectDetectionFailed => SwapError::DialectDetectionFailed,
    }
}

fn now_unix() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs() as Timestamp
}

/// Drives every swap for which `chain_name` plays the target or source role
/// through the state machine of SPEC_FULL §4.5. One instance per configured
/// chain; engines coordinate only through [`SwapStore`] (no direct
/// messaging).
pub struct ResolverEngine {
    chain_name: ChainId,
    store: Arc<SwapStore>,
    ledger: Arc<InventoryLedger>,
    registry: Arc<TokenRegistry>,
    adapter: Arc<dyn ChainAdapter>,
    /// Every configured chain's adapter, including this engine's own, keyed
    /// by chain name — lets the source engine independently verify a pool
    /// lock deployed on a different chain before revealing the preimage
    /// (SPEC_FULL §4.4 step 2).
    peer_adapters: Arc<HashMap<ChainId, Arc<dyn ChainAdapter>>>,
    lock_id_gen: LockIdGenerator,
    oracle: Arc<dyn PriceOracle>,
    config: EngineConfig,
    tick_count: AtomicU64,
}

impl ResolverEngine {
    pub fn new(
        chain_name: ChainId,
        store: Arc<SwapStore>,
        ledger: Arc<InventoryLedger>,
        registry: Arc<TokenRegistry>,
        adapter: Arc<dyn ChainAdapter>,
        peer_adapters: Arc<HashMap<ChainId, Arc<dyn ChainAdapter>>>,
        oracle: Arc<dyn PriceOracle>,
        config: EngineConfig,
    ) -> Self {
        Self {
            chain_name,
            store,
            ledger,
            registry,
            adapter,
            peer_adapters,
            lock_id_gen: LockIdGenerator::new(),
            oracle,
            config,
            tick_count: AtomicU64::new(0),
        }
    }

    /// Runs the main loop until `shutdown` fires. A stop signal drains the
    /// current batch before exiting (SPEC_FULL §4.4).
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.processing_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(chain = %self.chain_name, error = %e, "resolver tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(chain = %self.chain_name, "shutdown signal received, exiting after current batch");
                        return;
                    }
                }
            }
        }
    }

    pub async fn tick(&self) -> Result<(), swap_core::SwapError> {
        let tick_number = self.tick_count.fetch_add(1, Ordering::SeqCst);
        let _span = tracing::debug_span!("resolver_tick", chain = %self.chain_name, tick_number).entered();

        let target_swaps = self
            .store
            .get_pending_swaps_for_role(&self.chain_name, ResolverRole::Target, self.config.max_batch_size)?;
        for swap in target_swaps {
            if let Err(e) = self.run_target_action(swap.id).await {
                warn!(chain = %self.chain_name, swap_id = %swap.id, error = %e, "target-chain action failed");
            }
        }

        let source_swaps = self
            .store
            .get_pending_swaps_for_role(&self.chain_name, ResolverRole::Source, self.config.max_batch_size)?;
        for swap in source_swaps {
            if let Err(e) = self.run_source_action(swap.id).await {
                warn!(chain = %self.chain_name, swap_id = %swap.id, error = %e, "source-chain action failed");
            }
        }

        if tick_number % self.config.refund_sweep_tick_multiple == 0 {
            if let Err(e) = self.run_refund_sweep().await {
                warn!(chain = %self.chain_name, error = %e, "refund sweep failed");
            }
        }

        Ok(())
    }

    /// Target-chain actions: liquidity check, pricing, reservation, pool
    /// lock deployment (SPEC_FULL §4.4).
    async fn run_target_action(&self, swap_id: swap_core::SwapId) -> Result<(), swap_core::SwapError> {
        let swap = self
            .store
            .get_swap(swap_id)?
            .ok_or_else(|| swap_core::SwapError::SwapNotFound(swap_id.to_string()))?;
        if swap.status.is_terminal() {
            return Ok(());
        }
        if swap.status == SwapStatus::UserClaimed {
            return self.watch_pool_claim(swap_id, &swap).await;
        }
        if swap.status != SwapStatus::UserHtlcFunded {
            return Ok(());
        }

        // Idempotency: a pool lock may already exist from a prior attempt.
        if let Some(pool_lock_id) = swap.pool_lock_id {
            let record = self.adapter.get_lock(pool_lock_id).await.map_err(map_chain_error)?;
            if record.state == LockState::Open {
                self.finalize_pool_fulfilled(swap_id, pool_lock_id).await?;
                return Ok(());
            }
        }

        self.registry.validate_pair(
            &swap.source_chain,
            &swap.source_token,
            &swap.target_chain,
            &swap.target_token,
        )?;

        let op = self.start_operation(swap_id, OperationType::DeployPool).await?;

        let inventory = self.ledger.get(&swap.target_chain, &swap.target_token)?;
        let available = inventory.map(|i| i.available()).unwrap_or(0);
        if available < swap.expected_amount {
            self.fail_operation(swap_id, op.id, "insufficient pool liquidity").await?;
            return Err(swap_core::SwapError::InsufficientLiquidity {
                need: swap.expected_amount,
                available,
            });
        }

        crate::price::validate_pricing(
            self.oracle.as_ref(),
            &swap.source_token,
            &swap.target_token,
            swap.source_amount,
            swap.expected_amount,
            swap.slippage_tolerance,
        )
        .await?;

        self.ledger
            .reserve(&swap.target_chain, &swap.target_token, swap.expected_amount)?;

        let pool_lock_id = self.lock_id_gen.next_lock_id(
            self.adapter.operator_address(),
            &swap.beneficiary,
            &swap.hash_lock,
            swap.expiration_time,
            &swap.target_token,
            swap.expected_amount,
        );

        let tx = match self
            .adapter
            .lock(
                pool_lock_id,
                &swap.target_token,
                &swap.beneficiary,
                swap.hash_lock,
                swap.expiration_time,
                swap.expected_amount,
            )
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                self.ledger
                    .release(&swap.target_chain, &swap.target_token, swap.expected_amount, swap_id, "target_reserve")?;
                self.fail_operation(swap_id, op.id, &e.to_string()).await?;
                return Err(map_chain_error(e));
            }
        };

        self.adapter.wait_for_confirmation(&tx, self.config.confirmation_depth).await.map_err(map_chain_error)?;

        let record = self.adapter.get_lock(pool_lock_id).await.map_err(map_chain_error)?;
        if record.state != LockState::Open
            || !within_amount_tolerance(swap.expected_amount, record.value)
            || record.hash_lock.0 != swap.hash_lock.0
        {
            self.ledger
                .release(&swap.target_chain, &swap.target_token, swap.expected_amount, swap_id, "target_reserve")?;
            self.fail_operation(swap_id, op.id, "post-lock verification mismatch").await?;
            self.mark_error(swap_id, "pool lock verification mismatch").await?;
            return Err(swap_core::SwapError::AmountMismatch {
                expected: swap.expected_amount,
                observed: record.value,
            });
        }

        self.store.finalize_operation(
            swap_id,
            op.id,
            OperationStatus::Completed,
            None,
            Some(tx.0.clone()),
            now_unix(),
        )?;

        self.finalize_pool_fulfilled(swap_id, pool_lock_id).await
    }

    async fn finalize_pool_fulfilled(
        &self,
        swap_id: swap_core::SwapId,
        pool_lock_id: swap_core::LockId,
    ) -> Result<(), swap_core::SwapError> {
        let now = now_unix();
        let patch = SwapPatch {
            status: Some(SwapStatus::PoolFulfilled),
            pool_lock_id: Some(pool_lock_id),
            ..Default::default()
        };
        self.store.update_swap_and_append_event(
            swap_id,
            patch,
            SwapEventType::PoolFulfilled,
            EventData::default(),
            now,
        )?;
        info!(chain = %self.chain_name, swap_id = %swap_id, "pool lock deployed, swap POOL_FULFILLED");
        Ok(())
    }

    /// Watches a USER_CLAIMED swap's pool lock for the user's own claim on
    /// the target chain, the symmetric step that follows the source engine
    /// revealing the preimage (SPEC_FULL §4.4 step 3). Transitions to
    /// POOL_CLAIMED once observed; a no-op tick otherwise.
    async fn watch_pool_claim(
        &self,
        swap_id: swap_core::SwapId,
        swap: &swap_core::Swap,
    ) -> Result<(), swap_core::SwapError> {
        let Some(pool_lock_id) = swap.pool_lock_id else {
            return Ok(());
        };
        let record = self.adapter.get_lock(pool_lock_id).await.map_err(map_chain_error)?;
        if record.state != LockState::Claimed {
            return Ok(());
        }

        self.ledger
            .release(&swap.target_chain, &swap.target_token, swap.expected_amount, swap_id, "target_reserve")?;

        let op = self.start_operation(swap_id, OperationType::Finalize).await?;
        self.store
            .finalize_operation(swap_id, op.id, OperationStatus::Completed, None, None, now_unix())?;

        let patch = SwapPatch {
            status: Some(SwapStatus::PoolClaimed),
            ..Default::default()
        };
        self.store.update_swap_and_append_event(
            swap_id,
            patch,
            SwapEventType::PoolClaimed,
            EventData::default(),
            now_unix(),
        )?;
        info!(chain = %self.chain_name, swap_id = %swap_id, "pool lock claimed by user, swap POOL_CLAIMED");
        Ok(())
    }

    /// Source-chain actions: validate user lock, cross-chain safety check,
    /// claim (SPEC_FULL §4.4).
    async fn run_source_action(&self, swap_id: swap_core::SwapId) -> Result<(), swap_core::SwapError> {
        let swap = self
            .store
            .get_swap(swap_id)?
            .ok_or_else(|| swap_core::SwapError::SwapNotFound(swap_id.to_string()))?;
        if swap.status.is_terminal() {
            return Ok(());
        }

        let op = self.start_operation(swap_id, OperationType::ValidateUser).await?;

        let Some(user_lock_id) = swap.user_lock_id else {
            // No user lock observed yet — nothing to validate this tick.
            self.store.finalize_operation(
                swap_id,
                op.id,
                OperationStatus::Completed,
                None,
                None,
                now_unix(),
            )?;
            return Ok(());
        };

        let record = self.adapter.get_lock(user_lock_id).await.map_err(map_chain_error)?;
        if record.state != LockState::Open
            || record.hash_lock.0 != swap.hash_lock.0
            || !within_amount_tolerance(swap.source_amount, record.value)
        {
            self.fail_operation(swap_id, op.id, "user lock failed validation").await?;
            return Ok(()); // retry next tick; may not be funded yet
        }

        if swap.status == SwapStatus::Pending {
            let patch = SwapPatch {
                status: Some(SwapStatus::UserHtlcFunded),
                matched_at: Some(now_unix()),
                ..Default::default()
            };
            self.store.update_swap_and_append_event(
                swap_id,
                patch,
                SwapEventType::UserHtlcFunded,
                EventData::default(),
                now_unix(),
            )?;
        }

        self.store.finalize_operation(swap_id, op.id, OperationStatus::Completed, None, None, now_unix())?;

        if swap.status != SwapStatus::PoolFulfilled {
            // Cross-chain safety check awaits the target engine's POOL_FULFILLED.
            return Ok(());
        }

        let claim_op = self.start_operation(swap_id, OperationType::ClaimUser).await?;

        if swap.source_chain != swap.target_chain {
            let Some(pool_lock_id) = swap.pool_lock_id else {
                return Ok(()); // target engine hasn't written it yet
            };
            let Some(target_adapter) = self.peer_adapters.get(&swap.target_chain) else {
                self.fail_operation(
                    swap_id,
                    claim_op.id,
                    &format!("no configured adapter for target chain {}", swap.target_chain),
                )
                .await?;
                return Err(swap_core::SwapError::Other(format!(
                    "no configured adapter for target chain {}",
                    swap.target_chain
                )));
            };
            let pool_record = target_adapter.get_lock(pool_lock_id).await.map_err(map_chain_error)?;
            if pool_record.state != LockState::Open
                || pool_record.hash_lock.0 != swap.hash_lock.0
                || pool_record.beneficiary != swap.beneficiary
                || !within_amount_tolerance(swap.expected_amount, pool_record.value)
            {
                self.fail_operation(swap_id, claim_op.id, "target-chain pool lock failed cross-chain verification")
                    .await?;
                return Ok(()); // retry next tick; target engine may still be finalizing
            }
        }

        let tx = match self.adapter.claim(user_lock_id, &swap.preimage).await {
            Ok(tx) => tx,
            Err(e) => {
                self.fail_operation(swap_id, claim_op.id, &e.to_string()).await?;
                return Err(map_chain_error(e));
            }
        };
        self.adapter.wait_for_confirmation(&tx, self.config.confirmation_depth).await.map_err(map_chain_error)?;

        self.store.finalize_operation(
            swap_id,
            claim_op.id,
            OperationStatus::Completed,
            None,
            Some(tx.0.clone()),
            now_unix(),
        )?;

        let patch = SwapPatch {
            status: Some(SwapStatus::UserClaimed),
            pool_claimed_at: Some(now_unix()),
            ..Default::default()
        };
        self.store.update_swap_and_append_event(
            swap_id,
            patch,
            SwapEventType::UserClaimed,
            EventData::with_tx(tx.0),
            now_unix(),
        )?;
        info!(chain = %self.chain_name, swap_id = %swap_id, "user lock claimed, swap USER_CLAIMED");
        Ok(())
    }

    /// Refund sweep over EXPIRED swaps whose chain holds an operator-owned
    /// OPEN leg (SPEC_FULL §4.4.1). Only the target engine's pool lock is
    /// operator-controlled; the user's own lock is the user's to refund.
    async fn run_refund_sweep(&self) -> Result<(), swap_core::SwapError> {
        let expired = self.store.get_expired_swaps_for_chain(&self.chain_name, self.config.max_batch_size)?;
        for swap in expired {
            if swap.target_chain != self.chain_name {
                continue;
            }
            let Some(pool_lock_id) = swap.pool_lock_id else {
                continue;
            };
            let record = self.adapter.get_lock(pool_lock_id).await.map_err(map_chain_error)?;
            if record.state != LockState::Open {
                continue; // already refunded or claimed on-chain
            }
            let op = self.start_operation(swap.id, OperationType::Finalize).await?;
            match self.adapter.refund(pool_lock_id).await {
                Ok(tx) => {
                    self.ledger.release(
                        &swap.target_chain,
                        &swap.target_token,
                        swap.expected_amount,
                        swap.id,
                        "target_reserve",
                    )?;
                    self.store.finalize_operation(
                        swap.id,
                        op.id,
                        OperationStatus::Completed,
                        None,
                        Some(tx.0.clone()),
                        now_unix(),
                    )?;
                    let patch = SwapPatch {
                        status: Some(SwapStatus::Refunded),
                        ..Default::default()
                    };
                    self.store.update_swap_and_append_event(
                        swap.id,
                        patch,
                        SwapEventType::Refunded,
                        EventData::with_tx(tx.0),
                        now_unix(),
                    )?;
                    info!(chain = %self.chain_name, swap_id = %swap.id, "pool lock refunded, swap REFUNDED");
                }
                Err(e) => {
                    self.fail_operation(swap.id, op.id, &e.to_string()).await?;
                }
            }
        }
        Ok(())
    }

    async fn start_operation(
        &self,
        swap_id: swap_core::SwapId,
        op_type: OperationType,
    ) -> Result<ResolverOperation, swap_core::SwapError> {
        self.store.append_operation(ResolverOperation::start(swap_id, op_type, now_unix()))
    }

    async fn fail_operation(
        &self,
        swap_id: swap_core::SwapId,
        op_id: u64,
        message: &str,
    ) -> Result<(), swap_core::SwapError> {
        self.store.finalize_operation(
            swap_id,
            op_id,
            OperationStatus::Failed,
            Some(message.to_string()),
            None,
            now_unix(),
        )
    }

    async fn mark_error(&self, swap_id: swap_core::SwapId, message: &str) -> Result<(), swap_core::SwapError> {
        let patch = SwapPatch {
            status: Some(SwapStatus::Error),
            ..Default::default()
        };
        self.store.update_swap_and_append_event(
            swap_id,
            patch,
            SwapEventType::Error,
            EventData::with_error("ADAPTER_VERIFICATION_FAILED", message),
            now_unix(),
        )?;
        error!(chain = %self.chain_name, swap_id = %swap_id, message, "swap moved to ERROR");
        Ok(())
    }
}
