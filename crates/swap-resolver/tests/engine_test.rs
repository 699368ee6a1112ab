use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use swap_chain::{ChainAdapter, ChainAdapterError, LockRecord, LockState, TxHandle};
use swap_core::{
    Address, Amount, ChainId, HashLock, LockId, Preimage, SwapDraft, SwapStatus, Timestamp, TokenSymbol,
    MIN_TIMELOCK_SECS,
};
use swap_crypto::LockIdGenerator;
use swap_registry::TokenRegistry;
use swap_resolver::{EngineConfig, FixedRatioOracle, ResolverEngine};
use swap_store::{InventoryLedger, SwapStore};

/// An in-memory fake chain. Each call mutates a single lock slot by id so
/// the test can drive the adapter exactly the way an on-chain HTLC would
/// respond to `lock`/`claim`/`get_lock`.
struct MockAdapter {
    chain_name: String,
    operator: Address,
    locks: Mutex<std::collections::HashMap<LockId, LockRecord>>,
}

impl MockAdapter {
    fn new(chain_name: &str, operator: Address) -> Self {
        Self {
            chain_name: chain_name.to_string(),
            operator,
            locks: Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[async_trait]
impl ChainAdapter for MockAdapter {
    async fn lock(
        &self,
        lock_id: LockId,
        token: &TokenSymbol,
        beneficiary: &Address,
        hash_lock: HashLock,
        timelock: Timestamp,
        value: Amount,
    ) -> Result<TxHandle, ChainAdapterError> {
        let record = LockRecord {
            token: token.clone(),
            beneficiary: beneficiary.clone(),
            originator: self.operator.clone(),
            hash_lock,
            timelock,
            value,
            state: LockState::Open,
        };
        self.locks.lock().unwrap().insert(lock_id, record);
        Ok(TxHandle(format!("0xlock{}", lock_id.to_hex())))
    }

    async fn claim(&self, lock_id: LockId, preimage: &Preimage) -> Result<TxHandle, ChainAdapterError> {
        let mut locks = self.locks.lock().unwrap();
        let record = locks.get_mut(&lock_id).ok_or(ChainAdapterError::NotClaimable("no such lock".into()))?;
        if record.state != LockState::Open {
            return Err(ChainAdapterError::NotClaimable("lock not open".into()));
        }
        let expected = swap_core::hashlock_of(preimage);
        if expected.0 != record.hash_lock.0 {
            return Err(ChainAdapterError::WrongPreimage);
        }
        record.state = LockState::Claimed;
        Ok(TxHandle(format!("0xclaim{}", lock_id.to_hex())))
    }

    async fn refund(&self, lock_id: LockId) -> Result<TxHandle, ChainAdapterError> {
        let mut locks = self.locks.lock().unwrap();
        let record = locks.get_mut(&lock_id).ok_or(ChainAdapterError::NotClaimable("no such lock".into()))?;
        record.state = LockState::Refunded;
        Ok(TxHandle(format!("0xrefund{}", lock_id.to_hex())))
    }

    async fn get_lock(&self, lock_id: LockId) -> Result<LockRecord, ChainAdapterError> {
        Ok(self
            .locks
            .lock()
            .unwrap()
            .get(&lock_id)
            .cloned()
            .unwrap_or(LockRecord {
                token: TokenSymbol(String::new()),
                beneficiary: Address(String::new()),
                originator: Address(String::new()),
                hash_lock: HashLock([0u8; 32]),
                timelock: 0,
                value: 0,
                state: LockState::Invalid,
            }))
    }

    async fn current_chain_time(&self) -> Result<Timestamp, ChainAdapterError> {
        Ok(0)
    }

    async fn wait_for_confirmation(&self, _tx: &TxHandle, _depth: u64) -> Result<(), ChainAdapterError> {
        Ok(())
    }

    async fn get_balance(&self, _token: &TokenSymbol) -> Result<Amount, ChainAdapterError> {
        Ok(1_000_000)
    }

    fn chain_name(&self) -> &str {
        &self.chain_name
    }

    fn operator_address(&self) -> &Address {
        &self.operator
    }
}

fn registry_json() -> &'static str {
    r#"{
        "tokens": [
            {"chain": "ethereum", "symbol": "USDC", "onchain_address": "0xaaaa", "decimals": 6},
            {"chain": "polygon", "symbol": "USDC", "onchain_address": "0xbbbb", "decimals": 6}
        ],
        "allowed_pairs": [
            {"source_chain": "ethereum", "source_token": "USDC", "target_chain": "polygon", "target_token": "USDC"}
        ]
    }"#
}

fn now() -> Timestamp {
    1_700_000_000
}

struct Harness {
    store: Arc<SwapStore>,
    ledger: Arc<InventoryLedger>,
    target_engine: ResolverEngine,
    source_engine: ResolverEngine,
    eth: Arc<MockAdapter>,
    poly: Arc<MockAdapter>,
}

fn build_harness() -> Harness {
    let store = Arc::new(SwapStore::open_temporary().unwrap());
    let ledger = Arc::new(store.open_ledger().unwrap());
    let registry = Arc::new(TokenRegistry::from_json_str(registry_json()).unwrap());
    ledger
        .refresh_total(&ChainId("polygon".into()), &TokenSymbol("USDC".into()), 1_000_000)
        .unwrap();

    let eth = Arc::new(MockAdapter::new("ethereum", Address("0xresolver_eth".into())));
    let poly = Arc::new(MockAdapter::new("polygon", Address("0xresolver_poly".into())));
    let oracle = Arc::new(FixedRatioOracle::new(1.0));

    let mut peer_adapters: std::collections::HashMap<ChainId, Arc<dyn ChainAdapter>> =
        std::collections::HashMap::new();
    peer_adapters.insert(ChainId("polygon".into()), poly.clone() as Arc<dyn ChainAdapter>);
    peer_adapters.insert(ChainId("ethereum".into()), eth.clone() as Arc<dyn ChainAdapter>);
    let peer_adapters = Arc::new(peer_adapters);

    let target_engine = ResolverEngine::new(
        ChainId("polygon".into()),
        store.clone(),
        ledger.clone(),
        registry.clone(),
        poly.clone() as Arc<dyn ChainAdapter>,
        peer_adapters.clone(),
        oracle.clone(),
        EngineConfig::default(),
    );
    let source_engine = ResolverEngine::new(
        ChainId("ethereum".into()),
        store.clone(),
        ledger.clone(),
        registry,
        eth.clone() as Arc<dyn ChainAdapter>,
        peer_adapters,
        oracle,
        EngineConfig::default(),
    );

    Harness {
        store,
        ledger,
        target_engine,
        source_engine,
        eth,
        poly,
    }
}

#[tokio::test]
async fn full_swap_reaches_pool_claimed_with_consistent_reservations() {
    let h = build_harness();

    let preimage = Preimage([9u8; 32]);
    let hash_lock = swap_core::hashlock_of(&preimage);
    let draft = SwapDraft {
        user_address: Address("0xuser".into()),
        beneficiary: Address("0xuser".into()),
        source_chain: ChainId("ethereum".into()),
        source_token: TokenSymbol("USDC".into()),
        source_amount: 1_000,
        target_chain: ChainId("polygon".into()),
        target_token: TokenSymbol("USDC".into()),
        expected_amount: 1_000,
        slippage_tolerance: 0.05,
        expiration_time: now() + MIN_TIMELOCK_SECS + 3_600,
    };
    let swap = h.store.create_swap(draft, preimage.clone(), now()).unwrap();

    // hashLock == SHA-256(preimage) holds immediately after creation.
    assert_eq!(swap.hash_lock.0, hash_lock.0);

    // Target tick: deploys the pool lock, reserves inventory, swap -> POOL_FULFILLED.
    h.target_engine.tick().await.unwrap();
    let swap = h.store.get_swap(swap.id).unwrap().unwrap();
    assert_eq!(swap.status, SwapStatus::PoolFulfilled);
    assert!(swap.pool_lock_id.is_some());

    let inv = h
        .ledger
        .get(&ChainId("polygon".into()), &TokenSymbol("USDC".into()))
        .unwrap()
        .unwrap();
    assert_eq!(inv.reserved, 1_000);

    // Simulate the user having funded their own source-chain HTLC — reported
    // out of band by whatever watches chain events (not this engine's job).
    let gen = LockIdGenerator::new();
    let user_lock_id = gen.next_lock_id(
        &swap.user_address,
        h.eth.operator_address(),
        &swap.hash_lock,
        swap.expiration_time,
        &swap.source_token,
        swap.source_amount,
    );
    h.eth
        .lock(
            user_lock_id,
            &swap.source_token,
            h.eth.operator_address(),
            swap.hash_lock,
            swap.expiration_time,
            swap.source_amount,
        )
        .await
        .unwrap();
    h.store
        .update_swap(
            swap.id,
            swap_core::SwapPatch {
                user_lock_id: Some(user_lock_id),
                ..Default::default()
            },
            now(),
        )
        .unwrap();

    // Source tick: validates the user lock, claims it with the preimage,
    // revealing it publicly on the source chain. Swap -> USER_CLAIMED.
    h.source_engine.tick().await.unwrap();
    let swap = h.store.get_swap(swap.id).unwrap().unwrap();
    assert_eq!(swap.status, SwapStatus::UserClaimed);
    let user_record = h.eth.get_lock(user_lock_id).await.unwrap();
    assert_eq!(user_record.state, LockState::Claimed);

    // The user now claims the pool's lock on the target chain themselves,
    // using the preimage the source-chain claim just revealed.
    h.poly.claim(swap.pool_lock_id.unwrap(), &preimage).await.unwrap();

    // Target tick observes the claim and finalizes. Both legs CLAIMED;
    // reservation released back to zero.
    h.target_engine.tick().await.unwrap();
    let swap = h.store.get_swap(swap.id).unwrap().unwrap();
    assert_eq!(swap.status, SwapStatus::PoolClaimed);
    assert!(swap.status.is_terminal());

    let pool_record = h.poly.get_lock(swap.pool_lock_id.unwrap()).await.unwrap();
    assert_eq!(pool_record.state, LockState::Claimed);
    assert_eq!(user_record.state, LockState::Claimed);

    let inv = h
        .ledger
        .get(&ChainId("polygon".into()), &TokenSymbol("USDC".into()))
        .unwrap()
        .unwrap();
    assert_eq!(inv.reserved, 0);
}

#[tokio::test]
async fn wrong_preimage_user_lock_is_rejected_before_any_action() {
    let h = build_harness();

    let preimage = Preimage([1u8; 32]);
    let draft = SwapDraft {
        user_address: Address("0xuser".into()),
        beneficiary: Address("0xuser".into()),
        source_chain: ChainId("ethereum".into()),
        source_token: TokenSymbol("USDC".into()),
        source_amount: 1_000,
        target_chain: ChainId("polygon".into()),
        target_token: TokenSymbol("USDC".into()),
        expected_amount: 1_000,
        slippage_tolerance: 0.05,
        expiration_time: now() + MIN_TIMELOCK_SECS + 3_600,
    };
    let swap = h.store.create_swap(draft, preimage, now()).unwrap();

    // A user lock funded under a different hash lock than the swap's own.
    let tampered_hash = HashLock([0xEFu8; 32]);
    let gen = LockIdGenerator::new();
    let user_lock_id = gen.next_lock_id(
        &swap.user_address,
        h.eth.operator_address(),
        &tampered_hash,
        swap.expiration_time,
        &swap.source_token,
        swap.source_amount,
    );
    h.eth
        .lock(
            user_lock_id,
            &swap.source_token,
            h.eth.operator_address(),
            tampered_hash,
            swap.expiration_time,
            swap.source_amount,
        )
        .await
        .unwrap();
    h.store
        .update_swap(
            swap.id,
            swap_core::SwapPatch {
                user_lock_id: Some(user_lock_id),
                ..Default::default()
            },
            now(),
        )
        .unwrap();

    h.source_engine.tick().await.unwrap();

    // Validation failed — no pool-side reservation or action was taken, and
    // the swap stays PENDING (not advanced, not errored by this check alone).
    let swap = h.store.get_swap(swap.id).unwrap().unwrap();
    assert_eq!(swap.status, SwapStatus::Pending);
    let inv = h
        .ledger
        .get(&ChainId("polygon".into()), &TokenSymbol("USDC".into()))
        .unwrap()
        .unwrap();
    assert_eq!(inv.reserved, 0);
}

#[tokio::test]
async fn insufficient_liquidity_blocks_pool_lock_deployment() {
    let h = build_harness();
    // Drain the pool to below what the swap will need.
    h.ledger
        .refresh_total(&ChainId("polygon".into()), &TokenSymbol("USDC".into()), 10)
        .unwrap();

    let preimage = Preimage([3u8; 32]);
    let draft = SwapDraft {
        user_address: Address("0xuser".into()),
        beneficiary: Address("0xuser".into()),
        source_chain: ChainId("ethereum".into()),
        source_token: TokenSymbol("USDC".into()),
        source_amount: 1_000,
        target_chain: ChainId("polygon".into()),
        target_token: TokenSymbol("USDC".into()),
        expected_amount: 1_000,
        slippage_tolerance: 0.05,
        expiration_time: now() + MIN_TIMELOCK_SECS + 3_600,
    };
    let swap = h.store.create_swap(draft, preimage, now()).unwrap();

    let err = h.target_engine.tick().await;
    assert!(err.is_ok()); // tick() swallows per-swap errors and logs them

    let swap = h.store.get_swap(swap.id).unwrap().unwrap();
    assert_eq!(swap.status, SwapStatus::Pending);
    assert!(swap.pool_lock_id.is_none());
}
