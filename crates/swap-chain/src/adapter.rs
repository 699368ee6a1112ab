use async_trait::async_trait;
use swap_core::{Address, Amount, HashLock, LockId, Preimage, Timestamp, TokenSymbol};

use crate::error::ChainAdapterError;

/// On-chain state of an HTLC lock, mirroring the contract's own enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockState {
    Invalid = 0,
    Open = 1,
    Claimed = 2,
    Refunded = 3,
}

/// The record returned by `getLock`. An unknown id reads back as all-zero
/// fields with `state = Invalid` rather than an error (SPEC_FULL §4.1).
#[derive(Clone, Debug)]
pub struct LockRecord {
    pub token: TokenSymbol,
    pub beneficiary: Address,
    pub originator: Address,
    pub hash_lock: HashLock,
    pub timelock: Timestamp,
    pub value: Amount,
    pub state: LockState,
}

/// Handle to a submitted transaction, opaque beyond its hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxHandle(pub String);

impl std::fmt::Display for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Uniform contract over an on-chain HTLC primitive (SPEC_FULL §4.1). One
/// implementation per chain family; the resolver engine is generic over
/// this trait and never assumes a specific chain's wire format.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Submits a transaction that transfers `value` of `token` from the
    /// caller into escrow, tagged with `lock_id`. For non-native tokens the
    /// adapter ensures a sufficient allowance first (idempotent — skipped if
    /// the current allowance already covers `value`).
    async fn lock(
        &self,
        lock_id: LockId,
        token: &TokenSymbol,
        beneficiary: &Address,
        hash_lock: HashLock,
        timelock: Timestamp,
        value: Amount,
    ) -> Result<TxHandle, ChainAdapterError>;

    /// Submits the claim; the contract verifies `SHA-256(preimage) ==
    /// hashLock` and that the lock is OPEN.
    async fn claim(&self, lock_id: LockId, preimage: &Preimage) -> Result<TxHandle, ChainAdapterError>;

    /// After the timelock expires and the lock is still OPEN, returns funds
    /// to the originator.
    async fn refund(&self, lock_id: LockId) -> Result<TxHandle, ChainAdapterError>;

    async fn get_lock(&self, lock_id: LockId) -> Result<LockRecord, ChainAdapterError>;

    /// The chain's own notion of time — the basis for timelock validation;
    /// the resolver's system clock is never authoritative for this.
    async fn current_chain_time(&self) -> Result<Timestamp, ChainAdapterError>;

    /// Blocks until `tx` is included at `depth` confirmations.
    async fn wait_for_confirmation(&self, tx: &TxHandle, depth: u64) -> Result<(), ChainAdapterError>;

    /// Current pool wallet balance of `token`, used to refresh the
    /// inventory ledger's `total` snapshot.
    async fn get_balance(&self, token: &TokenSymbol) -> Result<Amount, ChainAdapterError>;

    fn chain_name(&self) -> &str;

    /// The operator's own address on this chain — the originator of every
    /// pool-side lock the engine deploys.
    fn operator_address(&self) -> &Address;
}
