use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwapError {
    // ── Validation (client-visible) ──────────────────────────────────────────
    #[error("source chain and target chain must differ")]
    SameChain,

    #[error("unknown or unsupported token pair: {source_chain}/{source_token} -> {target_chain}/{target_token}")]
    UnsupportedPair {
        source_chain: String,
        source_token: String,
        target_chain: String,
        target_token: String,
    },

    #[error("slippage tolerance must be within [0, 1]: got {0}")]
    InvalidSlippage(f64),

    #[error("expirationTime too close: need at least {min_secs}s from now, got {actual_secs}s")]
    ExpirationTooClose { min_secs: i64, actual_secs: i64 },

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("malformed field: {0}")]
    MalformedField(String),

    // ── State machine ────────────────────────────────────────────────────────
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: String, to: String },

    #[error("swap not found: {0}")]
    SwapNotFound(String),

    #[error("only the originating user may cancel a swap")]
    CancelNotByOriginator,

    #[error("swap can only be cancelled while PENDING")]
    CancelNotPending,

    // ── Inventory ─────────────────────────────────────────────────────────────
    #[error("insufficient pool liquidity: need {need}, available {available}")]
    InsufficientLiquidity { need: u128, available: u128 },

    #[error("inventory ledger invariant violated for {chain}/{token}")]
    LedgerInvariantViolated { chain: String, token: String },

    // ── Pricing ───────────────────────────────────────────────────────────────
    #[error("quoted price outside acceptable band (deviation {deviation:.4})")]
    PriceUnreasonable { deviation: f64 },

    // ── Cross-chain verification ──────────────────────────────────────────────
    #[error("hash lock mismatch between swap record and on-chain lock")]
    HashMismatch,

    #[error("lock amount mismatch beyond tolerance: expected {expected}, observed {observed}")]
    AmountMismatch { expected: u128, observed: u128 },

    #[error("lock beneficiary mismatch: expected {expected}, observed {observed}")]
    BeneficiaryMismatch { expected: String, observed: String },

    #[error("on-chain lock not OPEN (state={0})")]
    LockNotOpen(String),

    // ── Chain adapter ─────────────────────────────────────────────────────────
    #[error("insufficient on-chain balance for lock")]
    InsufficientBalance,

    #[error("allowance approval failed")]
    AllowanceFailed,

    #[error("lock id already used on-chain: {0}")]
    DuplicateLockId(String),

    #[error("invalid adapter call parameters: {0}")]
    InvalidParams(String),

    #[error("network error talking to chain: {0}")]
    Network(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("lock not claimable: {0}")]
    NotClaimable(String),

    #[error("preimage does not match lock's hash lock")]
    WrongPreimage,

    #[error("timed out waiting for transaction confirmation: {0}")]
    ConfirmationTimeout(String),

    #[error("neither known lock-read dialect succeeded against this contract")]
    DialectDetectionFailed,

    // ── Internal storage ──────────────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}

impl SwapError {
    /// Whether this error kind reflects a transient condition that may clear
    /// on its own (retry-worthy), as opposed to one that requires the swap
    /// to move to a terminal state.
    pub fn is_transient(&self) -> bool {
        matches!(self, SwapError::Storage(_) | SwapError::Network(_))
    }
}
