use thiserror::Error;

/// Chain adapter failure kinds (SPEC_FULL §4.1, §7.1). Kept separate from
/// `swap_core::SwapError` so adapter implementations don't need a
/// dependency back on the store/validation error taxonomy; the resolver
/// engine maps these onto `SwapError` at its own boundary (see
/// `swap_resolver::engine::map_chain_error`).
#[derive(Debug, Error)]
pub enum ChainAdapterError {
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
}

impl ChainAdapterError {
    /// Transient RPC errors (connection reset, timeout, 5xx) are
    /// retry-worthy; REVERTED or any other on-chain rejection is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainAdapterError::Network(_))
    }
}
