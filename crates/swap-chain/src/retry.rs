use std::time::Duration;

use swap_core::{RETRY_BACKOFF_BASE_MS, RETRY_BACKOFF_MAX_MS};

use crate::error::ChainAdapterError;

/// Transient RPC errors (connection reset, timeout, 5xx) are retried;
/// `REVERTED` or any other on-chain rejection never is — it reflects a
/// caller invariant violation and must surface (SPEC_FULL §4.1).
pub fn is_retryable_network_error(err: &ChainAdapterError) -> bool {
    err.is_transient()
}

/// Exponential backoff with a hard cap, doubling per attempt starting at
/// `RETRY_BACKOFF_BASE_MS`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let ms = RETRY_BACKOFF_BASE_MS.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(ms.min(RETRY_BACKOFF_MAX_MS))
}
