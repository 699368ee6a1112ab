use serde::{Deserialize, Serialize};

use crate::constants::{AMOUNT_TOLERANCE_BPS, BPS_DENOMINATOR, MIN_TIMELOCK_SECS};
use crate::error::SwapError;
use crate::types::{Address, Amount, ChainId, HashLock, LockId, Preimage, SwapId, Timestamp, TokenSymbol};

// ── SwapStatus ───────────────────────────────────────────────────────────────

/// Status of a swap. Deliberately lean — one variant per node of the state
/// graph in §4.5, no embedded per-attempt data. Per-attempt diagnostics live
/// separately in [`crate::operation::ResolverOperation`] so this enum stays a
/// a plain closed sum type at the wire boundary.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SwapStatus {
    Pending,
    UserHtlcFunded,
    PoolFulfilled,
    UserClaimed,
    PoolClaimed,
    Expired,
    Refunded,
    Cancelled,
    Error,
}

impl SwapStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SwapStatus::PoolClaimed
                | SwapStatus::Refunded
                | SwapStatus::Cancelled
                | SwapStatus::Error
        )
    }

    /// Whether `self -> next` is an allowed edge in the §4.5 state graph.
    /// The store consults this before committing any status write.
    pub fn can_transition_to(&self, next: SwapStatus) -> bool {
        use SwapStatus::*;
        match (self, next) {
            (Pending, UserHtlcFunded) => true,
            (Pending, Cancelled) => true,
            (UserHtlcFunded, PoolFulfilled) => true,
            (PoolFulfilled, UserClaimed) => true,
            (UserClaimed, PoolClaimed) => true,
            // Any non-terminal state may fall to Expired or Error.
            (s, Expired) if !s.is_terminal() => true,
            (s, Error) if !s.is_terminal() => true,
            // Expired legs resolve to Refunded once both sides are swept.
            (Expired, Refunded) => true,
            _ => false,
        }
    }
}

// ── Swap ─────────────────────────────────────────────────────────────────────

/// A single cross-chain atomic swap. See SPEC_FULL §3 for the full invariant
/// list; [`Swap::validate_invariants`] enforces the subset checkable without
/// chain I/O.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Swap {
    pub id: SwapId,

    pub user_address: Address,
    pub beneficiary: Address,

    pub source_chain: ChainId,
    pub source_token: TokenSymbol,
    pub source_amount: Amount,

    pub target_chain: ChainId,
    pub target_token: TokenSymbol,
    pub expected_amount: Amount,

    pub slippage_tolerance: f64,

    /// Server-only secret. Never serialized out to the API layer — swap-api's
    /// RpcSwap type has no field for it.
    pub preimage: Preimage,
    pub hash_lock: HashLock,
    pub expiration_time: Timestamp,

    pub user_lock_id: Option<LockId>,
    pub pool_lock_id: Option<LockId>,

    pub status: SwapStatus,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub matched_at: Option<Timestamp>,
    pub pool_claimed_at: Option<Timestamp>,
}

impl Swap {
    /// Checks the invariants from SPEC_FULL §3 that can be validated without
    /// any chain I/O: distinct chains, positive amounts, slippage range,
    /// minimum timelock, and hash-lock consistency with the preimage.
    pub fn validate_invariants(&self, now: Timestamp) -> Result<(), SwapError> {
        if self.source_chain == self.target_chain {
            return Err(SwapError::SameChain);
        }
        if self.source_amount == 0 || self.expected_amount == 0 {
            return Err(SwapError::ZeroAmount);
        }
        if !(0.0..=1.0).contains(&self.slippage_tolerance) {
            return Err(SwapError::InvalidSlippage(self.slippage_tolerance));
        }
        let remaining = self.expiration_time - now;
        if remaining < MIN_TIMELOCK_SECS {
            return Err(SwapError::ExpirationTooClose {
                min_secs: MIN_TIMELOCK_SECS,
                actual_secs: remaining,
            });
        }
        let expected_hash = crate::hashlock_of(&self.preimage);
        if expected_hash.0 != self.hash_lock.0 {
            return Err(SwapError::HashMismatch);
        }
        Ok(())
    }
}

/// Checks whether `observed` is within [`AMOUNT_TOLERANCE_BPS`] of `expected`.
/// Used when reconciling an on-chain lock's value against the swap record
/// (fee-on-transfer tokens can shave a few basis points off the transferred
/// amount).
pub fn within_amount_tolerance(expected: Amount, observed: Amount) -> bool {
    if expected == 0 {
        return observed == 0;
    }
    let diff = expected.abs_diff(observed);
    let tolerance = expected.saturating_mul(AMOUNT_TOLERANCE_BPS as u128) / BPS_DENOMINATOR as u128;
    diff <= tolerance
}

/// Fields required to create a new swap. Everything server-derived (id,
/// preimage, hashLock, status, timestamps) is computed by the store at
/// creation time, not supplied by the caller.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapDraft {
    pub user_address: Address,
    pub beneficiary: Address,
    pub source_chain: ChainId,
    pub source_token: TokenSymbol,
    pub source_amount: Amount,
    pub target_chain: ChainId,
    pub target_token: TokenSymbol,
    pub expected_amount: Amount,
    pub slippage_tolerance: f64,
    pub expiration_time: Timestamp,
}

/// Fields an engine may update on a swap in a single store transaction.
/// `status` is mandatory; the rest are set only when the relevant step
/// produces them.
#[derive(Clone, Debug, Default)]
pub struct SwapPatch {
    pub status: Option<SwapStatus>,
    pub user_lock_id: Option<LockId>,
    pub pool_lock_id: Option<LockId>,
    pub matched_at: Option<Timestamp>,
    pub pool_claimed_at: Option<Timestamp>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_graph_matches_state_machine() {
        assert!(SwapStatus::Pending.can_transition_to(SwapStatus::UserHtlcFunded));
        assert!(SwapStatus::Pending.can_transition_to(SwapStatus::Cancelled));
        assert!(!SwapStatus::Pending.can_transition_to(SwapStatus::PoolFulfilled));
        assert!(SwapStatus::UserHtlcFunded.can_transition_to(SwapStatus::PoolFulfilled));
        assert!(SwapStatus::PoolFulfilled.can_transition_to(SwapStatus::UserClaimed));
        assert!(SwapStatus::UserClaimed.can_transition_to(SwapStatus::PoolClaimed));
        assert!(!SwapStatus::PoolClaimed.can_transition_to(SwapStatus::Refunded));
        assert!(!SwapStatus::Cancelled.can_transition_to(SwapStatus::Pending));
    }

    #[test]
    fn terminal_states_are_exhaustive() {
        assert!(SwapStatus::PoolClaimed.is_terminal());
        assert!(SwapStatus::Refunded.is_terminal());
        assert!(SwapStatus::Cancelled.is_terminal());
        assert!(SwapStatus::Error.is_terminal());
        assert!(!SwapStatus::Pending.is_terminal());
        assert!(!SwapStatus::Expired.is_terminal());
    }

    #[test]
    fn amount_tolerance_accepts_small_deviation_rejects_large() {
        // 0.1% = 10 bps of 1_000_000 is 1000.
        assert!(within_amount_tolerance(1_000_000, 999_500));
        assert!(within_amount_tolerance(1_000_000, 1_000_000));
        assert!(!within_amount_tolerance(1_000_000, 990_000));
    }
}
