//! ─── Resolver Protocol Constants ────────────────────────────────────────────

// ── Timelock safety ──────────────────────────────────────────────────────────

/// Minimum time (seconds) between swap creation and `expirationTime`.
pub const MIN_TIMELOCK_SECS: i64 = 3_600;

/// Recommended safety margin (seconds) by which the target-chain timelock
/// should exceed the source-chain timelock, on top of the hard invariant
/// that target >= source.
pub const TIMELOCK_SAFETY_MARGIN_SECS: i64 = 600;

// ── Token conventions ─────────────────────────────────────────────────────────

/// Sentinel token symbol denoting a chain's native asset (e.g. ETH on
/// Ethereum). A lock against this symbol carries its value directly on the
/// transaction rather than through an ERC20-style allowance.
pub const NATIVE_TOKEN_SYMBOL: &str = "NATIVE";

// ── Amount tolerance ─────────────────────────────────────────────────────────

/// Maximum fractional deviation allowed between a swap's recorded amount and
/// the value actually observed on an HTLC lock, expressed in basis points.
/// 10 bps = 0.1%.
pub const AMOUNT_TOLERANCE_BPS: u64 = 10;
pub const BPS_DENOMINATOR: u64 = 10_000;

// ── Resolver engine tuning (defaults, overridable per chain via config) ──────

/// Default poll period between resolver ticks.
pub const DEFAULT_PROCESSING_INTERVAL_MS: u64 = 5_000;

/// Default number of swaps processed per engine tick.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;

/// Default number of transient-failure retries before a swap is marked ERROR.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Refund sweep runs this many ticks apart relative to the main processing
/// interval (see swap-resolver's expiry sweep).
pub const REFUND_SWEEP_TICK_MULTIPLE: u64 = 10;

// ── Pricing guard ─────────────────────────────────────────────────────────────

/// Hard outer band (fraction) outside of which a quoted price is rejected
/// regardless of the swap's own `slippageTolerance`.
pub const MAX_PRICE_DEVIATION: f64 = 0.20;

// ── Pagination ────────────────────────────────────────────────────────────────

/// Maximum swaps returned from a single `listSwaps` call.
pub const MAX_SWAPS_PER_QUERY: usize = 200;

/// Default retry backoff base (milliseconds) for transient chain/RPC errors.
pub const RETRY_BACKOFF_BASE_MS: u64 = 250;

/// Retry backoff cap (milliseconds).
pub const RETRY_BACKOFF_MAX_MS: u64 = 30_000;
