use serde::{Deserialize, Serialize};

use swap_core::{Address, ChainId, Swap, SwapDraft, SwapEvent, SwapEventType, SwapStatus, TokenSymbol};

/// JSON-serializable swap record returned by `swap_get`/`swap_list`/`swap_create`.
/// Omits `preimage` entirely — that field never leaves the store (SPEC_FULL §3,
/// "server-only secret").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSwap {
    pub id: String,
    pub user_address: String,
    pub beneficiary: String,
    pub source_chain: String,
    pub source_token: String,
    pub source_amount: String,
    pub target_chain: String,
    pub target_token: String,
    pub expected_amount: String,
    pub slippage_tolerance: f64,
    pub hash_lock: String,
    pub expiration_time: i64,
    pub user_lock_id: Option<String>,
    pub pool_lock_id: Option<String>,
    pub status: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub matched_at: Option<i64>,
    pub pool_claimed_at: Option<i64>,
}

impl From<&Swap> for RpcSwap {
    fn from(s: &Swap) -> Self {
        Self {
            id: s.id.to_string(),
            user_address: s.user_address.0.clone(),
            beneficiary: s.beneficiary.0.clone(),
            source_chain: s.source_chain.0.clone(),
            source_token: s.source_token.0.clone(),
            source_amount: s.source_amount.to_string(),
            target_chain: s.target_chain.0.clone(),
            target_token: s.target_token.0.clone(),
            expected_amount: s.expected_amount.to_string(),
            slippage_tolerance: s.slippage_tolerance,
            hash_lock: s.hash_lock.to_hex(),
            expiration_time: s.expiration_time,
            user_lock_id: s.user_lock_id.map(|l| l.to_hex()),
            pool_lock_id: s.pool_lock_id.map(|l| l.to_hex()),
            status: status_str(s.status).to_string(),
            created_at: s.created_at,
            updated_at: s.updated_at,
            matched_at: s.matched_at,
            pool_claimed_at: s.pool_claimed_at,
        }
    }
}

pub fn status_str(status: SwapStatus) -> &'static str {
    match status {
        SwapStatus::Pending => "PENDING",
        SwapStatus::UserHtlcFunded => "USER_HTLC_FUNDED",
        SwapStatus::PoolFulfilled => "POOL_FULFILLED",
        SwapStatus::UserClaimed => "USER_CLAIMED",
        SwapStatus::PoolClaimed => "POOL_CLAIMED",
        SwapStatus::Expired => "EXPIRED",
        SwapStatus::Refunded => "REFUNDED",
        SwapStatus::Cancelled => "CANCELLED",
        SwapStatus::Error => "ERROR",
    }
}

/// Inverse of [`status_str`], used when a filter's status string arrives over
/// the wire in `swap_list`.
pub fn parse_status(s: &str) -> Option<SwapStatus> {
    Some(match s {
        "PENDING" => SwapStatus::Pending,
        "USER_HTLC_FUNDED" => SwapStatus::UserHtlcFunded,
        "POOL_FULFILLED" => SwapStatus::PoolFulfilled,
        "USER_CLAIMED" => SwapStatus::UserClaimed,
        "POOL_CLAIMED" => SwapStatus::PoolClaimed,
        "EXPIRED" => SwapStatus::Expired,
        "REFUNDED" => SwapStatus::Refunded,
        "CANCELLED" => SwapStatus::Cancelled,
        "ERROR" => SwapStatus::Error,
        _ => return None,
    })
}

fn event_type_str(t: SwapEventType) -> &'static str {
    match t {
        SwapEventType::Initiated => "INITIATED",
        SwapEventType::UserHtlcFunded => "USER_HTLC_FUNDED",
        SwapEventType::PoolFulfilled => "POOL_FULFILLED",
        SwapEventType::UserClaimed => "USER_CLAIMED",
        SwapEventType::PoolClaimed => "POOL_CLAIMED",
        SwapEventType::Expired => "EXPIRED",
        SwapEventType::Refunded => "REFUNDED",
        SwapEventType::Error => "ERROR",
        SwapEventType::Cancelled => "CANCELLED",
    }
}

/// JSON-serializable swap event, delivered both from `swap_getEvents` (history)
/// and `swap_subscribeEvents` (live tail) — see SPEC_FULL §9, event emitter
/// surfaces replaced by the store's append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSwapEvent {
    pub id: u64,
    pub swap_id: String,
    pub event_type: String,
    pub code: Option<String>,
    pub message: Option<String>,
    pub tx_hash: Option<String>,
    pub timestamp: i64,
}

impl From<&SwapEvent> for RpcSwapEvent {
    fn from(e: &SwapEvent) -> Self {
        Self {
            id: e.id,
            swap_id: e.swap_id.to_string(),
            event_type: event_type_str(e.event_type).to_string(),
            code: e.data.code.clone(),
            message: e.data.message.clone(),
            tx_hash: e.data.tx_hash.clone(),
            timestamp: e.timestamp,
        }
    }
}

/// Request body for `swap_create`. Mirrors [`SwapDraft`] at the wire boundary;
/// amounts travel as decimal strings since JSON numbers cannot hold a full
/// u128 without loss.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcCreateSwapRequest {
    pub user_address: String,
    pub beneficiary: String,
    pub source_chain: String,
    pub source_token: String,
    pub source_amount: String,
    pub target_chain: String,
    pub target_token: String,
    pub expected_amount: String,
    pub slippage_tolerance: f64,
    pub expiration_time: i64,
}

impl RpcCreateSwapRequest {
    pub fn into_draft(self) -> Result<SwapDraft, String> {
        Ok(SwapDraft {
            user_address: Address(self.user_address),
            beneficiary: Address(self.beneficiary),
            source_chain: ChainId(self.source_chain),
            source_token: TokenSymbol(self.source_token),
            source_amount: self
                .source_amount
                .parse()
                .map_err(|_| "source_amount is not a valid u128 decimal string".to_string())?,
            target_chain: ChainId(self.target_chain),
            target_token: TokenSymbol(self.target_token),
            expected_amount: self
                .expected_amount
                .parse()
                .map_err(|_| "expected_amount is not a valid u128 decimal string".to_string())?,
            slippage_tolerance: self.slippage_tolerance,
            expiration_time: self.expiration_time,
        })
    }
}

/// Filter object accepted by `swap_list`. Every field is optional; `None`
/// means "no constraint".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcSwapFilter {
    pub user_address: Option<String>,
    pub status: Option<String>,
}
