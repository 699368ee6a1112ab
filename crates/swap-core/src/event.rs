use serde::{Deserialize, Serialize};

use crate::types::{SwapId, Timestamp};

/// Per-swap lifecycle event, one per status transition plus `INITIATED` at
/// creation. Append-only — the only fan-out medium for subscribers (§9:
/// event emitters are replaced by the store committing `(status, event)`
/// atomically and subscribers tailing this log).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SwapEventType {
    Initiated,
    UserHtlcFunded,
    PoolFulfilled,
    UserClaimed,
    PoolClaimed,
    Expired,
    Refunded,
    Error,
    Cancelled,
}

/// A committed swap event. `data` carries a short machine code plus a
/// human-readable message and, where applicable, an on-chain tx handle —
/// see SPEC_FULL §7 ("user-visible: monotonic status + event with a short
/// machine code and human message").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapEvent {
    pub id: u64,
    pub swap_id: SwapId,
    pub event_type: SwapEventType,
    pub data: EventData,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventData {
    pub code: Option<String>,
    pub message: Option<String>,
    pub tx_hash: Option<String>,
}

impl EventData {
    pub fn with_tx(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(tx_hash.into()),
            ..Default::default()
        }
    }

    pub fn with_error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
            tx_hash: None,
        }
    }
}
