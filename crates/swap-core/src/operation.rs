use serde::{Deserialize, Serialize};

use crate::types::{SwapId, Timestamp};

/// Which resolver step an operation record describes. Kept separate from
/// [`crate::swap::SwapStatus`] so the swap's status enum stays a lean closed
/// sum type while diagnostics and retry bookkeeping accumulate here instead.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationType {
    Detect,
    ValidateUser,
    Match,
    DeployPool,
    ClaimUser,
    Finalize,
    Error,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Completed,
    Failed,
}

/// One record per resolver attempt at a step, used for diagnostics and for
/// exactly-once retry reasoning (§3, §5): before repeating a write, the
/// engine checks whether a prior attempt already produced the desired
/// on-chain post-condition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolverOperation {
    pub id: u64,
    pub swap_id: SwapId,
    pub op_type: OperationType,
    pub status: OperationStatus,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub error_message: Option<String>,
    pub tx_hash: Option<String>,
}

impl ResolverOperation {
    pub fn start(swap_id: SwapId, op_type: OperationType, now: Timestamp) -> Self {
        Self {
            id: 0,
            swap_id,
            op_type,
            status: OperationStatus::InProgress,
            started_at: now,
            completed_at: None,
            error_message: None,
            tx_hash: None,
        }
    }
}
