use serde::{Deserialize, Serialize};

use crate::types::{Amount, ChainId, TokenSymbol};

/// Pool inventory record for one `(chain, token)` pair. `available` is
/// derived, never stored independently, to keep the single invariant
/// `reserved <= total` mechanically impossible to violate in serialized form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolInventory {
    pub chain: ChainId,
    pub token: TokenSymbol,
    pub total: Amount,
    pub reserved: Amount,
    pub min_threshold: Amount,
}

impl PoolInventory {
    pub fn available(&self) -> Amount {
        self.total.saturating_sub(self.reserved)
    }

    pub fn is_below_threshold(&self) -> bool {
        self.available() < self.min_threshold
    }
}
