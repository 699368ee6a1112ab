use sled::Transactional;
use swap_core::{Amount, ChainId, PoolInventory, SwapError, SwapId, TokenSymbol};

fn storage_err<E: std::fmt::Display>(e: E) -> SwapError {
    SwapError::Storage(e.to_string())
}

fn serde_err<E: std::fmt::Display>(e: E) -> SwapError {
    SwapError::Serialization(e.to_string())
}

/// Per-(chain, token) pool balances, reserved against in-flight swaps
/// (SPEC_FULL §4.3). `reserve`/`release` are the only mutators; `total` is
/// refreshed separately by whoever observes the on-chain balance — the
/// resolver engine, which already holds a chain adapter — so this crate
/// never depends on swap-chain.
///
/// Named trees:
///   pool_inventory     — "{chain}:{token}" → bincode(PoolInventory)
///   inventory_releases — "{swap_id}:{leg}" → () (idempotency marker)
pub struct InventoryLedger {
    inventory: sled::Tree,
    releases: sled::Tree,
}

fn inventory_key(chain: &ChainId, token: &TokenSymbol) -> Vec<u8> {
    format!("{}:{}", chain.0, token.0).into_bytes()
}

fn release_key(swap_id: SwapId, leg: &str) -> Vec<u8> {
    format!("{}:{}", swap_id, leg).into_bytes()
}

impl InventoryLedger {
    pub fn open(db: &sled::Db) -> Result<Self, SwapError> {
        let inventory = db.open_tree("pool_inventory").map_err(storage_err)?;
        let releases = db.open_tree("inventory_releases").map_err(storage_err)?;
        Ok(Self {
            inventory,
            releases,
        })
    }

    pub fn get(&self, chain: &ChainId, token: &TokenSymbol) -> Result<Option<PoolInventory>, SwapError> {
        let key = inventory_key(chain, token);
        match self.inventory.get(key).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(serde_err)?)),
            None => Ok(None),
        }
    }

    fn read_or_default(
        tree: &sled::transaction::TransactionalTree,
        key: &[u8],
        chain: &ChainId,
        token: &TokenSymbol,
    ) -> Result<PoolInventory, sled::transaction::ConflictableTransactionError<sled::Error>> {
        Ok(match tree.get(key)? {
            Some(bytes) => bincode::deserialize(&bytes).expect("PoolInventory is always valid bincode"),
            None => PoolInventory {
                chain: chain.clone(),
                token: token.clone(),
                total: 0,
                reserved: 0,
                min_threshold: 0,
            },
        })
    }

    /// Reserves `amount` against the pool's available balance
    /// (`total - reserved`). Fails with `InsufficientLiquidity` rather than
    /// allowing `reserved` to exceed `total` (SPEC_FULL §4.3 invariant).
    pub fn reserve(
        &self,
        chain: &ChainId,
        token: &TokenSymbol,
        amount: Amount,
    ) -> Result<(), SwapError> {
        let key = inventory_key(chain, token);
        self.inventory
            .transaction(|tree| {
                let mut inv = Self::read_or_default(tree, &key, chain, token)?;
                if inv.available() < amount {
                    return Err(sled::transaction::ConflictableTransactionError::Abort(
                        SwapError::InsufficientLiquidity {
                            need: amount,
                            available: inv.available(),
                        },
                    ));
                }
                inv.reserved += amount;
                let bytes = bincode::serialize(&inv).expect("PoolInventory serialization is infallible");
                tree.insert(key.as_slice(), bytes)?;
                Ok(())
            })
            .map_err(|e| match e {
                sled::transaction::TransactionError::Abort(swap_err) => swap_err,
                sled::transaction::TransactionError::Storage(storage) => storage_err(storage),
            })
    }

    /// Releases a prior reservation for `(swap_id, leg)`. Idempotent: a
    /// second call with the same `(swap_id, leg)` is a no-op, so the resolver
    /// can safely retry a release after a crash without double-crediting the
    /// pool (SPEC_FULL §4.3, §7).
    pub fn release(
        &self,
        chain: &ChainId,
        token: &TokenSymbol,
        amount: Amount,
        swap_id: SwapId,
        leg: &str,
    ) -> Result<(), SwapError> {
        let inv_key = inventory_key(chain, token);
        let rel_key = release_key(swap_id, leg);

        (&self.inventory, &self.releases)
            .transaction(|(inv_tree, rel_tree)| {
                if rel_tree.get(rel_key.as_slice())?.is_some() {
                    return Ok(()); // already released
                }
                let mut inv = Self::read_or_default(inv_tree, &inv_key, chain, token)?;
                inv.reserved = inv.reserved.saturating_sub(amount);
                let bytes = bincode::serialize(&inv).expect("PoolInventory serialization is infallible");
                inv_tree.insert(inv_key.as_slice(), bytes)?;
                rel_tree.insert(rel_key.as_slice(), &[1u8])?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError<sled::Error>| storage_err(e.to_string()))
    }

    /// Overwrites `total` with a freshly observed on-chain balance. Does not
    /// touch `reserved` — callers must have already accounted for any
    /// in-flight reservations on-chain before observing.
    pub fn refresh_total(
        &self,
        chain: &ChainId,
        token: &TokenSymbol,
        total: Amount,
    ) -> Result<(), SwapError> {
        let key = inventory_key(chain, token);
        self.inventory
            .transaction(|tree| {
                let mut inv = Self::read_or_default(tree, &key, chain, token)?;
                inv.total = total;
                let bytes = bincode::serialize(&inv).expect("PoolInventory serialization is infallible");
                tree.insert(key.as_slice(), bytes)?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError<sled::Error>| storage_err(e.to_string()))
    }

    pub fn set_min_threshold(
        &self,
        chain: &ChainId,
        token: &TokenSymbol,
        min_threshold: Amount,
    ) -> Result<(), SwapError> {
        let key = inventory_key(chain, token);
        self.inventory
            .transaction(|tree| {
                let mut inv = Self::read_or_default(tree, &key, chain, token)?;
                inv.min_threshold = min_threshold;
                let bytes = bincode::serialize(&inv).expect("PoolInventory serialization is infallible");
                tree.insert(key.as_slice(), bytes)?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError<sled::Error>| storage_err(e.to_string()))
    }

    pub fn list(&self) -> Result<Vec<PoolInventory>, SwapError> {
        let mut out = Vec::new();
        for item in self.inventory.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(serde_err)?);
        }
        Ok(out)
    }
}
