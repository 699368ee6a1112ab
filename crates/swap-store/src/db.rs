use std::path::Path;

use sled::Transactional;
use swap_core::{
    Address, ChainId, EventData, OperationStatus, ResolverOperation, Swap,
    SwapDraft, SwapError, SwapEvent, SwapEventType, SwapId, SwapPatch, SwapStatus, Timestamp,
};

/// Persistent swap state, backed by sled (pure-Rust, no C dependencies).
///
/// Named trees:
///   swaps                — SwapId bytes (16)            → bincode(Swap)
///   swap_events          — SwapId(16) ++ event_id(u64 BE) → bincode(SwapEvent)
///   resolver_operations  — SwapId(16) ++ op_id(u64 BE)   → bincode(ResolverOperation)
///   meta                 — utf8 key                      → raw bytes (counters)
pub struct SwapStore {
    _db: sled::Db,
    swaps: sled::Tree,
    swap_events: sled::Tree,
    resolver_operations: sled::Tree,
    meta: sled::Tree,
    events_tx: tokio::sync::broadcast::Sender<SwapEvent>,
}

/// Ring buffer size for the live event fan-out. A subscriber slower than this
/// many events behind misses the gap and should re-fetch via
/// [`SwapStore::list_events`]; the durable log in `swap_events` is unaffected.
const EVENT_BUS_CAPACITY: usize = 1024;

fn from_sled_db(db: sled::Db) -> Result<SwapStore, SwapError> {
    let swaps = db.open_tree("swaps").map_err(storage_err)?;
    let swap_events = db.open_tree("swap_events").map_err(storage_err)?;
    let resolver_operations = db.open_tree("resolver_operations").map_err(storage_err)?;
    let meta = db.open_tree("meta").map_err(storage_err)?;
    let (events_tx, _) = tokio::sync::broadcast::channel(EVENT_BUS_CAPACITY);
    Ok(SwapStore {
        _db: db,
        swaps,
        swap_events,
        resolver_operations,
        meta,
        events_tx,
    })
}

fn storage_err<E: std::fmt::Display>(e: E) -> SwapError {
    SwapError::Storage(e.to_string())
}

fn serde_err<E: std::fmt::Display>(e: E) -> SwapError {
    SwapError::Serialization(e.to_string())
}

impl SwapStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SwapError> {
        let db = sled::open(path).map_err(storage_err)?;
        from_sled_db(db)
    }

    /// In-memory, non-durable store used by tests.
    pub fn open_temporary() -> Result<Self, SwapError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(storage_err)?;
        from_sled_db(db)
    }

    // ── Swaps ─────────────────────────────────────────────────────────────────

    /// Validates `draft`, mints an id/preimage/hashLock, and commits the swap
    /// row together with its `INITIATED` event in a single transaction.
    pub fn create_swap(
        &self,
        draft: SwapDraft,
        preimage: swap_core::Preimage,
        now: Timestamp,
    ) -> Result<Swap, SwapError> {
        let hash_lock = swap_core::hashlock_of(&preimage);
        let swap = Swap {
            id: SwapId::new(),
            user_address: draft.user_address,
            beneficiary: draft.beneficiary,
            source_chain: draft.source_chain,
            source_token: draft.source_token,
            source_amount: draft.source_amount,
            target_chain: draft.target_chain,
            target_token: draft.target_token,
            expected_amount: draft.expected_amount,
            slippage_tolerance: draft.slippage_tolerance,
            preimage,
            hash_lock,
            expiration_time: draft.expiration_time,
            user_lock_id: None,
            pool_lock_id: None,
            status: SwapStatus::Pending,
            created_at: now,
            updated_at: now,
            matched_at: None,
            pool_claimed_at: None,
        };
        swap.validate_invariants(now)?;

        let event = SwapEvent {
            id: 0,
            swap_id: swap.id,
            event_type: SwapEventType::Initiated,
            data: EventData::default(),
            timestamp: now,
        };

        self.commit_swap_and_event(&swap, event)?;
        Ok(swap)
    }

    pub fn get_swap(&self, id: SwapId) -> Result<Option<Swap>, SwapError> {
        match self.swaps.get(id.as_bytes()).map_err(storage_err)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(serde_err)?)),
            None => Ok(None),
        }
    }

    fn put_swap_bytes(tree: &sled::Tree, swap: &Swap) -> Result<(), sled::transaction::ConflictableTransactionError<sled::Error>> {
        let bytes = bincode::serialize(swap).expect("Swap serialization is infallible");
        tree.insert(swap.id.as_bytes(), bytes)?;
        Ok(())
    }

    /// List swaps matching `filter`, newest-last, with `(limit, offset)`
    /// pagination. Intended for the API surface's `listSwaps` — not the
    /// hot path the resolver uses (see [`Self::get_pending_swaps_for_role`]).
    pub fn list_swaps(
        &self,
        filter: SwapFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Swap>, SwapError> {
        let mut all = Vec::new();
        for item in self.swaps.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            let swap: Swap = bincode::deserialize(&bytes).map_err(serde_err)?;
            if filter.matches(&swap) {
                all.push(swap);
            }
        }
        all.sort_by_key(|s| s.created_at);
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    /// Swaps for which `chain` has outstanding work in `role`, FIFO by
    /// `created_at`. See SPEC_FULL §4.4 for the exact precondition per role.
    pub fn get_pending_swaps_for_role(
        &self,
        chain: &ChainId,
        role: ResolverRole,
        limit: usize,
    ) -> Result<Vec<Swap>, SwapError> {
        let mut matches = Vec::new();
        for item in self.swaps.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            let swap: Swap = bincode::deserialize(&bytes).map_err(serde_err)?;
            let role_matches = match role {
                ResolverRole::Target => {
                    swap.target_chain == *chain
                        && matches!(
                            swap.status,
                            SwapStatus::UserHtlcFunded | SwapStatus::UserClaimed
                        )
                }
                ResolverRole::Source => {
                    swap.source_chain == *chain
                        && matches!(
                            swap.status,
                            SwapStatus::Pending | SwapStatus::UserHtlcFunded | SwapStatus::PoolFulfilled
                        )
                }
            };
            if role_matches {
                matches.push(swap);
            }
        }
        matches.sort_by_key(|s| s.created_at);
        matches.truncate(limit);
        Ok(matches)
    }

    /// Swaps in EXPIRED for `chain`, used by the refund sweep.
    pub fn get_expired_swaps_for_chain(
        &self,
        chain: &ChainId,
        limit: usize,
    ) -> Result<Vec<Swap>, SwapError> {
        let mut matches = Vec::new();
        for item in self.swaps.iter() {
            let (_, bytes) = item.map_err(storage_err)?;
            let swap: Swap = bincode::deserialize(&bytes).map_err(serde_err)?;
            if swap.status == SwapStatus::Expired
                && (swap.source_chain == *chain || swap.target_chain == *chain)
            {
                matches.push(swap);
            }
        }
        matches.sort_by_key(|s| s.created_at);
        matches.truncate(limit);
        Ok(matches)
    }

    /// Applies `patch` to the swap, enforcing the monotonic transition graph
    /// when `patch.status` is set. Does not append an event — use
    /// [`Self::update_swap_and_append_event`] when the caller has one.
    pub fn update_swap(&self, id: SwapId, patch: SwapPatch, now: Timestamp) -> Result<Swap, SwapError> {
        let mut swap = self
            .get_swap(id)?
            .ok_or_else(|| SwapError::SwapNotFound(id.to_string()))?;
        apply_patch(&mut swap, &patch, now)?;
        Self::put_swap_bytes(&self.swaps, &swap).map_err(|e| storage_err(e.to_string()))?;
        Ok(swap)
    }

    /// Commits a status/field update and its corresponding event atomically —
    /// either both land or neither does (SPEC_FULL §4.2).
    pub fn update_swap_and_append_event(
        &self,
        id: SwapId,
        patch: SwapPatch,
        event_type: SwapEventType,
        data: EventData,
        now: Timestamp,
    ) -> Result<(Swap, SwapEvent), SwapError> {
        let mut swap = self
            .get_swap(id)?
            .ok_or_else(|| SwapError::SwapNotFound(id.to_string()))?;
        apply_patch(&mut swap, &patch, now)?;

        let event_id = self.next_event_id(id)?;
        let event = SwapEvent {
            id: event_id,
            swap_id: id,
            event_type,
            data,
            timestamp: now,
        };

        self.commit_swap_and_event(&swap, event.clone())?;
        Ok((swap, event))
    }

    /// Cancels a swap on the user's behalf. Only the Orchestrator API calls
    /// this; engines never cancel (SPEC_FULL §4.2 ownership rule). Enforces
    /// both edge-case guards from §4.5: PENDING-only, original user only.
    pub fn cancel_swap(
        &self,
        id: SwapId,
        requester: &Address,
        now: Timestamp,
    ) -> Result<(Swap, SwapEvent), SwapError> {
        let swap = self
            .get_swap(id)?
            .ok_or_else(|| SwapError::SwapNotFound(id.to_string()))?;
        if swap.status != SwapStatus::Pending {
            return Err(SwapError::CancelNotPending);
        }
        if &swap.user_address != requester {
            return Err(SwapError::CancelNotByOriginator);
        }
        let patch = SwapPatch {
            status: Some(SwapStatus::Cancelled),
            ..Default::default()
        };
        self.update_swap_and_append_event(id, patch, SwapEventType::Cancelled, EventData::default(), now)
    }

    fn commit_swap_and_event(&self, swap: &Swap, event: SwapEvent) -> Result<(), SwapError> {
        let event_bytes = bincode::serialize(&event).map_err(serde_err)?;
        let event_key = event_key(swap.id, event.id);

        (&self.swaps, &self.swap_events)
            .transaction(|(swaps, events)| {
                Self::put_swap_bytes(swaps, swap)?;
                events.insert(event_key.as_slice(), event_bytes.as_slice())?;
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError<sled::Error>| storage_err(e.to_string()))?;
        // No subscribers is the common case (no API server attached, e.g. in
        // unit tests) and is not an error.
        let _ = self.events_tx.send(event);
        Ok(())
    }

    /// Live tail of every committed [`SwapEvent`] across all swaps, newest
    /// going forward only — past events are read via [`Self::list_events`].
    /// The API layer's `swap_subscribeEvents` filters this by swap id.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<SwapEvent> {
        self.events_tx.subscribe()
    }

    fn next_event_id(&self, swap_id: SwapId) -> Result<u64, SwapError> {
        let key = format!("evt_ctr:{}", swap_id);
        let current = self
            .meta
            .get(key.as_bytes())
            .map_err(storage_err)?
            .map(|b| u64::from_be_bytes(b.as_ref().try_into().unwrap_or_default()))
            .unwrap_or(0);
        self.meta
            .insert(key.as_bytes(), &(current + 1).to_be_bytes())
            .map_err(storage_err)?;
        Ok(current)
    }

    pub fn list_events(&self, swap_id: SwapId) -> Result<Vec<SwapEvent>, SwapError> {
        let prefix = swap_id.as_bytes().to_vec();
        let mut out = Vec::new();
        for item in self.swap_events.scan_prefix(prefix) {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(serde_err)?);
        }
        out.sort_by_key(|e: &SwapEvent| e.id);
        Ok(out)
    }

    // ── Resolver operations ──────────────────────────────────────────────────

    pub fn append_operation(&self, mut op: ResolverOperation) -> Result<ResolverOperation, SwapError> {
        let op_id = self.next_operation_id(op.swap_id)?;
        op.id = op_id;
        let key = event_key(op.swap_id, op_id);
        let bytes = bincode::serialize(&op).map_err(serde_err)?;
        self.resolver_operations
            .insert(key, bytes)
            .map_err(storage_err)?;
        Ok(op)
    }

    pub fn finalize_operation(
        &self,
        swap_id: SwapId,
        op_id: u64,
        status: OperationStatus,
        error_message: Option<String>,
        tx_hash: Option<String>,
        now: Timestamp,
    ) -> Result<(), SwapError> {
        let key = event_key(swap_id, op_id);
        let mut op: ResolverOperation = match self.resolver_operations.get(&key).map_err(storage_err)? {
            Some(bytes) => bincode::deserialize(&bytes).map_err(serde_err)?,
            None => return Err(SwapError::Other(format!("unknown operation {op_id} for swap {swap_id}"))),
        };
        op.status = status;
        op.completed_at = Some(now);
        op.error_message = error_message;
        op.tx_hash = tx_hash;
        let bytes = bincode::serialize(&op).map_err(serde_err)?;
        self.resolver_operations
            .insert(key, bytes)
            .map_err(storage_err)?;
        Ok(())
    }

    pub fn list_operations(&self, swap_id: SwapId) -> Result<Vec<ResolverOperation>, SwapError> {
        let prefix = swap_id.as_bytes().to_vec();
        let mut out = Vec::new();
        for item in self.resolver_operations.scan_prefix(prefix) {
            let (_, bytes) = item.map_err(storage_err)?;
            out.push(bincode::deserialize(&bytes).map_err(serde_err)?);
        }
        out.sort_by_key(|o: &ResolverOperation| o.id);
        Ok(out)
    }

    fn next_operation_id(&self, swap_id: SwapId) -> Result<u64, SwapError> {
        let key = format!("op_ctr:{}", swap_id);
        let current = self
            .meta
            .get(key.as_bytes())
            .map_err(storage_err)?
            .map(|b| u64::from_be_bytes(b.as_ref().try_into().unwrap_or_default()))
            .unwrap_or(0);
        self.meta
            .insert(key.as_bytes(), &(current + 1).to_be_bytes())
            .map_err(storage_err)?;
        Ok(current)
    }

    pub fn flush(&self) -> Result<(), SwapError> {
        self._db.flush().map_err(storage_err)?;
        Ok(())
    }

    /// Opens the inventory ledger sharing this store's underlying `sled::Db`.
    pub fn open_ledger(&self) -> Result<crate::ledger::InventoryLedger, SwapError> {
        crate::ledger::InventoryLedger::open(&self._db)
    }
}

fn apply_patch(swap: &mut Swap, patch: &SwapPatch, now: Timestamp) -> Result<(), SwapError> {
    if let Some(next) = patch.status {
        if !swap.status.can_transition_to(next) {
            return Err(SwapError::InvalidTransition {
                from: format!("{:?}", swap.status),
                to: format!("{:?}", next),
            });
        }
        swap.status = next;
    }
    if let Some(lock_id) = patch.user_lock_id {
        swap.user_lock_id = Some(lock_id);
    }
    if let Some(lock_id) = patch.pool_lock_id {
        swap.pool_lock_id = Some(lock_id);
    }
    if let Some(t) = patch.matched_at {
        swap.matched_at = Some(t);
    }
    if let Some(t) = patch.pool_claimed_at {
        swap.pool_claimed_at = Some(t);
    }
    swap.updated_at = now;
    Ok(())
}

fn event_key(swap_id: SwapId, seq: u64) -> Vec<u8> {
    let mut key = swap_id.as_bytes().to_vec();
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ResolverRole {
    Source,
    Target,
}

/// Filter accepted by [`SwapStore::list_swaps`]. Every field is an
/// AND-conjunction; `None` means "no constraint on this field".
#[derive(Clone, Debug, Default)]
pub struct SwapFilter {
    pub user_address: Option<Address>,
    pub status: Option<SwapStatus>,
}

impl SwapFilter {
    fn matches(&self, swap: &Swap) -> bool {
        if let Some(addr) = &self.user_address {
            if &swap.user_address != addr {
                return false;
            }
        }
        if let Some(status) = self.status {
            if swap.status != status {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_core::{ChainId, Preimage, SwapDraft, TokenSymbol};

    fn temp_store() -> SwapStore {
        SwapStore::open_temporary().unwrap()
    }

    fn draft(now: Timestamp) -> SwapDraft {
        SwapDraft {
            user_address: Address("0xuser".into()),
            beneficiary: Address("0xuser".into()),
            source_chain: ChainId("ethereum".into()),
            source_token: TokenSymbol("MON".into()),
            source_amount: 1_000_000,
            target_chain: ChainId("polygon".into()),
            target_token: TokenSymbol("OMI".into()),
            expected_amount: 1_000_000,
            slippage_tolerance: 0.01,
            expiration_time: now + 7_200,
        }
    }

    #[test]
    fn create_swap_writes_initiated_event() {
        let store = temp_store();
        let now = 1_000_000;
        let swap = store
            .create_swap(draft(now), Preimage([9u8; 32]), now)
            .unwrap();
        let events = store.list_events(swap.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, SwapEventType::Initiated);
    }

    #[test]
    fn duplicate_create_swap_yields_distinct_ids() {
        let store = temp_store();
        let now = 1_000_000;
        let a = store.create_swap(draft(now), Preimage([1u8; 32]), now).unwrap();
        let b = store.create_swap(draft(now), Preimage([2u8; 32]), now).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn invalid_transition_rejected() {
        let store = temp_store();
        let now = 1_000_000;
        let swap = store.create_swap(draft(now), Preimage([3u8; 32]), now).unwrap();
        let patch = SwapPatch {
            status: Some(SwapStatus::PoolFulfilled),
            ..Default::default()
        };
        let err = store.update_swap(swap.id, patch, now).unwrap_err();
        assert!(matches!(err, SwapError::InvalidTransition { .. }));
    }

    #[test]
    fn cancel_from_pending_succeeds() {
        let store = temp_store();
        let now = 1_000_000;
        let swap = store.create_swap(draft(now), Preimage([4u8; 32]), now).unwrap();
        let patch = SwapPatch {
            status: Some(SwapStatus::Cancelled),
            ..Default::default()
        };
        let updated = store.update_swap(swap.id, patch, now).unwrap();
        assert_eq!(updated.status, SwapStatus::Cancelled);
    }

    #[test]
    fn cancel_swap_rejects_non_originator() {
        let store = temp_store();
        let now = 1_000_000;
        let swap = store.create_swap(draft(now), Preimage([8u8; 32]), now).unwrap();
        let err = store
            .cancel_swap(swap.id, &Address("0xsomeone_else".into()), now)
            .unwrap_err();
        assert!(matches!(err, SwapError::CancelNotByOriginator));
    }

    #[test]
    fn cancel_swap_rejects_once_past_pending() {
        let store = temp_store();
        let now = 1_000_000;
        let swap = store.create_swap(draft(now), Preimage([9u8; 32]), now).unwrap();
        let patch = SwapPatch {
            status: Some(SwapStatus::UserHtlcFunded),
            matched_at: Some(now),
            ..Default::default()
        };
        store.update_swap(swap.id, patch, now).unwrap();
        let err = store.cancel_swap(swap.id, &swap.user_address, now).unwrap_err();
        assert!(matches!(err, SwapError::CancelNotPending));
    }

    #[test]
    fn cancel_swap_by_originator_succeeds_and_emits_event() {
        let store = temp_store();
        let now = 1_000_000;
        let swap = store.create_swap(draft(now), Preimage([10u8; 32]), now).unwrap();
        let (updated, event) = store.cancel_swap(swap.id, &swap.user_address, now).unwrap();
        assert_eq!(updated.status, SwapStatus::Cancelled);
        assert_eq!(event.event_type, SwapEventType::Cancelled);
    }

    #[test]
    fn expiration_too_close_rejected_at_creation() {
        let store = temp_store();
        let now = 1_000_000;
        let mut d = draft(now);
        d.expiration_time = now + swap_core::MIN_TIMELOCK_SECS - 1;
        let err = store.create_swap(d, Preimage([5u8; 32]), now).unwrap_err();
        assert!(matches!(err, SwapError::ExpirationTooClose { .. }));
    }

    #[test]
    fn zero_amount_rejected() {
        let store = temp_store();
        let now = 1_000_000;
        let mut d = draft(now);
        d.source_amount = 0;
        let err = store.create_swap(d, Preimage([6u8; 32]), now).unwrap_err();
        assert!(matches!(err, SwapError::ZeroAmount));
    }

    #[test]
    fn get_pending_swaps_for_role_filters_by_chain_and_status() {
        let store = temp_store();
        let now = 1_000_000;
        let swap = store.create_swap(draft(now), Preimage([7u8; 32]), now).unwrap();

        let target = ChainId("polygon".into());
        let source = ChainId("ethereum".into());

        let for_target = store
            .get_pending_swaps_for_role(&target, ResolverRole::Target, 10)
            .unwrap();
        assert_eq!(for_target.len(), 0); // target role only acts once UserHtlcFunded

        let for_source = store
            .get_pending_swaps_for_role(&source, ResolverRole::Source, 10)
            .unwrap();
        assert_eq!(for_source.len(), 1); // source role validates the user lock from Pending onward

        // Bump to UserHtlcFunded: now both source (its own action already done)
        // and target engines have outstanding work.
        let patch = SwapPatch {
            status: Some(SwapStatus::UserHtlcFunded),
            matched_at: Some(now),
            ..Default::default()
        };
        store.update_swap(swap.id, patch, now).unwrap();

        let for_target = store
            .get_pending_swaps_for_role(&target, ResolverRole::Target, 10)
            .unwrap();
        assert_eq!(for_target.len(), 1);
    }
}
