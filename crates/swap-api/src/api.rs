use jsonrpsee::core::{RpcResult, SubscriptionResult};
use jsonrpsee::proc_macros::rpc;

use crate::types::{RpcCreateSwapRequest, RpcSwap, RpcSwapEvent, RpcSwapFilter};

/// Orchestrator JSON-RPC 2.0 API definition.
///
/// All method names are prefixed with "swap_" via `namespace = "swap"`.
#[rpc(server, namespace = "swap")]
pub trait SwapApi {
    /// Validate and persist a new swap, minting its id/preimage/hashLock.
    /// Not idempotent by payload — two identical requests yield two distinct
    /// swap ids.
    #[method(name = "create")]
    async fn swap_create(&self, draft: RpcCreateSwapRequest) -> RpcResult<RpcSwap>;

    /// Fetch a single swap by id.
    #[method(name = "get")]
    async fn swap_get(&self, id: String) -> RpcResult<Option<RpcSwap>>;

    /// List swaps matching `filter`, newest-last, paginated by `(limit, offset)`.
    /// `limit` is capped at `MAX_SWAPS_PER_QUERY`.
    #[method(name = "list")]
    async fn swap_list(
        &self,
        filter: RpcSwapFilter,
        limit: u32,
        offset: u32,
    ) -> RpcResult<Vec<RpcSwap>>;

    /// Cancel a swap. Only valid while PENDING; the caller must supply the
    /// originating user's address.
    #[method(name = "cancel")]
    async fn swap_cancel(&self, id: String, user_address: String) -> RpcResult<RpcSwap>;

    /// Full event history for a swap, oldest-first.
    #[method(name = "getEvents")]
    async fn swap_get_events(&self, id: String) -> RpcResult<Vec<RpcSwapEvent>>;

    /// Long-lived subscription streaming every event committed for `id` from
    /// the moment of subscription onward. Past events are not replayed —
    /// callers that need history call `swap_getEvents` first.
    #[subscription(name = "subscribeEvents", item = RpcSwapEvent)]
    async fn swap_subscribe_events(&self, id: String) -> SubscriptionResult;
}
