use std::net::SocketAddr;
use std::sync::Arc;

use futures::StreamExt;
use jsonrpsee::core::{async_trait, RpcResult, SubscriptionResult};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::ErrorObject;
use jsonrpsee::PendingSubscriptionSink;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use swap_core::{Address, MAX_SWAPS_PER_QUERY, SwapId, SwapError};
use swap_store::{SwapFilter, SwapStore};

use crate::api::SwapApiServer;
use crate::types::{parse_status, RpcCreateSwapRequest, RpcSwap, RpcSwapEvent, RpcSwapFilter};

fn rpc_err(code: i32, msg: impl Into<String>) -> ErrorObject<'static> {
    ErrorObject::owned(code, msg.into(), None::<()>)
}

/// Maps a [`SwapError`] to a JSON-RPC error code. Validation/not-found errors
/// are client faults (`-32602`); everything else is an internal fault
/// (`-32603`) — the same two-bucket scheme the project's existing RPC layer
/// uses.
fn swap_err_to_rpc(e: SwapError) -> ErrorObject<'static> {
    match e {
        SwapError::SwapNotFound(_)
        | SwapError::SameChain
        | SwapError::UnsupportedPair { .. }
        | SwapError::InvalidSlippage(_)
        | SwapError::ExpirationTooClose { .. }
        | SwapError::ZeroAmount
        | SwapError::MalformedField(_)
        | SwapError::CancelNotByOriginator
        | SwapError::CancelNotPending
        | SwapError::InvalidTransition { .. } => rpc_err(-32602, e.to_string()),
        other => rpc_err(-32603, other.to_string()),
    }
}

fn now_unix() -> swap_core::Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs() as i64
}

/// Shared state passed to the RPC server.
pub struct RpcServerState {
    pub store: Arc<SwapStore>,
}

/// The RPC server implementation.
pub struct RpcServer {
    state: Arc<RpcServerState>,
}

impl RpcServer {
    pub fn new(state: Arc<RpcServerState>) -> Self {
        Self { state }
    }

    /// Start the JSON-RPC server on `addr` with permissive CORS headers. Returns a handle to stop it.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any);

        let server = Server::builder()
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "orchestrator RPC server started");
        Ok(handle)
    }
}

fn parse_swap_id(s: &str) -> RpcResult<SwapId> {
    s.parse()
        .map_err(|_| rpc_err(-32602, format!("invalid swap id: {s}")).into())
}

#[async_trait]
impl SwapApiServer for RpcServer {
    async fn swap_create(&self, draft: RpcCreateSwapRequest) -> RpcResult<RpcSwap> {
        let draft = draft
            .into_draft()
            .map_err(|e| rpc_err(-32602, e))?;
        let preimage = swap_crypto_fresh_preimage();
        let swap = self
            .state
            .store
            .create_swap(draft, preimage, now_unix())
            .map_err(swap_err_to_rpc)?;
        Ok(RpcSwap::from(&swap))
    }

    async fn swap_get(&self, id: String) -> RpcResult<Option<RpcSwap>> {
        let id = parse_swap_id(&id)?;
        let swap = self.state.store.get_swap(id).map_err(swap_err_to_rpc)?;
        Ok(swap.as_ref().map(RpcSwap::from))
    }

    async fn swap_list(
        &self,
        filter: RpcSwapFilter,
        limit: u32,
        offset: u32,
    ) -> RpcResult<Vec<RpcSwap>> {
        let limit = (limit as usize).min(MAX_SWAPS_PER_QUERY);
        let filter = SwapFilter {
            user_address: filter.user_address.map(Address),
            status: filter.status.as_deref().and_then(parse_status),
        };
        let swaps = self
            .state
            .store
            .list_swaps(filter, limit, offset as usize)
            .map_err(swap_err_to_rpc)?;
        Ok(swaps.iter().map(RpcSwap::from).collect())
    }

    async fn swap_cancel(&self, id: String, user_address: String) -> RpcResult<RpcSwap> {
        let id = parse_swap_id(&id)?;
        let (swap, _event) = self
            .state
            .store
            .cancel_swap(id, &Address(user_address), now_unix())
            .map_err(swap_err_to_rpc)?;
        Ok(RpcSwap::from(&swap))
    }

    async fn swap_get_events(&self, id: String) -> RpcResult<Vec<RpcSwapEvent>> {
        let id = parse_swap_id(&id)?;
        let events = self.state.store.list_events(id).map_err(swap_err_to_rpc)?;
        Ok(events.iter().map(RpcSwapEvent::from).collect())
    }

    async fn swap_subscribe_events(
        &self,
        pending: PendingSubscriptionSink,
        id: String,
    ) -> SubscriptionResult {
        let swap_id = match parse_swap_id(&id) {
            Ok(id) => id,
            Err(e) => {
                pending.reject(e).await;
                return Ok(());
            }
        };

        let sink = pending.accept().await?;
        let rx = self.state.store.subscribe_events();
        let mut stream = BroadcastStream::new(rx);

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                let event = match item {
                    Ok(e) => e,
                    // A slow subscriber fell behind the ring buffer; the durable
                    // log is untouched, so just keep tailing from here on.
                    Err(_) => continue,
                };
                if event.swap_id != swap_id {
                    continue;
                }
                let rpc_event = RpcSwapEvent::from(&event);
                let Ok(msg) = jsonrpsee::SubscriptionMessage::from_json(&rpc_event) else {
                    continue;
                };
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
        });

        Ok(())
    }
}

/// The API layer never sees a swap's preimage before creation — it's minted
/// fresh per swap the same way the resolver mints lock ids, just with a
/// cryptographic RNG instead of a deterministic derivation.
fn swap_crypto_fresh_preimage() -> swap_core::Preimage {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    swap_core::Preimage(bytes)
}
