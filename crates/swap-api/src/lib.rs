//! swap-api
//!
//! JSON-RPC 2.0 server exposing the orchestrator's swap lifecycle.
//!
//! Namespace: "swap"
//! Methods:
//!   swap_create          — submit a new swap draft
//!   swap_get             — fetch a swap by id
//!   swap_list            — paginated/filtered swap listing
//!   swap_cancel          — cancel a PENDING swap (originating user only)
//!   swap_getEvents       — full event history for a swap
//!   swap_subscribeEvents — live event tail for a swap

pub mod api;
pub mod server;
pub mod types;

pub use api::SwapApiServer;
pub use server::{RpcServer, RpcServerState};
pub use types::{RpcCreateSwapRequest, RpcSwap, RpcSwapEvent, RpcSwapFilter};
