pub mod adapter;
pub mod dialect;
pub mod error;
pub mod http_adapter;
pub mod retry;
pub mod rpc;

pub use adapter::{ChainAdapter, LockRecord, LockState, TxHandle};
pub use error::ChainAdapterError;
pub use http_adapter::{ChainConfig, HttpChainAdapter};
