pub mod constants;
pub mod error;
pub mod event;
pub mod hash;
pub mod inventory;
pub mod operation;
pub mod swap;
pub mod types;

pub use constants::*;
pub use error::SwapError;
pub use event::{EventData, SwapEvent, SwapEventType};
pub use hash::hashlock_of;
pub use inventory::PoolInventory;
pub use operation::{OperationStatus, OperationType, ResolverOperation};
pub use swap::{within_amount_tolerance, Swap, SwapDraft, SwapPatch, SwapStatus};
pub use types::*;
