pub mod db;
pub mod ledger;

pub use db::{ResolverRole, SwapFilter, SwapStore};
pub use ledger::InventoryLedger;
