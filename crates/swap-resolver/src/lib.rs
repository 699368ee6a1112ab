pub mod engine;
pub mod price;

pub use engine::{EngineConfig, ResolverEngine};
pub use price::{FixedRatioOracle, PriceOracle};
