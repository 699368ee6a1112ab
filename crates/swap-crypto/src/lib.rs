pub mod lockid;
pub mod signer;

pub use lockid::LockIdGenerator;
pub use signer::OperatorKeyPair;
