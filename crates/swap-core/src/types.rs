use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Token amount in the token's smallest unit (e.g. wei for 18-decimal ERC-20s).
/// u128 comfortably covers any realistic on-chain supply.
pub type Amount = u128;

/// Unix timestamp (seconds, UTC). Chain time and wall time are both expressed
/// in this type but are never assumed interchangeable — see swap-chain.
pub type Timestamp = i64;

// ── SwapId ───────────────────────────────────────────────────────────────────

/// Opaque, server-minted swap identifier. Never derived from client input —
/// two identical create-swap payloads yield two distinct ids (see I-PROPS §8).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SwapId(pub Uuid);

impl SwapId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for SwapId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SwapId({})", &self.0.to_string()[..8])
    }
}

impl std::str::FromStr for SwapId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ── LockId ───────────────────────────────────────────────────────────────────

/// 32-byte opaque on-chain lock identifier, adapter-generated (see §4.1 id
/// generation — keccak256 over originator/beneficiary/hashLock/timelock/token/
/// value/nonce).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId(pub [u8; 32]);

impl LockId {
    pub fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes[..32]);
        Ok(Self(arr))
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockId({}…)", &self.to_hex()[..16])
    }
}

// ── HashLock / Preimage ──────────────────────────────────────────────────────

/// SHA-256 digest of a [`Preimage`]. Public — travels with the swap record
/// and is mirrored on both HTLC legs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashLock(pub [u8; 32]);

impl HashLock {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes[..32]);
        Ok(Self(arr))
    }
}

impl fmt::Display for HashLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for HashLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashLock({}…)", &self.to_hex()[..16])
    }
}

/// 32 random bytes known only to the resolver until the source-chain claim
/// reveals them on-chain. Never serialized into client-facing API responses —
/// see swap-api's RpcSwap, which omits this field entirely.
#[derive(Clone, Serialize, Deserialize)]
pub struct Preimage(pub [u8; 32]);

impl Preimage {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Preimage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Preimage(<redacted>)")
    }
}

// ── ChainId / TokenSymbol / Address ──────────────────────────────────────────

/// Logical chain name as configured (e.g. "ethereum", "polygon"). Not a
/// numeric chain id — the numeric id lives in per-chain adapter config.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug)]
pub struct ChainId(pub String);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Token symbol as known to the token registry (e.g. "USDC"). Resolved to an
/// on-chain address and decimal exponent via swap-registry.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Debug)]
pub struct TokenSymbol(pub String);

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Chain-native address encoding, opaque to swap-core. Validity and checksum
/// rules are the adapter's concern, not the store's.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub struct Address(pub String);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
