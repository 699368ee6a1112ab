use std::sync::atomic::{AtomicU64, Ordering};

use sha3::{Digest, Keccak256};

use swap_core::{Address, Amount, HashLock, LockId, Timestamp, TokenSymbol};

/// Generates lock ids per SPEC_FULL §4.1:
/// `lockId = keccak256(encode(originator, beneficiary, hashLock, timelock,
/// token, value, nonce))`, where `nonce` is a counter unique for this
/// process's lifetime. One generator is shared by a chain adapter across all
/// `lock()` calls it issues.
pub struct LockIdGenerator {
    nonce: AtomicU64,
}

impl LockIdGenerator {
    pub fn new() -> Self {
        Self {
            nonce: AtomicU64::new(0),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn next_lock_id(
        &self,
        originator: &Address,
        beneficiary: &Address,
        hash_lock: &HashLock,
        timelock: Timestamp,
        token: &TokenSymbol,
        value: Amount,
    ) -> LockId {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Keccak256::new();
        hasher.update(originator.0.as_bytes());
        hasher.update(beneficiary.0.as_bytes());
        hasher.update(hash_lock.0);
        hasher.update(timelock.to_be_bytes());
        hasher.update(token.0.as_bytes());
        hasher.update(value.to_be_bytes());
        hasher.update(nonce.to_be_bytes());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        LockId(out)
    }
}

impl Default for LockIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_ids_differ_even_for_identical_inputs() {
        let gen = LockIdGenerator::new();
        let originator = Address("0xaaaa".into());
        let beneficiary = Address("0xbbbb".into());
        let hash_lock = HashLock([1u8; 32]);
        let token = TokenSymbol("USDC".into());

        let a = gen.next_lock_id(&originator, &beneficiary, &hash_lock, 1_000, &token, 500);
        let b = gen.next_lock_id(&originator, &beneficiary, &hash_lock, 1_000, &token, 500);
        assert_ne!(a.0, b.0);
    }
}
