use sha2::{Digest, Sha256};

use crate::types::{HashLock, Preimage};

/// `hashLock = SHA-256(preimage)`, per SPEC_FULL §3 and the resolved Open
/// Question in §9 (SHA-256 over keccak256, matching on-chain verification).
pub fn hashlock_of(preimage: &Preimage) -> HashLock {
    let mut hasher = Sha256::new();
    hasher.update(preimage.0);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    HashLock(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashlock_is_deterministic() {
        let p = Preimage([7u8; 32]);
        assert_eq!(hashlock_of(&p).0, hashlock_of(&p).0);
    }

    #[test]
    fn hashlock_differs_for_different_preimages() {
        let a = Preimage([1u8; 32]);
        let b = Preimage([2u8; 32]);
        assert_ne!(hashlock_of(&a).0, hashlock_of(&b).0);
    }
}
