use k256::ecdsa::signature::Signer as _;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use swap_core::Address;

/// The operator's per-chain signing key. One instance guards one chain's
/// signer (§5: "one engine per chain owns the signer") — never shared across
/// two concurrent submitters.
///
/// The secret scalar is held in a `Zeroizing<[u8; 32]>` and wiped on drop,
/// matching the key-hygiene discipline the rest of the stack uses for
/// long-lived secrets.
#[derive(Serialize, Deserialize)]
pub struct OperatorKeyPair {
    pub address: Address,
    public_key: Vec<u8>,
    secret_key: [u8; 32],
}

impl OperatorKeyPair {
    /// Generate a fresh secp256k1 keypair for a new chain deployment.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self::from_signing_key(signing_key)
    }

    /// Restore an operator keypair from a raw 32-byte secret (e.g. loaded
    /// from a config-referenced key file).
    pub fn from_raw(secret_bytes: [u8; 32]) -> Result<Self, k256::ecdsa::Error> {
        let signing_key = SigningKey::from_bytes((&secret_bytes).into())?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let public_key = verifying_key.to_encoded_point(false).as_bytes().to_vec();
        let address = address_from_public_key(&public_key);
        let mut secret_key = [0u8; 32];
        secret_key.copy_from_slice(&signing_key.to_bytes());
        Self {
            address,
            public_key,
            secret_key,
        }
    }

    /// Sign a transaction digest with this key. `message` is whatever the
    /// adapter has already reduced a transaction to (e.g. its RLP/typed-data
    /// hash) — this type performs no chain-specific encoding itself.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let signing_key = Zeroizing::new(
            SigningKey::from_bytes((&self.secret_key).into())
                .expect("stored secret key bytes are always a valid scalar"),
        );
        signing_key.sign(message)
    }

    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key
    }
}

impl Drop for OperatorKeyPair {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.secret_key.zeroize();
    }
}

impl std::fmt::Debug for OperatorKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OperatorKeyPair {{ address: {:?} }}", self.address)
    }
}

/// Derive a chain address from an uncompressed secp256k1 public key the way
/// account-based EVM-style chains do: keccak256 of the 64-byte point
/// (skipping the leading 0x04 tag), last 20 bytes, hex-encoded with a 0x
/// prefix.
fn address_from_public_key(uncompressed_pubkey: &[u8]) -> Address {
    let body = &uncompressed_pubkey[1..]; // drop the 0x04 prefix
    let mut hasher = Keccak256::new();
    hasher.update(body);
    let digest = hasher.finalize();
    Address(format!("0x{}", hex::encode(&digest[12..])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_address_is_deterministic_from_key() {
        let kp = OperatorKeyPair::generate();
        let addr1 = kp.address.clone();
        let restored = OperatorKeyPair::from_raw(
            SigningKey::from_bytes((&kp.secret_key).into())
                .unwrap()
                .to_bytes()
                .into(),
        )
        .unwrap();
        assert_eq!(addr1, restored.address);
    }

    #[test]
    fn address_is_0x_prefixed_40_hex_chars() {
        let kp = OperatorKeyPair::generate();
        assert!(kp.address.0.starts_with("0x"));
        assert_eq!(kp.address.0.len(), 42);
    }
}
