//! Static token and pair registry.
//!
//! Resolves `(chain, symbol)` to an on-chain token address/decimals and
//! enforces the closed set of permitted swap pairs. Pure — no I/O beyond the
//! one-time JSON load at startup.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use swap_core::{ChainId, SwapError, TokenSymbol};

/// One token's entry in the registry: on-chain address plus how to scale
/// human-facing amounts to the token's smallest unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenEntry {
    pub onchain_address: String,
    pub decimals: u8,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct PairKey {
    source_chain: ChainId,
    source_token: TokenSymbol,
    target_chain: ChainId,
    target_token: TokenSymbol,
}

/// On-disk shape of the registry file (see SPEC_FULL §6, "token registry file").
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RegistryFile {
    tokens: Vec<TokenFileEntry>,
    allowed_pairs: Vec<AllowedPairEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TokenFileEntry {
    chain: String,
    symbol: String,
    onchain_address: String,
    decimals: u8,
    #[serde(default)]
    icon: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct AllowedPairEntry {
    source_chain: String,
    source_token: String,
    target_chain: String,
    target_token: String,
}

/// Static `(chain, symbol) -> TokenEntry` map plus the closed set of
/// `(source, target)` pairs the resolver is permitted to act on.
pub struct TokenRegistry {
    tokens: HashMap<(ChainId, TokenSymbol), TokenEntry>,
    allowed_pairs: HashSet<PairKey>,
}

impl TokenRegistry {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SwapError> {
        let raw = std::fs::read_to_string(path).map_err(|e| SwapError::Other(e.to_string()))?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SwapError> {
        let file: RegistryFile = serde_json::from_str(raw)
            .map_err(|e| SwapError::MalformedField(format!("token registry: {e}")))?;

        let mut tokens = HashMap::new();
        for entry in file.tokens {
            let key = (ChainId(entry.chain), TokenSymbol(entry.symbol));
            tokens.insert(
                key,
                TokenEntry {
                    onchain_address: entry.onchain_address,
                    decimals: entry.decimals,
                    icon: entry.icon,
                },
            );
        }

        let mut allowed_pairs = HashSet::new();
        for pair in file.allowed_pairs {
            let key = PairKey {
                source_chain: ChainId(pair.source_chain),
                source_token: TokenSymbol(pair.source_token),
                target_chain: ChainId(pair.target_chain),
                target_token: TokenSymbol(pair.target_token),
            };
            if !tokens.contains_key(&(key.source_chain.clone(), key.source_token.clone())) {
                return Err(SwapError::MalformedField(format!(
                    "allowed pair references unknown token {}:{}",
                    key.source_chain, key.source_token
                )));
            }
            if !tokens.contains_key(&(key.target_chain.clone(), key.target_token.clone())) {
                return Err(SwapError::MalformedField(format!(
                    "allowed pair references unknown token {}:{}",
                    key.target_chain, key.target_token
                )));
            }
            allowed_pairs.insert(key);
        }

        Ok(Self {
            tokens,
            allowed_pairs,
        })
    }

    pub fn resolve(&self, chain: &ChainId, symbol: &TokenSymbol) -> Option<&TokenEntry> {
        self.tokens.get(&(chain.clone(), symbol.clone()))
    }

    pub fn is_pair_allowed(
        &self,
        source_chain: &ChainId,
        source_token: &TokenSymbol,
        target_chain: &ChainId,
        target_token: &TokenSymbol,
    ) -> bool {
        self.allowed_pairs.contains(&PairKey {
            source_chain: source_chain.clone(),
            source_token: source_token.clone(),
            target_chain: target_chain.clone(),
            target_token: target_token.clone(),
        })
    }

    /// Validates a would-be swap's chain/token legs against the registry:
    /// both tokens must be known and the pair must be in the allowed set.
    pub fn validate_pair(
        &self,
        source_chain: &ChainId,
        source_token: &TokenSymbol,
        target_chain: &ChainId,
        target_token: &TokenSymbol,
    ) -> Result<(), SwapError> {
        let unsupported = || SwapError::UnsupportedPair {
            source_chain: source_chain.0.clone(),
            source_token: source_token.0.clone(),
            target_chain: target_chain.0.clone(),
            target_token: target_token.0.clone(),
        };
        if self.resolve(source_chain, source_token).is_none()
            || self.resolve(target_chain, target_token).is_none()
        {
            return Err(unsupported());
        }
        if !self.is_pair_allowed(source_chain, source_token, target_chain, target_token) {
            return Err(unsupported());
        }
        Ok(())
    }
}
