//! Blocks and their digest
//!
//! ```text
//! hash = sha256( frame(salt) || index as u64 BE || frame(previous_hash) || frame(payload json) )
//! frame(x) = len(x) as u64 BE || x
//! ```
//!
//! The payload JSON is canonical because attribute maps are ordered, so any
//! two computations over the same inputs agree.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::diff::AttributeDiff;
use super::errors::{ChainError, ChainResult};
use crate::document::Attributes;

/// Index of the first block of every chain
pub const GENESIS_INDEX: u64 = 0;

/// What a block records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockPayload {
    /// Full initial attribute set
    Genesis { attributes: Attributes },
    /// Changes since the previous block
    Delta(AttributeDiff),
}

/// One link of a revision chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    /// Empty for the genesis block
    pub previous_hash: String,
    pub payload: BlockPayload,
    pub hash: String,
}

impl Block {
    /// First block of a chain
    pub fn genesis(salt: &str, attributes: Attributes) -> ChainResult<Self> {
        Self::sealed(
            salt,
            GENESIS_INDEX,
            String::new(),
            BlockPayload::Genesis { attributes },
        )
    }

    /// Block following `self`, linked to its hash
    pub fn next(&self, salt: &str, diff: AttributeDiff) -> ChainResult<Self> {
        Self::sealed(
            salt,
            self.index + 1,
            self.hash.clone(),
            BlockPayload::Delta(diff),
        )
    }

    fn sealed(
        salt: &str,
        index: u64,
        previous_hash: String,
        payload: BlockPayload,
    ) -> ChainResult<Self> {
        let hash = digest(salt, index, &previous_hash, &payload)?;
        Ok(Self {
            index,
            previous_hash,
            payload,
            hash,
        })
    }

    /// Recompute this block's digest from its contents.
    pub fn compute_hash(&self, salt: &str) -> ChainResult<String> {
        digest(salt, self.index, &self.previous_hash, &self.payload)
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self.payload, BlockPayload::Genesis { .. })
    }
}

/// Block digest, lowercase hex. Pure in its four inputs.
pub fn digest(
    salt: &str,
    index: u64,
    previous_hash: &str,
    payload: &BlockPayload,
) -> ChainResult<String> {
    let payload_bytes =
        serde_json::to_vec(payload).map_err(|e| ChainError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    frame(&mut hasher, salt.as_bytes());
    hasher.update(index.to_be_bytes());
    frame(&mut hasher, previous_hash.as_bytes());
    frame(&mut hasher, &payload_bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

fn frame(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::attributes;

    #[test]
    fn test_digest_is_deterministic() {
        let payload = BlockPayload::Genesis {
            attributes: attributes([("color", "red")]),
        };
        let a = digest("salt", 0, "", &payload).unwrap();
        let b = digest("salt", 0, "", &payload).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_digest_depends_on_every_input() {
        let payload = BlockPayload::Genesis {
            attributes: attributes([("color", "red")]),
        };
        let other_payload = BlockPayload::Genesis {
            attributes: attributes([("color", "blue")]),
        };
        let base = digest("salt", 0, "", &payload).unwrap();

        assert_ne!(base, digest("pepper", 0, "", &payload).unwrap());
        assert_ne!(base, digest("salt", 1, "", &payload).unwrap());
        assert_ne!(base, digest("salt", 0, "abc", &payload).unwrap());
        assert_ne!(base, digest("salt", 0, "", &other_payload).unwrap());
    }

    #[test]
    fn test_framing_prevents_boundary_shift() {
        let payload = BlockPayload::Delta(AttributeDiff::default());
        assert_ne!(
            digest("ab", 0, "c", &payload).unwrap(),
            digest("a", 0, "bc", &payload).unwrap()
        );
    }

    #[test]
    fn test_next_links_to_previous() {
        let genesis = Block::genesis("salt", attributes([("a", 1i64)])).unwrap();
        assert_eq!(genesis.index, GENESIS_INDEX);
        assert!(genesis.previous_hash.is_empty());
        assert!(genesis.is_genesis());

        let next = genesis.next("salt", AttributeDiff::default()).unwrap();
        assert_eq!(next.index, 1);
        assert_eq!(next.previous_hash, genesis.hash);
        assert_eq!(next.compute_hash("salt").unwrap(), next.hash);
    }

    #[test]
    fn test_payload_wire_form() {
        let block = Block::genesis("salt", attributes([("a", "x")])).unwrap();
        let encoded = serde_json::to_value(&block.payload).unwrap();
        assert_eq!(
            encoded,
            serde_json::json!({"kind": "genesis", "attributes": {"a": "x"}})
        );
    }
}
