//! Revision chain value type
//!
//! A chain is an immutable, ordered block sequence for one document.
//! Appending returns a new chain and leaves the receiver untouched, so a
//! loaded chain can be shared with readers without locking.

use serde::{Deserialize, Serialize};

use super::block::{Block, BlockPayload, GENESIS_INDEX};
use super::diff::AttributeDiff;
use super::errors::{ChainError, ChainResult};
use crate::document::Attributes;
use crate::space::Kekspace;

/// Hash-linked revision history of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chain {
    document_id: String,
    blocks: Vec<Block>,
}

impl Chain {
    /// Single-block chain holding the full initial attribute set.
    pub fn new(document_id: impl Into<String>, space: &Kekspace, attributes: Attributes) -> ChainResult<Self> {
        let genesis = Block::genesis(&space.salt(), attributes)?;
        Ok(Self {
            document_id: document_id.into(),
            blocks: vec![genesis],
        })
    }

    /// Chain with `diff` linked onto the current last block.
    pub fn add_block(&self, space: &Kekspace, diff: AttributeDiff) -> ChainResult<Self> {
        let last = self
            .last()
            .ok_or_else(|| ChainError::NoBlocks(self.document_id.clone()))?;
        let block = last.next(&space.salt(), diff)?;

        let mut blocks = Vec::with_capacity(self.blocks.len() + 1);
        blocks.extend_from_slice(&self.blocks);
        blocks.push(block);

        Ok(Self {
            document_id: self.document_id.clone(),
            blocks,
        })
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Hash of the last block, empty for a chain with no blocks
    pub fn head_hash(&self) -> &str {
        self.last().map(|b| b.hash.as_str()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Recompute every digest and link.
    ///
    /// Reports the first failure in block order: index continuity first,
    /// then the link to the prior hash, then the block's own hash.
    pub fn verify(&self, space: &Kekspace) -> ChainResult<()> {
        let salt = space.salt();
        let mut previous: Option<&Block> = None;

        for block in &self.blocks {
            let expected_index = previous.map_or(GENESIS_INDEX, |p| p.index + 1);
            if block.index != expected_index {
                return Err(ChainError::IndexGap {
                    index: block.index,
                    expected: expected_index,
                });
            }

            let expected_link = previous.map_or("", |p| p.hash.as_str());
            if block.previous_hash != expected_link {
                return Err(ChainError::BrokenLink { index: block.index });
            }

            if block.is_genesis() != previous.is_none() {
                return Err(ChainError::UnexpectedPayload { index: block.index });
            }

            if block.compute_hash(&salt)? != block.hash {
                return Err(ChainError::HashMismatch { index: block.index });
            }

            previous = Some(block);
        }

        Ok(())
    }

    /// Attribute set after the last block, rebuilt from the history alone.
    pub fn replay(&self) -> ChainResult<Attributes> {
        let mut blocks = self.blocks.iter();
        let mut state = match blocks.next().map(|b| (b.index, &b.payload)) {
            Some((_, BlockPayload::Genesis { attributes })) => attributes.clone(),
            Some((index, BlockPayload::Delta(_))) => {
                return Err(ChainError::UnexpectedPayload { index })
            }
            None => return Err(ChainError::NoBlocks(self.document_id.clone())),
        };

        for block in blocks {
            match &block.payload {
                BlockPayload::Delta(diff) => state = diff.apply(&state),
                BlockPayload::Genesis { .. } => {
                    return Err(ChainError::UnexpectedPayload { index: block.index })
                }
            }
        }

        Ok(state)
    }
}
