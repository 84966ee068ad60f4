use serde::{Deserialize, Serialize};

use crate::error::{MerkleError, Result};
use crate::hash::{hash_sorted_pair, Hash32};
use crate::tree::{MerkleResult, OddNodeRule};

/// Merkle proof for inclusion verification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Index of the leaf in the tree
    pub index: usize,

    /// Leaf value (hashed transaction hash)
    pub leaf: Hash32,

    /// Sibling hashes from leaf to root. Levels where the node was promoted
    /// without a partner contribute nothing.
    pub siblings: Vec<Hash32>,

    /// Expected root hash
    pub root: Hash32,
}

impl MerkleProof {
    /// Fold the siblings into a root; pairs are sorted so no side bit is needed.
    pub fn computed_root(&self) -> Hash32 {
        self.siblings
            .iter()
            .fold(self.leaf, |current, sibling| hash_sorted_pair(&current, sibling))
    }

    /// Verify this Merkle proof
    pub fn verify(&self) -> bool {
        self.computed_root() == self.root
    }

    /// Verify against a root obtained elsewhere (e.g. a block header).
    pub fn verify_against(&self, root: &Hash32) -> bool {
        self.root == *root && self.verify()
    }
}

impl MerkleResult {
    /// Generate a MerkleProof for the leaf at `index`
    pub fn proof(&self, index: usize) -> Result<MerkleProof> {
        let (leaf, root) = match (self.leaves().get(index), self.root().hash()) {
            (Some(leaf), Some(root)) => (*leaf, *root),
            (_, None) => return Err(MerkleError::EmptyTree),
            (None, Some(_)) => {
                return Err(MerkleError::LeafOutOfBounds {
                    index,
                    leaves: self.leaf_count(),
                })
            }
        };

        let mut siblings = Vec::new();
        let mut idx = index;
        for level in self.layers() {
            if level.len() == 1 {
                break;
            }
            match level.get(idx ^ 1) {
                Some(sibling) => siblings.push(*sibling),
                None if self.odd_node() == OddNodeRule::Duplicate => siblings.push(level[idx]),
                None => {}
            }
            idx /= 2;
        }

        Ok(MerkleProof {
            index,
            leaf,
            siblings,
            root,
        })
    }

    /// Proof for the first leaf produced by transaction hash `entry`.
    /// `entry` is decoded with the same prefix rule the tree was built with.
    pub fn proof_for_tx(&self, entry: &str) -> Result<MerkleProof> {
        if self.is_empty() {
            return Err(MerkleError::EmptyTree);
        }
        let leaf = self.builder().leaf_hash(entry)?;
        let index = self
            .position_of(&leaf)
            .ok_or_else(|| MerkleError::LeafNotFound(entry.to_string()))?;
        self.proof(index)
    }
}
