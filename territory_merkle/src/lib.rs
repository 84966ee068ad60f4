//! Keccak-256 Merkle trees over the transaction hashes of a single block.
//!
//! Leaves are `keccak256(raw tx hash bytes)`, sibling pairs are sorted by byte
//! value before hashing, and an unpaired trailing node is promoted unchanged
//! unless [`OddNodeRule::Duplicate`] is selected.
//!
//! ```
//! use territory_merkle::build;
//!
//! let txs = [format!("0x{}", "aa".repeat(32)), format!("0x{}", "bb".repeat(32))];
//! let tree = build(&txs).unwrap();
//! assert_eq!(tree.leaf_count(), 2);
//! assert_eq!(tree.layers().len(), 2);
//! ```

pub mod cache;
pub mod error;
pub mod hash;
pub mod proof;
pub mod tree;
pub mod view;

pub use cache::MerkleCache;
pub use error::{MalformedReason, MerkleError, Result};
pub use hash::{hash_sorted_pair, keccak256, Hash32};
pub use proof::MerkleProof;
pub use tree::{
    build, leaf_hash, MerkleBuilder, MerkleResult, MerkleRoot, OddNodeRule, TreeLayer, TxHashInput,
};
pub use view::{format_tree_hash, LayerLabel, LayerView, Layout};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{MerkleError, Result};
    pub use crate::hash::Hash32;
    pub use crate::proof::MerkleProof;
    pub use crate::tree::{build, MerkleBuilder, MerkleResult, MerkleRoot, OddNodeRule};
    pub use crate::view::Layout;
}
