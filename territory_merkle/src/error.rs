use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MerkleError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MerkleError {
    /// A non-empty transaction hash could not be turned into 32 raw bytes.
    /// `position` is the index in the caller's sequence, before empty entries were dropped.
    #[error("Malformed transaction hash at position {position} ({entry:?}): {reason}")]
    MalformedInput {
        position: usize,
        entry: String,
        reason: MalformedReason,
    },

    #[error("Empty Merkle tree has no leaves")]
    EmptyTree,

    #[error("Index {index} out of bounds (tree has {leaves} leaves)")]
    LeafOutOfBounds { index: usize, leaves: usize },

    #[error("Transaction {0} is not a leaf of this tree")]
    LeafNotFound(String),
}

/// Why an entry was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum MalformedReason {
    /// Shorter than the 2-character prefix.
    MissingPrefix,
    /// Strict mode only: prefix was not `0x`/`0X`.
    InvalidPrefix,
    InvalidHex(hex::FromHexError),
    /// Decoded cleanly but to the wrong number of bytes.
    InvalidLength(usize),
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::MissingPrefix => write!(f, "missing 2-character prefix"),
            MalformedReason::InvalidPrefix => write!(f, "prefix is not 0x"),
            MalformedReason::InvalidHex(e) => write!(f, "invalid hex: {}", e),
            MalformedReason::InvalidLength(n) => write!(f, "expected 32 bytes, got {}", n),
        }
    }
}

impl MerkleError {
    pub(crate) fn malformed(position: usize, entry: &str, reason: MalformedReason) -> Self {
        MerkleError::MalformedInput {
            position,
            entry: entry.to_string(),
            reason,
        }
    }
}
