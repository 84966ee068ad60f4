//! Layered sorted-pair Merkle tree over a block's transaction hashes.

use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{MalformedReason, MerkleError, Result};
use crate::hash::{hash_sorted_pair, keccak256, Hash32};

/// One level of the tree. Index 0 of [`MerkleResult::layers`] is the leaf layer.
pub type TreeLayer = Vec<Hash32>;

/// What happens to the unpaired trailing node of an odd-sized layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddNodeRule {
    /// Carried up to the next layer unchanged (merkletreejs default).
    #[default]
    Promote,
    /// Hashed with itself.
    Duplicate,
}

impl fmt::Display for OddNodeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OddNodeRule::Promote => write!(f, "promote"),
            OddNodeRule::Duplicate => write!(f, "duplicate"),
        }
    }
}

impl FromStr for OddNodeRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "promote" => Ok(OddNodeRule::Promote),
            "duplicate" => Ok(OddNodeRule::Duplicate),
            other => Err(format!(
                "unknown odd-node rule '{}' (expected promote or duplicate)",
                other
            )),
        }
    }
}

/// Root of a built tree, or the "N/A" sentinel for a block without transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MerkleRoot {
    NotApplicable,
    Hash(Hash32),
}

impl MerkleRoot {
    pub const NOT_APPLICABLE: &'static str = "N/A";

    pub fn hash(&self) -> Option<&Hash32> {
        match self {
            MerkleRoot::Hash(h) => Some(h),
            MerkleRoot::NotApplicable => None,
        }
    }
}

impl fmt::Display for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MerkleRoot::NotApplicable => f.write_str(Self::NOT_APPLICABLE),
            MerkleRoot::Hash(h) => write!(f, "{}", h),
        }
    }
}

impl Serialize for MerkleRoot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MerkleRoot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == Self::NOT_APPLICABLE {
            return Ok(MerkleRoot::NotApplicable);
        }
        s.parse()
            .map(MerkleRoot::Hash)
            .map_err(serde::de::Error::custom)
    }
}

/// A transaction-hash entry as handed over by the block source.
/// `None` and empty strings are treated as missing and skipped.
pub trait TxHashInput {
    fn tx_hash(&self) -> Option<&str>;
}

impl TxHashInput for str {
    fn tx_hash(&self) -> Option<&str> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl TxHashInput for String {
    fn tx_hash(&self) -> Option<&str> {
        self.as_str().tx_hash()
    }
}

impl<T: TxHashInput + ?Sized> TxHashInput for &T {
    fn tx_hash(&self) -> Option<&str> {
        (**self).tx_hash()
    }
}

impl<T: TxHashInput> TxHashInput for Option<T> {
    fn tx_hash(&self) -> Option<&str> {
        self.as_ref().and_then(|t| t.tx_hash())
    }
}

/// Built tree: layers leaves-first plus the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MerkleResult {
    layers: Vec<TreeLayer>,
    root: MerkleRoot,
    odd_node: OddNodeRule,
    #[serde(skip)]
    strict_prefix: bool,
}

impl MerkleResult {
    /// The result for a block without transactions.
    pub fn empty(builder: &MerkleBuilder) -> Self {
        Self {
            layers: Vec::new(),
            root: MerkleRoot::NotApplicable,
            odd_node: builder.odd_node,
            strict_prefix: builder.strict_prefix,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[TreeLayer] {
        &self.layers
    }

    pub fn leaves(&self) -> &[Hash32] {
        self.layers.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    pub fn root(&self) -> &MerkleRoot {
        &self.root
    }

    pub fn odd_node(&self) -> OddNodeRule {
        self.odd_node
    }

    /// Builder with the options this tree was built with.
    pub fn builder(&self) -> MerkleBuilder {
        MerkleBuilder::new()
            .with_odd_node_rule(self.odd_node)
            .with_strict_prefix(self.strict_prefix)
    }

    /// Position of the first leaf equal to `leaf`.
    pub fn position_of(&self, leaf: &Hash32) -> Option<usize> {
        self.leaves().iter().position(|l| l == leaf)
    }
}

/// Builds [`MerkleResult`]s. Holds options only; every build is independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MerkleBuilder {
    odd_node: OddNodeRule,
    strict_prefix: bool,
}

impl MerkleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_odd_node_rule(mut self, rule: OddNodeRule) -> Self {
        self.odd_node = rule;
        self
    }

    /// Require the prefix to be `0x`/`0X` instead of stripping any two characters.
    pub fn with_strict_prefix(mut self, strict: bool) -> Self {
        self.strict_prefix = strict;
        self
    }

    pub fn odd_node_rule(&self) -> OddNodeRule {
        self.odd_node
    }

    pub fn strict_prefix(&self) -> bool {
        self.strict_prefix
    }

    /// Build the tree for one block's transactions, in block order.
    pub fn build<T: TxHashInput>(&self, tx_hashes: &[T]) -> Result<MerkleResult> {
        let leaves = tx_hashes
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| entry.tx_hash().map(|h| (position, h)))
            .map(|(position, entry)| self.leaf_at(position, entry))
            .collect::<Result<TreeLayer>>()?;

        if leaves.is_empty() {
            debug!("No transactions to build a Merkle tree from");
            return Ok(MerkleResult::empty(self));
        }

        let leaf_count = leaves.len();
        let layers = self.build_layers(leaves);
        let root = layers
            .last()
            .and_then(|layer| layer.first())
            .map(|h| MerkleRoot::Hash(*h))
            .unwrap_or(MerkleRoot::NotApplicable);

        debug!(
            "Built Merkle tree: {} leaves, {} layers, root {}",
            leaf_count,
            layers.len(),
            root
        );

        Ok(MerkleResult {
            layers,
            root,
            odd_node: self.odd_node,
            strict_prefix: self.strict_prefix,
        })
    }

    /// Build trees for several blocks in parallel. Results keep block order.
    pub fn build_blocks<B, T>(&self, blocks: &[B]) -> Vec<Result<MerkleResult>>
    where
        B: AsRef<[T]> + Sync,
        T: TxHashInput + Sync,
    {
        blocks.par_iter().map(|b| self.build(b.as_ref())).collect()
    }

    /// Leaf value for one transaction hash: Keccak-256 of its 32 raw bytes.
    pub fn leaf_hash(&self, entry: &str) -> Result<Hash32> {
        self.leaf_at(0, entry)
    }

    fn leaf_at(&self, position: usize, entry: &str) -> Result<Hash32> {
        if self.strict_prefix && !(entry.starts_with("0x") || entry.starts_with("0X")) {
            return Err(MerkleError::malformed(
                position,
                entry,
                MalformedReason::InvalidPrefix,
            ));
        }

        // the prefix is two characters, not two bytes
        let mut chars = entry.chars();
        if chars.next().zip(chars.next()).is_none() {
            return Err(MerkleError::malformed(
                position,
                entry,
                MalformedReason::MissingPrefix,
            ));
        }
        let digits = chars.as_str();

        let bytes = hex::decode(digits).map_err(|e| {
            MerkleError::malformed(position, entry, MalformedReason::InvalidHex(e))
        })?;

        let raw: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            MerkleError::malformed(position, entry, MalformedReason::InvalidLength(bytes.len()))
        })?;

        Ok(keccak256(&raw))
    }

    fn build_layers(&self, leaves: TreeLayer) -> Vec<TreeLayer> {
        let mut layers = vec![leaves];

        while let Some(prev) = layers.last().filter(|layer| layer.len() > 1) {
            let next: TreeLayer = prev
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => hash_sorted_pair(left, right),
                    _ => self.lift_odd(&pair[0]),
                })
                .collect();

            trace!("Merkle layer {}: {} nodes", layers.len(), next.len());
            layers.push(next);
        }

        layers
    }

    fn lift_odd(&self, node: &Hash32) -> Hash32 {
        match self.odd_node {
            OddNodeRule::Promote => *node,
            OddNodeRule::Duplicate => hash_sorted_pair(node, node),
        }
    }
}

/// Build with default options (odd node promoted, any 2-character prefix).
pub fn build<T: TxHashInput>(tx_hashes: &[T]) -> Result<MerkleResult> {
    MerkleBuilder::default().build(tx_hashes)
}

/// Leaf value for one transaction hash with default options.
pub fn leaf_hash(entry: &str) -> Result<Hash32> {
    MerkleBuilder::default().leaf_hash(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(byte: &str) -> String {
        format!("0x{}", byte.repeat(32))
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        let result = build::<&str>(&[]).unwrap();
        assert!(result.is_empty());
        assert!(result.layers().is_empty());
        assert_eq!(result.root(), &MerkleRoot::NotApplicable);
        assert_eq!(result.root().to_string(), "N/A");
    }

    #[test]
    fn test_empty_entries_are_filtered() {
        let result = build(&["", ""]).unwrap();
        assert!(result.is_empty());

        let entries = vec![None, Some(tx("aa")), Some(String::new()), Some(tx("bb"))];
        let with_gaps = build(&entries).unwrap();
        let compact = build(&[tx("aa"), tx("bb")]).unwrap();
        assert_eq!(with_gaps, compact);
        assert_eq!(with_gaps.leaf_count(), 2);
    }

    #[test]
    fn test_single_transaction_root_is_its_leaf() {
        let result = build(&[tx("11")]).unwrap();
        assert_eq!(result.layers().len(), 1);
        assert_eq!(result.leaves().len(), 1);
        assert_eq!(
            result.root().to_string(),
            "0xb569321de72d0af89c2fb48a484de3fc9343f31600ae1f3e13d633cb48cbf816"
        );
        assert_eq!(result.root().hash(), result.leaves().first());
    }

    #[test]
    fn test_two_transactions_pinned_root() {
        let result = build(&[tx("aa"), tx("bb")]).unwrap();
        assert_eq!(
            result.leaves()[0].to_hex(),
            "20ee8f1366f06926e9e8771d8fb9007a8537c8dfdb6a3f8c2cfd64db19d2ec90"
        );
        assert_eq!(
            result.leaves()[1].to_hex(),
            "a4b1987d97f5e2e9d8b6fa09ef4c90e751cbe34e08f04dfe49bd335130e5be0c"
        );
        assert_eq!(
            result.root().to_string(),
            "0xf96a02e83a4de0542b29d3d4556634cb596200d78702b08092e010220083b3ba"
        );
    }

    #[test]
    fn test_odd_node_rules_differ() {
        let txs = [tx("11"), tx("22"), tx("33")];

        let promoted = build(&txs).unwrap();
        assert_eq!(promoted.layers()[1][1], promoted.leaves()[2]);
        assert_eq!(
            promoted.root().to_string(),
            "0x03d0ab212117a8959adee428db15d5c335a37129fe41ff81273cf0206255d092"
        );

        let duplicated = MerkleBuilder::new()
            .with_odd_node_rule(OddNodeRule::Duplicate)
            .build(&txs)
            .unwrap();
        let lone = duplicated.leaves()[2];
        assert_eq!(duplicated.layers()[1][1], hash_sorted_pair(&lone, &lone));
        assert_eq!(
            duplicated.root().to_string(),
            "0xb12906e263234739ecbd11ccae5874a029a0283d10fdc3e72716cb1c64a4eb88"
        );
    }

    #[test]
    fn test_malformed_entries() {
        let err = build(&["not-hex"]).unwrap_err();
        assert!(matches!(
            err,
            MerkleError::MalformedInput {
                position: 0,
                reason: MalformedReason::InvalidHex(_),
                ..
            }
        ));

        // position counts skipped empty entries
        let aa = tx("aa");
        let err = build(&["", aa.as_str(), "0x1234"]).unwrap_err();
        assert_eq!(
            err,
            MerkleError::MalformedInput {
                position: 2,
                entry: "0x1234".into(),
                reason: MalformedReason::InvalidLength(2),
            }
        );

        let err = build(&["0"]).unwrap_err();
        assert!(matches!(
            err,
            MerkleError::MalformedInput {
                reason: MalformedReason::MissingPrefix,
                ..
            }
        ));
    }

    #[test]
    fn test_strict_prefix() {
        let unprefixed = format!("zz{}", "11".repeat(32));
        assert_eq!(build(&[&unprefixed]).unwrap(), build(&[tx("11")]).unwrap());

        let strict = MerkleBuilder::new().with_strict_prefix(true);
        let err = strict.build(&[&unprefixed]).unwrap_err();
        assert!(matches!(
            err,
            MerkleError::MalformedInput {
                reason: MalformedReason::InvalidPrefix,
                ..
            }
        ));
        assert!(strict.build(&[format!("0X{}", "11".repeat(32))]).is_ok());
    }

    #[test]
    fn test_multibyte_prefix_is_two_characters() {
        let accented = format!("aé{}", "11".repeat(32));
        assert_eq!(build(&[&accented]).unwrap(), build(&[tx("11")]).unwrap());

        let short = format!("aé{}", "11".repeat(31));
        let err = build(&[&short]).unwrap_err();
        assert!(matches!(
            err,
            MerkleError::MalformedInput {
                reason: MalformedReason::InvalidLength(31),
                ..
            }
        ));

        let err = build(&["é"]).unwrap_err();
        assert!(matches!(
            err,
            MerkleError::MalformedInput {
                reason: MalformedReason::MissingPrefix,
                ..
            }
        ));
    }

    #[test]
    fn test_build_blocks_keeps_order() {
        let blocks = vec![
            vec![tx("11")],
            vec![],
            vec![tx("aa"), tx("bb")],
            vec!["bogus".to_string()],
        ];
        let results = MerkleBuilder::new().build_blocks(&blocks);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap(), &build(&blocks[0]).unwrap());
        assert!(results[1].as_ref().unwrap().is_empty());
        assert_eq!(results[2].as_ref().unwrap(), &build(&blocks[2]).unwrap());
        assert!(results[3].is_err());
    }

    #[test]
    fn test_odd_node_rule_parse() {
        assert_eq!("Promote".parse::<OddNodeRule>(), Ok(OddNodeRule::Promote));
        assert_eq!(" duplicate ".parse::<OddNodeRule>(), Ok(OddNodeRule::Duplicate));
        assert!("both".parse::<OddNodeRule>().is_err());
    }
}
