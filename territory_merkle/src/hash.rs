//! 32-byte node values and the Keccak-256 primitives the tree is built from.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tiny_keccak::{Hasher, Keccak};

use crate::view::format_tree_hash;

/// A single tree node. Ordering is lexicographic over the bytes, which is
/// the order sibling pairs are sorted by before hashing.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const LEN: usize = 32;

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex without the `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_prefixed_hex(&self) -> String {
        format!("0x{}", self.to_hex())
    }

    /// Truncated display form, e.g. `b56932...f816`.
    pub fn short(&self) -> String {
        format_tree_hash(&self.to_hex())
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(value: [u8; 32]) -> Self {
        Hash32(value)
    }
}

impl AsRef<[u8]> for Hash32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash32({})", self.short())
    }
}

/// Parses 64 hex digits, with or without a `0x` prefix.
impl FromStr for Hash32 {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let mut out = [0u8; 32];
        hex::decode_to_slice(digits, &mut out)?;
        Ok(Hash32(out))
    }
}

impl Serialize for Hash32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_prefixed_hex())
    }
}

impl<'de> Deserialize<'de> for Hash32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Keccak-256 (the pre-standard SHA-3 variant used by Ethereum).
pub fn keccak256(data: &[u8]) -> Hash32 {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    Hash32(output)
}

/// Parent of two siblings: Keccak-256 over the smaller value followed by the larger.
/// Argument order does not matter.
pub fn hash_sorted_pair(a: &Hash32, b: &Hash32) -> Hash32 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut hasher = Keccak::v256();
    hasher.update(&lo.0);
    hasher.update(&hi.0);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    Hash32(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_known_vectors() {
        assert_eq!(
            keccak256(b"").to_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            keccak256(b"hello world").to_hex(),
            "47173285a8d7341e5e972fc677286384f802f8ef42a5ec5f03bbfa254cb01fad"
        );
    }

    #[test]
    fn test_sorted_pair_is_symmetric() {
        let a = keccak256(b"a");
        let b = keccak256(b"b");
        assert_eq!(hash_sorted_pair(&a, &b), hash_sorted_pair(&b, &a));

        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let mut concat = lo.0.to_vec();
        concat.extend_from_slice(&hi.0);
        assert_eq!(hash_sorted_pair(&a, &b), keccak256(&concat));
    }

    #[test]
    fn test_parse_and_display() {
        let text = "0xb569321de72d0af89c2fb48a484de3fc9343f31600ae1f3e13d633cb48cbf816";
        let hash: Hash32 = text.parse().unwrap();
        assert_eq!(hash.to_string(), text);
        assert_eq!(hash, text[2..].parse::<Hash32>().unwrap());
        assert_eq!(hash.short(), "b56932...f816");

        assert!("0x1234".parse::<Hash32>().is_err());
        assert!("zz".repeat(32).parse::<Hash32>().is_err());
    }
}
