//! Layer views for rendering a tree root-first or leaves-first.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::Hash32;
use crate::tree::MerkleResult;

/// `first6...last4` for anything longer than ten characters.
pub fn format_tree_hash(hash: &str) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if chars.len() <= 10 {
        return hash.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerLabel {
    Leaves,
    /// Height above the leaves, starting at 1.
    Level(usize),
}

impl fmt::Display for LayerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerLabel::Leaves => write!(f, "Leaves (Hashed Transaction Hashes)"),
            LayerLabel::Level(n) => write!(f, "Level {}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerView<'a> {
    pub label: LayerLabel,
    pub nodes: &'a [Hash32],
}

/// Display order of layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    #[default]
    RootFirst,
    LeavesFirst,
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "root-first" => Ok(Layout::RootFirst),
            "leaves-first" => Ok(Layout::LeavesFirst),
            other => Err(format!(
                "unknown layout '{}' (expected root-first or leaves-first)",
                other
            )),
        }
    }
}

impl MerkleResult {
    pub fn leaves_first(&self) -> impl DoubleEndedIterator<Item = LayerView<'_>> + '_ {
        self.layers()
            .iter()
            .enumerate()
            .map(|(height, nodes)| LayerView {
                label: if height == 0 {
                    LayerLabel::Leaves
                } else {
                    LayerLabel::Level(height)
                },
                nodes,
            })
    }

    pub fn root_first(&self) -> impl Iterator<Item = LayerView<'_>> + '_ {
        self.leaves_first().rev()
    }

    pub fn layer_views(&self, layout: Layout) -> Vec<LayerView<'_>> {
        match layout {
            Layout::RootFirst => self.root_first().collect(),
            Layout::LeavesFirst => self.leaves_first().collect(),
        }
    }
}
