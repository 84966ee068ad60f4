// src/render.rs
// Text rendering of a block's Merkle tree, root header first

use colored::{ColoredString, Colorize};
use territory_merkle::{Hash32, Layout, MerkleResult};

pub const NO_TRANSACTIONS: &str = "This block has no transactions to form a tree.";

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub layout: Layout,
    pub full_hashes: bool,
    pub color: bool,
}

fn paint<F>(text: &str, color: bool, style: F) -> String
where
    F: Fn(&str) -> ColoredString,
{
    if color {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn node_text(hash: &Hash32, full: bool) -> String {
    if full {
        hash.to_hex()
    } else {
        hash.short()
    }
}

pub fn render_tree(result: &MerkleResult, opts: &RenderOptions) -> String {
    if result.is_empty() {
        return format!("{}\n", paint(NO_TRANSACTIONS, opts.color, |s| s.bright_black()));
    }

    let mut lines = vec![
        paint("MERKLE ROOT", opts.color, |s| s.cyan().bold()),
        paint(&result.root().to_string(), opts.color, |s| s.bright_blue()),
    ];

    for view in result.layer_views(opts.layout) {
        let nodes: Vec<String> = view
            .nodes
            .iter()
            .map(|h| node_text(h, opts.full_hashes))
            .collect();
        lines.push(String::new());
        lines.push(paint(&view.label.to_string(), opts.color, |s| s.bright_black()));
        lines.push(format!("  {}", nodes.join("  ")));
    }

    lines.join("\n") + "\n"
}
