mod config;
mod input;
mod render;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use config::ViewerConfig;
use log::debug;
use render::{render_tree, RenderOptions};
use std::fs;
use std::path::{Path, PathBuf};
use territory_merkle::{Hash32, Layout, MerkleBuilder, MerkleProof, MerkleResult, OddNodeRule};

#[derive(Parser)]
#[command(name = "territory-viewer")]
#[command(about = "BlockTerritory Merkle viewer - inspect the transaction tree of a block", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Viewer config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rule for an unpaired node: promote or duplicate
    #[arg(long, global = true)]
    odd_node: Option<OddNodeRule>,

    /// Require every hash to start with 0x
    #[arg(long, global = true)]
    strict_prefix: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Args)]
struct InputArgs {
    /// Transaction hashes, in block order
    hashes: Vec<String>,

    /// Read hashes from a file (JSON array or one per line, `-` for stdin)
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the Merkle tree of one block
    Tree {
        #[command(flatten)]
        input: InputArgs,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Show full node hashes instead of truncated ones
        #[arg(long)]
        full: bool,

        /// root-first or leaves-first
        #[arg(long)]
        layout: Option<Layout>,
    },

    /// Print the Merkle root of one block
    Root {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print the roots of several blocks (JSON array of arrays)
    Roots {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print an inclusion proof as JSON
    Proof {
        #[command(flatten)]
        input: InputArgs,

        /// Leaf index
        #[arg(short, long, conflicts_with = "tx", required_unless_present = "tx")]
        index: Option<usize>,

        /// Transaction hash to prove instead of an index
        #[arg(long)]
        tx: Option<String>,
    },

    /// Verify a proof JSON file
    Verify {
        #[arg(short, long)]
        proof: PathBuf,

        /// Root to check against (defaults to the root stored in the proof)
        #[arg(long)]
        root: Option<String>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let mut config = ViewerConfig::load(cli.config.as_deref())?;
    if let Some(rule) = cli.odd_node {
        config.odd_node = rule;
    }
    if cli.strict_prefix {
        config.strict_prefix = true;
    }
    if cli.no_color {
        config.color = false;
    }
    config.print_summary();
    debug!("Viewer config: {:?}", config);

    let builder = config.builder();

    match cli.command {
        Commands::Tree {
            input,
            json,
            full,
            layout,
        } => {
            let opts = RenderOptions {
                layout: layout.unwrap_or(config.layout),
                full_hashes: full || config.full_hashes,
                color: config.color,
            };
            print!("{}", tree_output(&builder, &input, json, &opts)?);
        }

        Commands::Root { input } => {
            println!("{}", root_output(&builder, &input)?);
        }

        Commands::Roots { file } => {
            let roots = block_roots(&builder, &file)?;
            debug!("Printed {} block roots", roots);
        }

        Commands::Proof { input, index, tx } => {
            println!("{}", proof_output(&builder, &input, index, tx.as_deref())?);
        }

        Commands::Verify { proof, root } => {
            let proof = verify_proof_file(&proof, root.as_deref())?;
            println!("{}", format!("Proof valid for leaf {}", proof.index).green());
        }
    }

    Ok(())
}

fn build_input(builder: &MerkleBuilder, input: &InputArgs) -> Result<MerkleResult> {
    let entries = input::load_entries(&input.hashes, input.file.as_deref())?;
    builder
        .build(&entries)
        .context("Failed to build Merkle tree")
}

fn tree_output(
    builder: &MerkleBuilder,
    input: &InputArgs,
    json: bool,
    opts: &RenderOptions,
) -> Result<String> {
    let result = build_input(builder, input)?;
    if json {
        Ok(serde_json::to_string_pretty(&result)? + "\n")
    } else {
        Ok(render_tree(&result, opts))
    }
}

fn root_output(builder: &MerkleBuilder, input: &InputArgs) -> Result<String> {
    let result = build_input(builder, input)?;
    Ok(result.root().to_string())
}

/// Prints `index: root` per block on stdout and failures on stderr.
/// Returns the number of blocks, or an error if any block failed.
fn block_roots(builder: &MerkleBuilder, file: &Path) -> Result<usize> {
    let blocks = input::load_blocks(file)?;
    let mut failed = 0;
    for (i, result) in builder.build_blocks(&blocks).into_iter().enumerate() {
        match result {
            Ok(tree) => println!("{}: {}", i, tree.root()),
            Err(e) => {
                failed += 1;
                eprintln!("{}", format!("{}: {}", i, e).red());
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} blocks failed", failed, blocks.len());
    }
    Ok(blocks.len())
}

fn proof_output(
    builder: &MerkleBuilder,
    input: &InputArgs,
    index: Option<usize>,
    tx: Option<&str>,
) -> Result<String> {
    let result = build_input(builder, input)?;
    let proof = match (index, tx) {
        (_, Some(tx)) => result.proof_for_tx(tx)?,
        (Some(index), None) => result.proof(index)?,
        (None, None) => bail!("Pass --index or --tx"),
    };
    Ok(serde_json::to_string_pretty(&proof)?)
}

fn verify_proof_file(path: &Path, root: Option<&str>) -> Result<MerkleProof> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let proof: MerkleProof = serde_json::from_str(&content).context("Invalid proof JSON")?;

    let valid = match root {
        Some(root) => {
            let root: Hash32 = root.parse().context("Invalid --root")?;
            proof.verify_against(&root)
        }
        None => proof.verify(),
    };

    if !valid {
        bail!(
            "Proof for leaf {} does not match root {}",
            proof.index,
            proof.root
        );
    }
    Ok(proof)
}
