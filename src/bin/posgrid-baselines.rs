//! posgrid-baselines: chance baselines from a gold-tagged test set
//!
//! Computes the majority-tag accuracy baseline and the normalised entropy
//! baseline that `posgrid` compares grid results against.
//!
//! ## Usage
//!
//! ```bash
//! # Print both baselines
//! posgrid-baselines data/manchester_test.txt
//!
//! # Emit a snippet for posgrid.toml
//! posgrid-baselines data/manchester_test.txt --corpus manchester >> posgrid.toml
//!
//! # Also show the tag distribution
//! posgrid-baselines data/manchester_test.txt --tags
//! ```
//!
//! Test-set lines look like `orthography|TAG<TAB>phonology|TAG`.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;

use posgrid::analysis::{compute_baselines, read_test_items, tag_distribution};

#[derive(Parser)]
#[command(name = "posgrid-baselines")]
#[command(about = "Majority and entropy baselines for a gold-tagged test set")]
struct Args {
    /// Test-set file(s); items from all files are pooled
    #[arg(required = true, value_name = "TEST_SET")]
    files: Vec<PathBuf>,

    /// Print a [baselines.NAME] table for posgrid.toml
    #[arg(long, value_name = "NAME")]
    corpus: Option<String>,

    /// Print the tag distribution
    #[arg(long)]
    tags: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut tags = Vec::new();
    for file in &args.files {
        let items = read_test_items(file)?;
        if items.is_empty() {
            eprintln!("⚠️  No tagged items in {}", file.display());
        }
        tags.extend(items);
    }
    if tags.is_empty() {
        bail!("no tagged items found (expected lines like 'word|TAG<TAB>phon|TAG')");
    }

    let baseline = compute_baselines(&tags)?;

    if args.tags {
        let total = tags.len() as f64;
        eprintln!("Tag distribution ({} items):", tags.len());
        for (tag, n) in tag_distribution(&tags) {
            eprintln!("  {:<8} {:>7}  {:>6.2}%", tag, n, n as f64 / total * 100.0);
        }
        eprintln!();
    }

    match &args.corpus {
        Some(name) => {
            println!("[baselines.{}]", name);
            println!("accuracy = {:.6}", baseline.accuracy);
            println!("entropy = {:.6}", baseline.entropy);
        }
        None => {
            println!("items:             {}", tags.len());
            println!("majority baseline: {:.6}", baseline.accuracy);
            println!("entropy baseline:  {:.6}", baseline.entropy);
        }
    }

    Ok(())
}
