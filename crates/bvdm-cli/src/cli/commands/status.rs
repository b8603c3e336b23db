//! `bvdm status` – show what the path index covers, grouped by month.

use anyhow::{Context, Result};
use bvdm_core::index::PathIndex;
use std::path::Path;

pub fn run_status(data_dir: &Path) -> Result<()> {
    let index = PathIndex::load(data_dir)
        .with_context(|| format!("no path index under {}; run `bvdm crawl` first", data_dir.display()))?;

    if index.is_empty() {
        println!("Path index is empty.");
        return Ok(());
    }

    println!("{} archives indexed.", index.len());
    println!("{:<10} {}", "MONTH", "ARCHIVES");
    for (stamp, count) in index.month_counts() {
        println!("{:<10} {}", stamp, count);
    }
    Ok(())
}
