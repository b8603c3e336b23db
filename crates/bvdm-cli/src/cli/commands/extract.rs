//! `bvdm extract` – extract downloaded zip archives in place.

use anyhow::Result;
use bvdm_core::extract::{self, ExtractOptions};
use std::path::PathBuf;

pub async fn run_extract(download_dir: PathBuf, workers: usize, remove_archives: bool) -> Result<()> {
    println!(
        "Extracting archives under {} with {} workers...",
        download_dir.display(),
        workers
    );

    let opts = ExtractOptions {
        download_dir,
        workers,
        remove_archives,
    };
    let summary = tokio::task::spawn_blocking(move || extract::run_extract(&opts))
        .await
        .map_err(|e| anyhow::anyhow!("extract task join: {}", e))??;

    if summary.extracted == 0 && summary.failed == 0 {
        println!("No archives found.");
        return Ok(());
    }
    println!(
        "Done: {} extracted, {} removed, {} failed.",
        summary.extracted, summary.removed, summary.failed
    );
    if summary.had_failures() {
        anyhow::bail!("{} archive(s) failed to extract", summary.failed);
    }
    Ok(())
}
