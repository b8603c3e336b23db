//! `bvdm crawl` – discover remote archives and write the path index.

use anyhow::Result;
use bvdm_core::config::BvdmConfig;
use bvdm_core::crawler::{self, CrawlOptions};
use std::path::Path;

pub async fn run_crawl(
    cfg: &BvdmConfig,
    workers: usize,
    max_depth: u32,
    save_dir: &Path,
    start_prefix: String,
    all_files: bool,
) -> Result<()> {
    println!(
        "Crawling {} (max depth {}, {} workers)...",
        start_prefix, max_depth, workers
    );

    let opts = CrawlOptions {
        start_prefix,
        max_depth,
        workers,
        record_all_files: all_files,
    };
    let outcome = crawler::crawl(cfg, &opts).await?;

    if outcome.listed_dirs == 0 {
        anyhow::bail!(
            "crawl failed: no directory could be listed ({} attempted)",
            outcome.failed_dirs
        );
    }

    let index_path = outcome.index.save(save_dir)?;

    println!(
        "Listed {} directories ({} failed), {} archives indexed.",
        outcome.listed_dirs,
        outcome.failed_dirs,
        outcome.index.len()
    );
    println!("Index written to {}", index_path.display());

    if outcome.failed_dirs > 0 {
        println!(
            "Warning: {} directories could not be listed; the index may be incomplete.",
            outcome.failed_dirs
        );
        tracing::warn!(failed = outcome.failed_dirs, "crawl finished with failures");
    }

    Ok(())
}
