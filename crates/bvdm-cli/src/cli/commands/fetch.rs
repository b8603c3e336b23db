//! `bvdm fetch` – download indexed archives for one month, or everything.

use anyhow::{Context, Result};
use bvdm_core::config::BvdmConfig;
use bvdm_core::fetcher;
use bvdm_core::index::PathIndex;
use std::path::{Path, PathBuf};

/// Validate the optional year/month pair: both or neither, month 1-12.
fn month_filter(year: Option<u16>, month: Option<u8>) -> Result<Option<(u16, u8)>> {
    match (year, month) {
        (None, None) => Ok(None),
        (Some(y), Some(m)) => {
            if !(1..=12).contains(&m) {
                anyhow::bail!("month must be between 1 and 12, got {}", m);
            }
            Ok(Some((y, m)))
        }
        _ => anyhow::bail!("--year and --month must be given together"),
    }
}

pub async fn run_fetch(
    cfg: &BvdmConfig,
    year: Option<u16>,
    month: Option<u8>,
    workers: usize,
    download_dir: PathBuf,
    data_dir: &Path,
) -> Result<()> {
    let filter = month_filter(year, month)?;

    let index = PathIndex::load(data_dir)
        .with_context(|| format!("no path index under {}; run `bvdm crawl` first", data_dir.display()))?;
    if index.is_empty() {
        println!("Path index is empty; nothing to download.");
        return Ok(());
    }

    let tasks = fetcher::plan_tasks(&index, filter, &download_dir);
    match filter {
        Some((y, m)) => println!(
            "{} of {} indexed archives match {:04}-{:02}.",
            tasks.len(),
            index.len(),
            y,
            m
        ),
        None => println!("Downloading all {} indexed archives.", tasks.len()),
    }
    if tasks.is_empty() {
        println!("Nothing to download.");
        return Ok(());
    }

    println!("Fetching with {} workers into {}...", workers, download_dir.display());
    let summary = {
        let cfg = cfg.clone();
        tokio::task::spawn_blocking(move || fetcher::run_tasks(&cfg, tasks, workers))
            .await
            .map_err(|e| anyhow::anyhow!("fetch task join: {}", e))??
    };

    println!(
        "Done: {} downloaded, {} already present, {} failed.",
        summary.downloaded, summary.skipped, summary.failed
    );
    if summary.had_failures() {
        anyhow::bail!("{} download(s) failed; rerun to retry", summary.failed);
    }
    Ok(())
}
