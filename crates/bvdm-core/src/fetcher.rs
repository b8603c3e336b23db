//! Fan-out download of indexed archives over a worker-thread pool.
//!
//! Tasks are derived from the path index (optionally filtered to one
//! year/month) and drained from a shared queue by a fixed number of worker
//! threads. Destinations are unique per task, so workers never contend on a
//! file; per-task failures are reported, not fatal to siblings.

use anyhow::Result;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};

use crate::config::BvdmConfig;
use crate::download::{self, FetchStatus};
use crate::index::PathIndex;
use crate::retry::TransferError;

/// Fetch run parameters.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Restrict to one `(year, month)`; `None` downloads everything indexed.
    pub month: Option<(u16, u8)>,
    pub workers: usize,
    pub download_dir: PathBuf,
}

/// End-of-run counts, also used to derive the exit status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl FetchSummary {
    pub fn had_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn total(&self) -> u64 {
        self.downloaded + self.skipped + self.failed
    }
}

/// One unit of work: a remote key and its local destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub key: String,
    pub destination: PathBuf,
}

/// Build one task per index key surviving the month filter; the destination
/// mirrors the key's path under `download_dir`.
pub fn plan_tasks(
    index: &PathIndex,
    month: Option<(u16, u8)>,
    download_dir: &Path,
) -> Vec<DownloadTask> {
    index
        .keys_for_month(month)
        .into_iter()
        .map(|key| {
            let destination = download_dir.join(&key);
            DownloadTask { key, destination }
        })
        .collect()
}

/// Plan and run a fetch over the index.
pub fn run_fetch(cfg: &BvdmConfig, index: &PathIndex, opts: &FetchOptions) -> Result<FetchSummary> {
    let tasks = plan_tasks(index, opts.month, &opts.download_dir);
    run_tasks(cfg, tasks, opts.workers)
}

/// Drain `tasks` with a fixed pool of worker threads, collecting per-task
/// outcomes over a channel. Blocks until every task has been attempted.
pub fn run_tasks(
    cfg: &BvdmConfig,
    tasks: Vec<DownloadTask>,
    workers: usize,
) -> Result<FetchSummary> {
    let count = tasks.len();
    if count == 0 {
        return Ok(FetchSummary::default());
    }
    let policy = cfg.retry_policy();

    let work: Arc<Mutex<VecDeque<DownloadTask>>> =
        Arc::new(Mutex::new(tasks.into_iter().collect()));
    let (tx, rx) = mpsc::channel::<(String, Result<FetchStatus, TransferError>)>();
    let num_workers = workers.max(1).min(count);
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let cfg = cfg.clone();
        handles.push(std::thread::spawn(move || loop {
            let task = match work.lock().unwrap().pop_front() {
                Some(t) => t,
                None => break,
            };
            let res = download::fetch_archive(&cfg, &policy, &task.key, &task.destination);
            let _ = tx.send((task.key, res));
        }));
    }
    drop(tx);

    let mut summary = FetchSummary::default();
    for (key, res) in rx {
        match res {
            Ok(FetchStatus::Downloaded(bytes)) => {
                summary.downloaded += 1;
                tracing::info!(key = %key, bytes, "downloaded");
            }
            Ok(FetchStatus::Skipped) => {
                summary.skipped += 1;
                tracing::debug!(key = %key, "already present, skipped");
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(key = %key, "download failed: {}", e);
            }
        }
    }

    for h in handles {
        h.join()
            .map_err(|e| anyhow::anyhow!("fetch worker panicked: {:?}", e))?;
    }

    Ok(summary)
}
