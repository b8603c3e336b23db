//! Batch extraction of downloaded zip archives.
//!
//! Finds every `*.zip` under the download directory and extracts each next to
//! itself using the same worker-pool shape as the fetcher. Optionally removes
//! archives that extracted cleanly.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};

/// Extraction run parameters.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub download_dir: PathBuf,
    pub workers: usize,
    /// Delete each archive after it extracts cleanly.
    pub remove_archives: bool,
}

/// End-of-run counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractSummary {
    pub extracted: u64,
    pub failed: u64,
    pub removed: u64,
}

impl ExtractSummary {
    pub fn had_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Recursively collect `*.zip` files under `dir`, sorted for stable output.
/// `.zip.CHECKSUM` sidecars do not match and are left alone.
pub fn find_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(d) = stack.pop() {
        let entries =
            std::fs::read_dir(&d).with_context(|| format!("read dir {}", d.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                stack.push(path);
            } else if path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
            {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Extract one archive into its parent directory.
fn extract_one(archive: &Path) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("open {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("read zip {}", archive.display()))?;
    let dest = archive.parent().unwrap_or_else(|| Path::new("."));
    zip.extract(dest)
        .with_context(|| format!("extract {}", archive.display()))?;
    Ok(())
}

/// Extract every archive under the download directory with a worker pool.
/// A corrupt archive is a per-task failure and never aborts siblings.
pub fn run_extract(opts: &ExtractOptions) -> Result<ExtractSummary> {
    let archives = find_archives(&opts.download_dir)?;
    let count = archives.len();
    if count == 0 {
        return Ok(ExtractSummary::default());
    }

    let work: Arc<Mutex<VecDeque<PathBuf>>> =
        Arc::new(Mutex::new(archives.into_iter().collect()));
    let (tx, rx) = mpsc::channel::<(PathBuf, Result<bool>)>();
    let num_workers = opts.workers.max(1).min(count);
    let remove_archives = opts.remove_archives;
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        handles.push(std::thread::spawn(move || loop {
            let archive = match work.lock().unwrap().pop_front() {
                Some(p) => p,
                None => break,
            };
            let res = extract_one(&archive).and_then(|()| {
                if remove_archives {
                    std::fs::remove_file(&archive)
                        .with_context(|| format!("remove {}", archive.display()))?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            });
            let _ = tx.send((archive, res));
        }));
    }
    drop(tx);

    let mut summary = ExtractSummary::default();
    for (archive, res) in rx {
        match res {
            Ok(removed) => {
                summary.extracted += 1;
                if removed {
                    summary.removed += 1;
                }
                tracing::debug!(archive = %archive.display(), removed, "extracted");
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(archive = %archive.display(), "extraction failed: {:#}", e);
            }
        }
    }

    for h in handles {
        h.join()
            .map_err(|e| anyhow::anyhow!("extract worker panicked: {:?}", e))?;
    }

    Ok(summary)
}
