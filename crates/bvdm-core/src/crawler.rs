//! Depth-bounded parallel crawl of the remote directory tree.
//!
//! An explicit worklist of pending directory prefixes feeds up to `workers`
//! blocking listing fetches at a time; completed listings feed child
//! directories back into the worklist and archive keys into the index. The
//! crawl is done when the worklist is empty and nothing is in flight.

use anyhow::Result;
use std::collections::{HashSet, VecDeque};
use tokio::task::JoinSet;

use crate::config::BvdmConfig;
use crate::index::{self, PathIndex};
use crate::listing;

/// Crawl parameters. `max_depth` counts hops from the start prefix: 0 lists
/// only the start directory itself.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub start_prefix: String,
    pub max_depth: u32,
    pub workers: usize,
    /// Record every listed key instead of data archives only.
    pub record_all_files: bool,
}

/// What a crawl produced and what it cost.
#[derive(Debug)]
pub struct CrawlOutcome {
    pub index: PathIndex,
    /// Directories listed successfully.
    pub listed_dirs: u64,
    /// Directories that failed past the retry budget and were skipped.
    pub failed_dirs: u64,
}

/// One pending directory node.
#[derive(Debug)]
struct DirTask {
    prefix: String,
    depth: u32,
}

/// Walk the tree under `opts.start_prefix` and accumulate archive keys.
///
/// A node that fails past the retry budget is logged and counted; the rest of
/// the tree is still crawled. Worker ordering never affects the result set.
pub async fn crawl(cfg: &BvdmConfig, opts: &CrawlOptions) -> Result<CrawlOutcome> {
    let policy = cfg.retry_policy();
    let workers = opts.workers.max(1);

    let mut pending: VecDeque<DirTask> = VecDeque::new();
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(opts.start_prefix.clone());
    pending.push_back(DirTask {
        prefix: opts.start_prefix.clone(),
        depth: 0,
    });

    let mut join_set = JoinSet::new();
    let mut index = PathIndex::new();
    let mut listed_dirs = 0u64;
    let mut failed_dirs = 0u64;

    loop {
        while join_set.len() < workers {
            let Some(task) = pending.pop_front() else {
                break;
            };
            let cfg = cfg.clone();
            join_set.spawn_blocking(move || {
                let outcome = listing::list_directory(&cfg, &policy, &task.prefix);
                (task, outcome)
            });
        }

        if join_set.is_empty() {
            break;
        }

        let Some(joined) = join_set.join_next().await else {
            break;
        };
        let (task, outcome) = joined.map_err(|e| anyhow::anyhow!("crawl worker join: {}", e))?;

        match outcome {
            Ok(dir) => {
                listed_dirs += 1;
                tracing::debug!(
                    prefix = %task.prefix,
                    depth = task.depth,
                    dirs = dir.prefixes.len(),
                    files = dir.keys.len(),
                    "listed directory"
                );
                for key in dir.keys {
                    if opts.record_all_files || index::is_archive_key(&key) {
                        index.insert(key);
                    }
                }
                if task.depth < opts.max_depth {
                    for prefix in dir.prefixes {
                        if seen.insert(prefix.clone()) {
                            pending.push_back(DirTask {
                                prefix,
                                depth: task.depth + 1,
                            });
                        }
                    }
                }
            }
            Err(e) => {
                failed_dirs += 1;
                tracing::warn!(prefix = %task.prefix, "listing failed: {}", e);
            }
        }
    }

    Ok(CrawlOutcome {
        index,
        listed_dirs,
        failed_dirs,
    })
}
