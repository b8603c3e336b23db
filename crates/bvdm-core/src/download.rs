//! Single-stream archive download.
//!
//! GETs one key from the file endpoint and streams the body into a `.part`
//! temp file, finalized by atomic rename. The destination is trusted to be
//! complete when it exists non-empty, so reruns skip without a request.

use crate::config::BvdmConfig;
use crate::retry::{run_with_retry, RetryPolicy, TransferError};
use crate::storage::{self, ArchiveWriter};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Outcome of one fetch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Streamed from the remote; payload size in bytes.
    Downloaded(u64),
    /// Destination already present and non-empty; no request made.
    Skipped,
}

/// Download URL for an archive key. The configured base ends with `/`.
pub fn file_url(cfg: &BvdmConfig, key: &str) -> String {
    format!("{}{}", cfg.file_base_url, key)
}

/// Fetch one archive to `destination`, retrying per `policy`.
///
/// A non-2xx response (including 404 on an indexed key) is an error, never a
/// silent skip. A failed task leaves no partial file behind.
pub fn fetch_archive(
    cfg: &BvdmConfig,
    policy: &RetryPolicy,
    key: &str,
    destination: &Path,
) -> Result<FetchStatus, TransferError> {
    if let Ok(meta) = std::fs::metadata(destination) {
        if meta.is_file() && meta.len() > 0 {
            return Ok(FetchStatus::Skipped);
        }
    }
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(TransferError::Storage)?;
    }

    let url = file_url(cfg, key);
    let written = run_with_retry(policy, || download_once(cfg, &url, destination))?;
    Ok(FetchStatus::Downloaded(written))
}

/// One attempt: stream to the temp file, then rename into place.
fn download_once(cfg: &BvdmConfig, url: &str, destination: &Path) -> Result<u64, TransferError> {
    let tmp = storage::temp_path(destination);
    let writer = ArchiveWriter::create(&tmp).map_err(TransferError::Storage)?;
    match stream_to(cfg, url, &writer) {
        Ok(written) => {
            writer.sync().map_err(TransferError::Storage)?;
            writer.finalize(destination).map_err(TransferError::Storage)?;
            Ok(written)
        }
        Err(e) => {
            writer.discard();
            Err(e)
        }
    }
}

fn stream_to(cfg: &BvdmConfig, url: &str, writer: &ArchiveWriter) -> Result<u64, TransferError> {
    let offset = Arc::new(AtomicU64::new(0));
    let offset_cb = Arc::clone(&offset);
    let write_error: Arc<Mutex<Option<io::Error>>> = Arc::new(Mutex::new(None));
    let write_error_cb = Arc::clone(&write_error);
    let writer_cb = writer.clone();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.useragent(&cfg.user_agent)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(cfg.download_connect_timeout_secs))?;
    // Abort when throughput drops below 1 KiB/s for 60s; hard cap at 1 hour
    // so a completely stuck transfer eventually fails.
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.timeout(Duration::from_secs(3600))?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(move |data| {
            let off = offset_cb.fetch_add(data.len() as u64, Ordering::Relaxed);
            match writer_cb.write_at(off, data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    let _ = write_error_cb.lock().unwrap().replace(e);
                    Ok(0) // abort the transfer
                }
            }
        })?;
        if let Err(e) = transfer.perform() {
            if e.is_write_error() {
                if let Some(io_err) = write_error.lock().unwrap().take() {
                    return Err(TransferError::Storage(io_err));
                }
            }
            return Err(TransferError::Curl(e));
        }
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }

    Ok(offset.load(Ordering::Relaxed))
}
