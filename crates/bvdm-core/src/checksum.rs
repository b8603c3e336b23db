//! Archive checksums.
//!
//! The endpoint publishes a `<name>.zip.CHECKSUM` sidecar next to each
//! archive. This module computes SHA-256 on demand (off the download hot
//! path) and compares against a locally downloaded sidecar.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const BUF_SIZE: usize = 64 * 1024;

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    Ok(hex::encode(digest))
}

/// Sidecar path as published by the endpoint: `<file>.CHECKSUM`.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(".CHECKSUM");
    PathBuf::from(o)
}

/// Compare `digest` against the archive's sidecar, if one is present.
///
/// Returns `None` when there is no sidecar, `Some(matches)` otherwise. The
/// sidecar format is `<hex>  <filename>`; only the first token is read.
pub fn verify_sidecar(path: &Path, digest: &str) -> Result<Option<bool>> {
    let sidecar = sidecar_path(path);
    if !sidecar.exists() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&sidecar)
        .with_context(|| format!("read sidecar {}", sidecar.display()))?;
    let expected = text.split_whitespace().next().unwrap_or("");
    Ok(Some(expected.eq_ignore_ascii_case(digest)))
}
