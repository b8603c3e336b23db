//! `bvdm checksum` – compute SHA-256 of a file and check its sidecar.

use anyhow::Result;
use bvdm_core::checksum;
use std::path::Path;

/// Compute and print SHA-256 of the given file; when a `.CHECKSUM` sidecar
/// sits next to it, compare and fail on mismatch.
pub fn run_checksum(path: &Path) -> Result<()> {
    let digest = checksum::sha256_path(path)?;
    println!("{}  {}", digest, path.display());

    match checksum::verify_sidecar(path, &digest)? {
        None => {}
        Some(true) => println!("OK: matches {}", checksum::sidecar_path(path).display()),
        Some(false) => anyhow::bail!(
            "checksum mismatch against {}",
            checksum::sidecar_path(path).display()
        ),
    }
    Ok(())
}
