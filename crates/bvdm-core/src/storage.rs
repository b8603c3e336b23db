//! Disk I/O and file lifecycle for streamed downloads.
//!
//! Archives stream into a `.part` temp file and are moved into place with an
//! atomic rename, so a crashed or failed download never leaves a partial
//! file at the final path.

use std::fs::File;
use std::io;
#[cfg(unix)]
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Writer for one in-flight archive. Cloneable so the curl write callback can
/// own a handle; writes are positioned, so clones never race on a cursor.
#[derive(Clone)]
pub struct ArchiveWriter {
    file: Arc<File>,
    temp_path: PathBuf,
}

impl ArchiveWriter {
    /// Create the temp file at `temp_path`, truncating any leftover from a
    /// previous failed run.
    pub fn create(temp_path: &Path) -> io::Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)?;
        Ok(ArchiveWriter {
            file: Arc::new(file),
            temp_path: temp_path.to_path_buf(),
        })
    }

    /// Write `data` at `offset` without moving a shared cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Non-Unix fallback: seek + write on a cloned handle.
    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = self.file.try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)
    }

    /// Sync file data to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> io::Result<()> {
        self.file.sync_all()
    }

    /// Path to the current temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically rename the temp file to the final path. Consumes the writer
    /// and closes the file first.
    pub fn finalize(self, final_path: &Path) -> io::Result<()> {
        let temp_path = self.temp_path.clone();
        drop(self.file);
        std::fs::rename(&temp_path, final_path)
    }

    /// Remove the temp file after a failed download. Best effort; the next
    /// attempt truncates anyway.
    pub fn discard(self) {
        let temp_path = self.temp_path.clone();
        drop(self.file);
        if let Err(e) = std::fs::remove_file(&temp_path) {
            tracing::debug!("could not remove {}: {}", temp_path.display(), e);
        }
    }
}
