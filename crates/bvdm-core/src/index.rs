//! The persisted path index: every archive key a crawl discovered.
//!
//! Stored as one key per line under the crawl's save directory; the fetcher
//! is its only consumer. A set, not a sequence: crawl worker ordering never
//! shows up in the output.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::storage;

/// File name of the persisted index inside the save/data directory.
pub const INDEX_FILE_NAME: &str = "path-index.txt";

/// True when `key` names a data archive. The endpoint publishes
/// `<name>.zip.CHECKSUM` sidecars next to each archive; those are not data.
pub fn is_archive_key(key: &str) -> bool {
    key.ends_with(".zip")
}

/// True when `key` belongs to the given year/month.
///
/// Matches the `YYYY-MM` date stamp embedded in archive file names
/// (e.g. `BTCUSDT-1h-2024-01.zip`) as well as `YYYY/MM` path segment pairs.
pub fn matches_month(key: &str, year: u16, month: u8) -> bool {
    let stamp = format!("{:04}-{:02}", year, month);
    if key.contains(&stamp) {
        return true;
    }
    let y = format!("{:04}", year);
    let m = format!("{:02}", month);
    let segments: Vec<&str> = key.split('/').collect();
    segments.windows(2).any(|w| w[0] == y && w[1] == m)
}

/// Extract the `YYYY-MM` stamp a key belongs to, if any.
///
/// Prefers the date stamp in the file name; falls back to a `YYYY/MM`
/// segment pair. Used for the per-month status breakdown.
pub fn month_stamp(key: &str) -> Option<String> {
    let b = key.as_bytes();
    if b.len() >= 7 {
        for i in 0..=b.len() - 7 {
            let w = &b[i..i + 7];
            let shaped = w[..4].iter().all(u8::is_ascii_digit)
                && w[4] == b'-'
                && w[5..].iter().all(u8::is_ascii_digit);
            let bounded = (i == 0 || !b[i - 1].is_ascii_digit())
                && (i + 7 == b.len() || !b[i + 7].is_ascii_digit());
            if shaped && bounded {
                return Some(String::from_utf8_lossy(w).into_owned());
            }
        }
    }
    let segments: Vec<&str> = key.split('/').collect();
    for w in segments.windows(2) {
        if w[0].len() == 4
            && w[0].bytes().all(|c| c.is_ascii_digit())
            && w[1].len() == 2
            && w[1].bytes().all(|c| c.is_ascii_digit())
        {
            return Some(format!("{}-{}", w[0], w[1]));
        }
    }
    None
}

/// Ordered set of discovered archive keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathIndex {
    keys: BTreeSet<String>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key; returns false if it was already present.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.keys.insert(key.into())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Keys matching the optional year/month filter; `None` means all.
    pub fn keys_for_month(&self, filter: Option<(u16, u8)>) -> Vec<String> {
        match filter {
            None => self.keys.iter().cloned().collect(),
            Some((year, month)) => self
                .keys
                .iter()
                .filter(|k| matches_month(k, year, month))
                .cloned()
                .collect(),
        }
    }

    /// Count of keys per `YYYY-MM` stamp; keys with no stamp land under `-`.
    pub fn month_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for key in &self.keys {
            let stamp = month_stamp(key).unwrap_or_else(|| "-".to_string());
            *counts.entry(stamp).or_insert(0) += 1;
        }
        counts
    }

    /// Path of the index file inside `dir`.
    pub fn index_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILE_NAME)
    }

    /// Write the index to `dir`, one key per line, replacing any previous
    /// index atomically (write to temp, then rename). Returns the file path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("create save dir {}", dir.display()))?;
        let path = Self::index_path(dir);
        let tmp = storage::temp_path(&path);

        let mut contents = String::new();
        for key in &self.keys {
            contents.push_str(key);
            contents.push('\n');
        }
        fs::write(&tmp, contents)
            .with_context(|| format!("write index temp file {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("rename index into place at {}", path.display()))?;
        Ok(path)
    }

    /// Load the index from `dir`. Blank lines are tolerated.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::index_path(dir);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("read path index {}", path.display()))?;
        let mut index = PathIndex::new();
        for line in data.lines() {
            let line = line.trim();
            if !line.is_empty() {
                index.insert(line);
            }
        }
        Ok(index)
    }
}
