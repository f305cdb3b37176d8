//! Disk-backed lookup response cache
//!
//! One JSON blob per ISBN under the cache directory, keyed by the ISBN
//! string exactly as supplied (ISBN-10 and ISBN-13 forms of the same
//! book are distinct entries). Entries never expire; stale data is
//! corrected by deleting the file.

use crate::types::ExternalRecord;
use mcat_common::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key-value persistence seam for lookup responses.
///
/// A miss is not an error; it tells the caller to do a live fetch.
/// The concrete medium (filesystem today) is swappable behind this.
pub trait LookupCache: Send + Sync {
    fn get(&self, isbn: &str) -> Result<Option<ExternalRecord>>;
    fn put(&self, isbn: &str, record: &ExternalRecord) -> Result<()>;
}

/// Filesystem cache: `<dir>/isbn<ISBN>.json`
pub struct FsLookupCache {
    dir: PathBuf,
}

impl FsLookupCache {
    /// Create the cache, ensuring the directory exists
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    fn entry_path(&self, isbn: &str) -> PathBuf {
        self.dir.join(format!("isbn{}.json", isbn))
    }
}

impl LookupCache for FsLookupCache {
    fn get(&self, isbn: &str) -> Result<Option<ExternalRecord>> {
        let path = self.entry_path(isbn);
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&raw) {
            Ok(record) => {
                debug!("Loading ISBN {} from cache file {}", isbn, path.display());
                Ok(Some(record))
            }
            Err(err) => {
                // Unreadable entry: treat as a miss so the live fetch
                // overwrites it on the next put
                warn!(
                    "Ignoring corrupt cache entry {}: {}",
                    path.display(),
                    err
                );
                Ok(None)
            }
        }
    }

    fn put(&self, isbn: &str, record: &ExternalRecord) -> Result<()> {
        let path = self.entry_path(isbn);
        let raw = serde_json::to_string(record)?;
        std::fs::write(&path, raw)?;
        debug!("Writing cache file {}", path.display());
        Ok(())
    }
}

/// Bypass-mode cache: every get misses, every put is a no-op, so a
/// forced-refetch run leaves no cache writes behind.
pub struct DisabledLookupCache;

impl LookupCache for DisabledLookupCache {
    fn get(&self, _isbn: &str) -> Result<Option<ExternalRecord>> {
        Ok(None)
    }

    fn put(&self, _isbn: &str, _record: &ExternalRecord) -> Result<()> {
        Ok(())
    }
}
