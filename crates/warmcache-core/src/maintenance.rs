//! Explicit, caller-triggered housekeeping.
//!
//! Nothing here runs on its own: expired entries are otherwise only reclaimed
//! when read or flushed, and temp files orphaned by a crashed writer stay until
//! [`sweep_temp_files`] is called.

use std::fs::{self, Metadata};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::store::{FileStore, Lookup};
use crate::{CacheError, Result, TEMP_SUFFIX};

/// Snapshot of what a store holds on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Entry files belonging to the store
    pub entries: usize,
    /// Entries whose expiry has passed but that have not been reclaimed yet
    pub expired: usize,
    /// Entry files that could not be read or parsed
    pub unreadable: usize,
    /// Temp files left behind by interrupted writes
    pub temp_files: usize,
    /// Total size of entry files in bytes
    pub size_bytes: u64,
}

impl CacheStats {
    /// Format size in human-readable form (KB, MB, GB)
    pub fn size_human(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if self.size_bytes >= GB {
            format!("{:.2} GB", self.size_bytes as f64 / GB as f64)
        } else if self.size_bytes >= MB {
            format!("{:.2} MB", self.size_bytes as f64 / MB as f64)
        } else if self.size_bytes >= KB {
            format!("{:.2} KB", self.size_bytes as f64 / KB as f64)
        } else {
            format!("{} B", self.size_bytes)
        }
    }
}

/// Whether `name` looks like a temp file written by [`FileStore`]
pub fn is_temp_file_name(name: &str) -> bool {
    name.ends_with(TEMP_SUFFIX)
        && name.len() > 17
        && name.as_bytes()[16] == b'-'
        && name.as_bytes()[..16].iter().all(|b| b.is_ascii_hexdigit())
}

/// Count entries, dead entries and temp files under the store's directory
pub fn stats(store: &FileStore) -> Result<CacheStats> {
    let now = store.now();
    let mut stats = CacheStats::default();

    walk(&store.directory(), &mut |path, name, meta| {
        if is_temp_file_name(name) {
            stats.temp_files += 1;
        } else if store.is_entry_file_name(name) {
            stats.entries += 1;
            stats.size_bytes += meta.len();
            match store.read_entry(path) {
                Lookup::Found(entry) if entry.is_expired(now) => stats.expired += 1,
                Lookup::Found(_) | Lookup::Missing => {}
                Lookup::Unreadable => stats.unreadable += 1,
            }
        }
        Ok(())
    })?;

    Ok(stats)
}

/// Remove temp files that have not been touched for at least `older_than`.
/// Younger ones may belong to a write still in flight.
pub fn sweep_temp_files(store: &FileStore, older_than: Duration) -> Result<usize> {
    let mut removed = 0;

    walk(&store.directory(), &mut |path, name, meta| {
        if !is_temp_file_name(name) {
            return Ok(());
        }

        let age = meta
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .unwrap_or_default();
        if age < older_than {
            return Ok(());
        }

        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(CacheError::Remove {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
        Ok(())
    })?;

    info!(removed, "Swept orphaned temp files");
    Ok(removed)
}

/// Remove every expired entry now instead of waiting for it to be read
pub fn prune_expired(store: &FileStore) -> Result<usize> {
    let now = store.now();
    let mut removed = 0;

    walk(&store.directory(), &mut |path, name, _meta| {
        if !store.is_entry_file_name(name) {
            return Ok(());
        }
        if let Lookup::Found(entry) = store.read_entry(path) {
            if entry.is_expired(now) {
                store.discard(path);
                removed += 1;
            }
        }
        Ok(())
    })?;

    info!(removed, "Pruned expired entries");
    Ok(removed)
}

type Visitor<'a> = dyn FnMut(&Path, &str, &Metadata) -> Result<()> + 'a;

/// Visit every file under `dir`. A missing `dir` is empty; unreadable paths
/// below it are logged and skipped.
fn walk(dir: &Path, visit: &mut Visitor<'_>) -> Result<()> {
    for item in WalkDir::new(dir).min_depth(1).follow_links(false) {
        let dir_entry = match item {
            Ok(dir_entry) => dir_entry,
            Err(e) if e.depth() == 0 => {
                if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) {
                    return Ok(());
                }
                return Err(CacheError::Io(e.into()));
            }
            Err(e) => {
                warn!(error = %e, "Skipping unreadable path");
                continue;
            }
        };

        if !dir_entry.file_type().is_file() {
            continue;
        }

        let meta = match dir_entry.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %dir_entry.path().display(), error = %e, "Skipping unreadable path");
                continue;
            }
        };
        visit(dir_entry.path(), &dir_entry.file_name().to_string_lossy(), &meta)?;
    }

    Ok(())
}
