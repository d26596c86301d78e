//! Warm-read layer.
//!
//! Keeps already-parsed entries in memory so repeated reads of an unchanged file
//! skip reading and decoding. It is purely an optimization: a store built with
//! [`NoWarmCache`] behaves identically, only slower on hot keys.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use crate::entry::CacheEntry;

/// Identity of a file's contents as seen by `stat`.
///
/// Every write renames a fresh file into place, so on unix the inode changes
/// with each write even when mtime and length don't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
    pub inode: u64,
}

impl FileStamp {
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            modified: meta.modified().ok(),
            len: meta.len(),
            inode: inode_of(meta),
        }
    }
}

#[cfg(unix)]
fn inode_of(meta: &Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn inode_of(_meta: &Metadata) -> u64 {
    0
}

/// Pluggable warm-read capability. Every operation is a no-op when unsupported.
pub trait WarmCache: Send + Sync {
    fn is_enabled(&self) -> bool;

    /// Whether a parsed copy of `path` is currently held
    fn is_warm(&self, path: &Path) -> bool;

    /// Parsed entry for `path`, only if it was recorded against the same stamp
    fn lookup(&self, path: &Path, stamp: FileStamp) -> Option<CacheEntry>;

    fn remember(&self, path: &Path, stamp: FileStamp, entry: &CacheEntry);

    fn invalidate(&self, path: &Path);

    fn reset_all(&self);
}

/// Plain filesystem caching, no in-memory copies
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWarmCache;

impl WarmCache for NoWarmCache {
    fn is_enabled(&self) -> bool {
        false
    }

    fn is_warm(&self, _path: &Path) -> bool {
        false
    }

    fn lookup(&self, _path: &Path, _stamp: FileStamp) -> Option<CacheEntry> {
        None
    }

    fn remember(&self, _path: &Path, _stamp: FileStamp, _entry: &CacheEntry) {}

    fn invalidate(&self, _path: &Path) {}

    fn reset_all(&self) {}
}

/// Default number of parsed entries held before the table is dropped wholesale
pub const DEFAULT_WARM_CAPACITY: usize = 10_000;

/// In-process table of parsed entries keyed by path.
///
/// A hit requires the file's current stamp to equal the one recorded, so a
/// rewrite by another process is picked up on the next read.
#[derive(Debug)]
pub struct MemoryWarmCache {
    entries: Mutex<FxHashMap<PathBuf, (FileStamp, Arc<CacheEntry>)>>,
    capacity: usize,
}

impl MemoryWarmCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WARM_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    fn table(&self) -> MutexGuard<'_, FxHashMap<PathBuf, (FileStamp, Arc<CacheEntry>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryWarmCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WarmCache for MemoryWarmCache {
    fn is_enabled(&self) -> bool {
        true
    }

    fn is_warm(&self, path: &Path) -> bool {
        self.table().contains_key(path)
    }

    fn lookup(&self, path: &Path, stamp: FileStamp) -> Option<CacheEntry> {
        // Without an mtime the stamp can't tell two writes of equal length apart
        stamp.modified?;

        let hit = {
            let table = self.table();
            match table.get(path) {
                Some((recorded, entry)) if *recorded == stamp => Some(Arc::clone(entry)),
                _ => None,
            }
        };

        hit.map(|entry| (*entry).clone())
    }

    fn remember(&self, path: &Path, stamp: FileStamp, entry: &CacheEntry) {
        if stamp.modified.is_none() {
            return;
        }

        let mut table = self.table();
        if table.len() >= self.capacity && !table.contains_key(path) {
            table.clear();
        }
        table.insert(path.to_path_buf(), (stamp, Arc::new(entry.clone())));
    }

    fn invalidate(&self, path: &Path) {
        self.table().remove(path);
    }

    fn reset_all(&self) {
        self.table().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Value;
    use std::time::Duration;

    fn stamp(secs: u64, len: u64) -> FileStamp {
        FileStamp {
            modified: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(secs)),
            len,
            inode: 7,
        }
    }

    #[test]
    fn test_hit_requires_matching_stamp() {
        let warm = MemoryWarmCache::new();
        let path = Path::new("/cache/app-abc");
        let entry = CacheEntry::new(50, Value::Int(1));

        warm.remember(path, stamp(10, 30), &entry);

        assert!(warm.is_warm(path));
        assert_eq!(warm.lookup(path, stamp(10, 30)), Some(entry));
        assert_eq!(warm.lookup(path, stamp(11, 30)), None);
        assert_eq!(warm.lookup(path, stamp(10, 31)), None);
    }

    #[test]
    fn test_invalidate_and_reset() {
        let warm = MemoryWarmCache::new();
        let a = Path::new("/cache/a");
        let b = Path::new("/cache/b");
        let entry = CacheEntry::never_expiring(Value::Null);

        warm.remember(a, stamp(1, 1), &entry);
        warm.remember(b, stamp(1, 1), &entry);

        warm.invalidate(a);
        assert!(!warm.is_warm(a));
        assert!(warm.is_warm(b));

        warm.reset_all();
        assert!(warm.is_empty());
    }

    #[test]
    fn test_missing_mtime_is_never_cached() {
        let warm = MemoryWarmCache::new();
        let path = Path::new("/cache/x");
        let no_mtime = FileStamp {
            modified: None,
            len: 4,
            inode: 7,
        };

        warm.remember(path, no_mtime, &CacheEntry::never_expiring(Value::Null));
        assert!(!warm.is_warm(path));
        assert_eq!(warm.lookup(path, no_mtime), None);
    }

    #[test]
    fn test_capacity_drops_table_when_full() {
        let warm = MemoryWarmCache::with_capacity(2);
        let entry = CacheEntry::never_expiring(Value::Null);

        warm.remember(Path::new("/a"), stamp(1, 1), &entry);
        warm.remember(Path::new("/b"), stamp(1, 1), &entry);
        warm.remember(Path::new("/c"), stamp(1, 1), &entry);

        assert_eq!(warm.len(), 1);
        assert!(warm.is_warm(Path::new("/c")));
    }

    #[test]
    fn test_no_warm_cache_is_inert() {
        let warm = NoWarmCache;
        let path = Path::new("/cache/x");

        warm.remember(path, stamp(1, 1), &CacheEntry::never_expiring(Value::Null));
        assert!(!warm.is_enabled());
        assert!(!warm.is_warm(path));
        assert_eq!(warm.lookup(path, stamp(1, 1)), None);
    }
}
