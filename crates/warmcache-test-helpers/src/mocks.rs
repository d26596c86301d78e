//! Mock implementations for testing

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use warmcache_core::warm::FileStamp;
use warmcache_core::{CacheEntry, MemoryWarmCache, WarmCache};

/// A warm layer that behaves like [`MemoryWarmCache`] and records every call
#[derive(Debug, Default)]
pub struct RecordingWarmCache {
    inner: MemoryWarmCache,
    hits: AtomicUsize,
    misses: AtomicUsize,
    resets: AtomicUsize,
    invalidated: Mutex<Vec<PathBuf>>,
}

impl RecordingWarmCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn invalidated(&self) -> Vec<PathBuf> {
        self.invalidated.lock().unwrap().clone()
    }

    pub fn held(&self) -> usize {
        self.inner.len()
    }
}

impl WarmCache for RecordingWarmCache {
    fn is_enabled(&self) -> bool {
        true
    }

    fn is_warm(&self, path: &Path) -> bool {
        self.inner.is_warm(path)
    }

    fn lookup(&self, path: &Path, stamp: FileStamp) -> Option<CacheEntry> {
        let found = self.inner.lookup(path, stamp);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::SeqCst);
        } else {
            self.misses.fetch_add(1, Ordering::SeqCst);
        }
        found
    }

    fn remember(&self, path: &Path, stamp: FileStamp, entry: &CacheEntry) {
        self.inner.remember(path, stamp, entry);
    }

    fn invalidate(&self, path: &Path) {
        self.invalidated.lock().unwrap().push(path.to_path_buf());
        self.inner.invalidate(path);
    }

    fn reset_all(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.inner.reset_all();
    }
}

/// A warm layer that claims every path is warm but never serves anything.
/// Useful to check that a stale "warm" answer alone never blocks a write.
#[derive(Debug, Default)]
pub struct AlwaysWarm;

impl WarmCache for AlwaysWarm {
    fn is_enabled(&self) -> bool {
        true
    }

    fn is_warm(&self, _path: &Path) -> bool {
        true
    }

    fn lookup(&self, _path: &Path, _stamp: FileStamp) -> Option<CacheEntry> {
        None
    }

    fn remember(&self, _path: &Path, _stamp: FileStamp, _entry: &CacheEntry) {}

    fn invalidate(&self, _path: &Path) {}

    fn reset_all(&self) {}
}
