//! A throwaway store on a temp directory with a controllable clock

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

use warmcache_core::{FileStore, ManualClock, Repository, WarmCache};

use crate::mocks::RecordingWarmCache;

/// Fixed starting time so expiries in tests are predictable
pub const TEST_EPOCH: u64 = 1_700_000_000;

pub struct TestCache {
    pub dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub warm: Arc<RecordingWarmCache>,
    pub store: FileStore,
}

impl TestCache {
    pub fn new() -> Self {
        Self::with_prefix("test")
    }

    pub fn with_prefix(prefix: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let clock = Arc::new(ManualClock::new(TEST_EPOCH));
        let warm = RecordingWarmCache::new();
        let store = FileStore::with_dependencies(
            dir.path(),
            prefix,
            warm.clone() as Arc<dyn WarmCache>,
            clock.clone(),
        );

        Self {
            dir,
            clock,
            warm,
            store,
        }
    }

    /// Another store over the same directory and clock but with its own warm
    /// layer, standing in for a second process
    pub fn second_process(&self) -> FileStore {
        FileStore::with_dependencies(
            self.dir.path(),
            self.store.prefix(),
            RecordingWarmCache::new(),
            self.clock.clone(),
        )
    }

    pub fn repository(&self) -> Repository {
        Repository::new(self.store.clone())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of regular files anywhere under the cache directory
    pub fn file_count(&self) -> usize {
        count_files(self.dir.path())
    }
}

impl Default for TestCache {
    fn default() -> Self {
        Self::new()
    }
}

fn count_files(dir: &Path) -> usize {
    WalkDir::new(dir)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file())
        .count()
}
