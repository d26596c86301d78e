use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::clock::{Clock, SystemClock};
use crate::codec::Value;
use crate::config::CacheConfig;
use crate::entry::{expiry_for, CacheEntry, NEVER_EXPIRES};
use crate::hash::{fast_hash, fingerprint, slugify};
use crate::repository::Repository;
use crate::stampede::StampedeGuard;
use crate::tags::TagSet;
use crate::warm::{FileStamp, MemoryWarmCache, NoWarmCache, WarmCache};

use super::{CacheError, Result, DEFAULT_PREFIX, TEMP_SUFFIX};

/// Outcome of reading an entry file without acting on its expiry
#[derive(Debug)]
pub(crate) enum Lookup {
    Missing,
    Unreadable,
    Found(CacheEntry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Replace,
    CreateNew,
}

/// File-backed cache store.
///
/// Each key lives in its own file, `<directory>/<prefix>-<fingerprint>`, holding
/// the absolute expiry and the encoded value. Every write goes through a temp
/// file in the same directory followed by a rename, so readers see either the
/// old or the new entry, never a torn one.
///
/// Cloning is cheap; clones share the warm-read layer and clock.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    prefix: String,
    scope: Option<String>,
    warm: Arc<dyn WarmCache>,
    clock: Arc<dyn Clock>,
    guard: StampedeGuard,
}

impl FileStore {
    /// Create a store with no warm-read layer and the system clock
    pub fn new(root: impl Into<PathBuf>, prefix: &str) -> Self {
        Self::with_dependencies(root, prefix, Arc::new(NoWarmCache), Arc::new(SystemClock))
    }

    /// Create a store with custom dependencies (warm layer, clock)
    pub fn with_dependencies(
        root: impl Into<PathBuf>,
        prefix: &str,
        warm: Arc<dyn WarmCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut prefix = slugify(prefix);
        if prefix.is_empty() {
            prefix = DEFAULT_PREFIX.to_string();
        }

        Self {
            root: root.into(),
            prefix,
            scope: None,
            warm,
            clock,
            guard: StampedeGuard::default(),
        }
    }

    /// Stampede window handed to repositories built on this store
    pub fn with_guard(mut self, guard: StampedeGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Build a store from configuration
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let directory = config.resolve_directory();
        if directory.as_os_str().is_empty() {
            return Err(CacheError::Config("cache directory is empty".to_string()));
        }

        let warm: Arc<dyn WarmCache> = if config.acceleration {
            Arc::new(MemoryWarmCache::with_capacity(config.warm_capacity))
        } else {
            info!("Warm-read acceleration disabled, serving every read from disk");
            Arc::new(NoWarmCache)
        };

        let store = Self::with_dependencies(
            directory,
            &config.resolve_prefix(),
            warm,
            Arc::new(SystemClock),
        )
        .with_guard(StampedeGuard::new(Duration::from_secs(
            config.stampede_window_secs,
        )));

        debug!(
            directory = %store.root.display(),
            prefix = %store.prefix,
            "Opened file cache store"
        );
        Ok(store)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Base directory for untagged entries
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Partition segment this view is confined to, if any
    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Directory entries of this view are written to
    pub fn directory(&self) -> PathBuf {
        match &self.scope {
            Some(segment) => self.root.join(segment),
            None => self.root.clone(),
        }
    }

    /// `<directory>/<prefix>`, the common stem of every entry path
    pub fn prefix_path(&self) -> PathBuf {
        self.directory().join(&self.prefix)
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.directory()
            .join(format!("{}-{}", self.prefix, fingerprint(key)))
    }

    /// Whether file names in this store's directories belong to it
    pub fn is_entry_file_name(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .map(|digest| digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit()))
            .unwrap_or(false)
    }

    pub fn acceleration_enabled(&self) -> bool {
        self.warm.is_enabled()
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    pub fn guard(&self) -> StampedeGuard {
        self.guard
    }

    /// A view of this store confined to the partition of `names`
    pub fn tags<I, S>(&self, names: I) -> Repository
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Repository::tagged(self.clone(), TagSet::new(names), self.guard)
    }

    pub(crate) fn scoped(&self, tags: &TagSet) -> Self {
        let mut view = self.clone();
        view.scope = tags.segment();
        view
    }

    /// Retrieve an item. Missing, corrupt and expired entries all read as `None`;
    /// an expired entry is deleted on the way out.
    pub fn get(&self, key: &str) -> Option<Value> {
        let path = self.entry_path(key);

        match self.read_entry(&path) {
            Lookup::Found(entry) if entry.is_expired(self.now()) => {
                debug!(key, "Cache entry expired");
                self.discard(&path);
                None
            }
            Lookup::Found(entry) => {
                debug!(key, "Cache hit");
                Some(entry.value)
            }
            Lookup::Missing | Lookup::Unreadable => {
                debug!(key, "Cache miss");
                None
            }
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Retrieve several items, keeping the order the keys were given in
    pub fn many<I, K>(&self, keys: I) -> IndexMap<String, Option<Value>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), self.get(key))
            })
            .collect()
    }

    /// Store an item for `ttl`. A zero ttl stores it forever.
    pub fn put(&self, key: &str, value: impl Into<Value>, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(expiry_for(self.now(), ttl), value.into());
        self.write_entry(key, &entry, WriteMode::Replace)?;
        Ok(())
    }

    /// Store several items with the same ttl, stopping at the first failure
    pub fn put_many<I, K, V>(&self, items: I, ttl: Duration) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in items {
            self.put(key.as_ref(), value, ttl)?;
        }
        Ok(())
    }

    /// Store an item only if no live entry exists for `key`.
    ///
    /// Returns `false` without writing when one does. The final write refuses to
    /// replace a file that appeared in the meantime, so of two racing adders at
    /// most one sees `true` for a key that was absent.
    pub fn add(&self, key: &str, value: impl Into<Value>, ttl: Duration) -> Result<bool> {
        let path = self.entry_path(key);

        if self.warm.is_warm(&path) || path.exists() {
            match self.read_entry(&path) {
                Lookup::Found(entry) if !entry.is_expired(self.now()) => return Ok(false),
                Lookup::Missing => {}
                // Expired or unreadable leftovers don't count as present
                Lookup::Found(_) | Lookup::Unreadable => self.discard(&path),
            }
        }

        let entry = CacheEntry::new(expiry_for(self.now(), ttl), value.into());
        self.write_entry(key, &entry, WriteMode::CreateNew)
    }

    /// Add `delta` to a counter and return the new value.
    ///
    /// A missing or non-numeric value counts as zero. The entry keeps its current
    /// expiry; a new counter never expires. This is a read-modify-write with no
    /// lock: concurrent increments of the same key can lose updates.
    pub fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        let path = self.entry_path(key);
        let now = self.now();

        let (current, expires_at) = match self.read_entry(&path) {
            Lookup::Found(entry) if !entry.is_expired(now) => {
                (entry.value.as_counter(), entry.expires_at)
            }
            _ => (0, NEVER_EXPIRES),
        };

        let next = current.saturating_add(delta);
        self.write_entry(
            key,
            &CacheEntry::new(expires_at, Value::Int(next)),
            WriteMode::Replace,
        )?;

        debug!(key, value = next, "Counter updated");
        Ok(next)
    }

    pub fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.increment(key, delta.saturating_neg())
    }

    /// Store an item that never expires
    pub fn forever(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.put(key, value, Duration::ZERO)
    }

    /// Remove an item. `Ok(false)` means there was nothing to remove.
    pub fn forget(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key);
        self.warm.invalidate(&path);

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "Cache entry removed");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Remove { path, source }),
        }
    }

    /// Retrieve an item and remove it
    pub fn pull(&self, key: &str) -> Result<Option<Value>> {
        let value = self.get(key);
        if value.is_some() {
            self.forget(key)?;
        }
        Ok(value)
    }

    /// Push back the expiry of an existing entry by `extra`, keeping its value.
    /// Returns `false` when there is no readable entry to extend.
    pub fn extend_expiration(&self, key: &str, extra: Duration) -> Result<bool> {
        let path = self.entry_path(key);

        match self.read_entry(&path) {
            Lookup::Found(entry) => {
                self.write_entry(key, &entry.extended(extra), WriteMode::Replace)?;
                Ok(true)
            }
            Lookup::Missing | Lookup::Unreadable => Ok(false),
        }
    }

    /// Remove every entry of this store under its directory, recursively.
    ///
    /// Subdirectories this flush empties are removed too; directories that
    /// were already empty, and the root itself, are kept. Temp files and files
    /// of other prefixes are left alone. Returns the number of entries
    /// removed; the first failure is reported after the walk finishes.
    pub fn flush(&self) -> Result<usize> {
        let dir = self.directory();
        let mut removed = 0;
        let mut first_error = None;
        let mut emptied: FxHashSet<PathBuf> = FxHashSet::default();

        // Children come before their directory, so a directory is only
        // considered once everything under it has been handled
        for item in WalkDir::new(&dir)
            .min_depth(1)
            .follow_links(false)
            .contents_first(true)
        {
            let dir_entry = match item {
                Ok(dir_entry) => dir_entry,
                Err(e) => {
                    let missing = e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound);
                    if e.depth() == 0 && missing {
                        break;
                    }
                    if !missing {
                        warn!(error = %e, "Failed to walk cache directory");
                        first_error.get_or_insert(CacheError::Io(e.into()));
                    }
                    continue;
                }
            };
            let path = dir_entry.path();

            if dir_entry.file_type().is_dir() {
                // Fails harmlessly while foreign files remain
                if emptied.contains(path) && fs::remove_dir(path).is_ok() {
                    debug!(directory = %path.display(), "Removed emptied cache directory");
                }
                continue;
            }

            if !self.is_entry_file_name(&dir_entry.file_name().to_string_lossy()) {
                continue;
            }

            self.warm.invalidate(path);
            match fs::remove_file(path) {
                Ok(()) => {
                    removed += 1;
                    emptied.extend(
                        path.ancestors()
                            .skip(1)
                            .take_while(|parent| *parent != dir.as_path())
                            .map(Path::to_path_buf),
                    );
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    warn!(path = %path.display(), error = %source, "Failed to remove cache entry");
                    first_error.get_or_insert(CacheError::Remove {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }

        match &self.scope {
            Some(_) => {
                // Partition directory goes too once it is empty
                let _ = fs::remove_dir(&dir);
            }
            None => self.warm.reset_all(),
        }

        info!(
            directory = %dir.display(),
            removed,
            "Cache flushed"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// Read and parse an entry file, going through the warm layer.
    pub(crate) fn read_entry(&self, path: &Path) -> Lookup {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Lookup::Missing,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat cache entry");
                return Lookup::Unreadable;
            }
        };

        let stamp = FileStamp::from_metadata(&meta);
        if let Some(entry) = self.warm.lookup(path, stamp) {
            return Lookup::Found(entry);
        }

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Lookup::Missing,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                return Lookup::Unreadable;
            }
        };

        match CacheEntry::from_text(&text) {
            Ok(entry) => {
                self.warm.remember(path, stamp, &entry);
                Lookup::Found(entry)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupted cache entry, treating as miss");
                self.warm.invalidate(path);
                Lookup::Unreadable
            }
        }
    }

    /// Non-reaping lookup by key
    pub(crate) fn lookup(&self, key: &str) -> Lookup {
        self.read_entry(&self.entry_path(key))
    }

    /// Overwrite the entry for `key` as given
    pub(crate) fn write(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        self.write_entry(key, entry, WriteMode::Replace)?;
        Ok(())
    }

    /// Write through a temp file in the same directory, then rename into place.
    /// `CreateNew` refuses to replace an existing file and reports `false` instead.
    fn write_entry(&self, key: &str, entry: &CacheEntry, mode: WriteMode) -> Result<bool> {
        let dir = self.directory();
        fs::create_dir_all(&dir)?;

        let text = entry.to_text()?;
        let path = self.entry_path(key);

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{}-", fast_hash(key)))
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        // On failure the temp file is dropped and removed with the error
        let persisted = match mode {
            WriteMode::Replace => tmp.persist(&path),
            WriteMode::CreateNew => tmp.persist_noclobber(&path),
        };

        match persisted {
            Ok(_) => {}
            Err(e) if mode == WriteMode::CreateNew && e.error.kind() == ErrorKind::AlreadyExists => {
                debug!(key, "Cache entry already present, not replaced");
                return Ok(false);
            }
            Err(e) => return Err(CacheError::Io(e.error)),
        }

        self.warm.invalidate(&path);
        debug!(key, expires_at = entry.expires_at, "Cache entry written");
        Ok(true)
    }

    /// Best-effort delete of a dead entry
    pub(crate) fn discard(&self, path: &Path) {
        self.warm.invalidate(path);
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to remove dead cache entry");
            }
        }
    }
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileStore")
            .field("root", &self.root)
            .field("prefix", &self.prefix)
            .field("scope", &self.scope)
            .field("acceleration", &self.warm.is_enabled())
            .field("guard", &self.guard)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use tempfile::TempDir;

    fn make_store(dir: &TempDir) -> (FileStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = FileStore::with_dependencies(
            dir.path(),
            "test",
            Arc::new(MemoryWarmCache::new()),
            clock.clone(),
        );
        (store, clock)
    }

    #[test]
    fn test_store_creation() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "My App");

        assert_eq!(store.prefix(), "my-app");
        assert_eq!(store.prefix_path(), temp_dir.path().join("my-app"));
        assert!(!store.acceleration_enabled());
    }

    #[test]
    fn test_empty_prefix_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path(), "!!!");
        assert_eq!(store.prefix(), DEFAULT_PREFIX);
    }

    #[test]
    fn test_entry_path_layout() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        let path = store.entry_path("users:1");
        let name = path.file_name().unwrap().to_string_lossy().to_string();

        assert_eq!(path.parent().unwrap(), temp_dir.path());
        assert_eq!(name, format!("test-{}", fingerprint("users:1")));
        assert!(store.is_entry_file_name(&name));
        assert!(!store.is_entry_file_name("test-abc"));
        assert!(!store.is_entry_file_name("other-0000"));
    }

    #[test]
    fn test_put_then_get() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        store.put("greeting", "hello", Duration::from_secs(60)).unwrap();
        assert_eq!(store.get("greeting"), Some(Value::from("hello")));
    }

    #[test]
    fn test_get_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);
        assert_eq!(store.get("nope"), None);
    }

    #[test]
    fn test_expired_entry_is_removed_on_read() {
        let temp_dir = TempDir::new().unwrap();
        let (store, clock) = make_store(&temp_dir);

        store.put("short", 1, Duration::from_secs(10)).unwrap();
        clock.advance(10);
        assert_eq!(store.get("short"), Some(Value::Int(1)));

        clock.advance(1);
        assert_eq!(store.get("short"), None);
        assert!(!store.entry_path("short").exists());
    }

    #[test]
    fn test_overwrite_is_seen_through_warm_layer() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        store.forever("k", "first").unwrap();
        assert_eq!(store.get("k"), Some(Value::from("first")));

        store.forever("k", "second").unwrap();
        assert_eq!(store.get("k"), Some(Value::from("second")));
    }

    #[test]
    fn test_add_is_exclusive() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        assert!(store.add("lock", "v1", Duration::from_secs(60)).unwrap());
        assert!(!store.add("lock", "v2", Duration::from_secs(60)).unwrap());
        assert_eq!(store.get("lock"), Some(Value::from("v1")));
    }

    #[test]
    fn test_add_replaces_expired_entry() {
        let temp_dir = TempDir::new().unwrap();
        let (store, clock) = make_store(&temp_dir);

        store.put("lock", "old", Duration::from_secs(5)).unwrap();
        clock.advance(6);

        assert!(store.add("lock", "new", Duration::from_secs(5)).unwrap());
        assert_eq!(store.get("lock"), Some(Value::from("new")));
    }

    #[test]
    fn test_increment_keeps_expiry() {
        let temp_dir = TempDir::new().unwrap();
        let (store, clock) = make_store(&temp_dir);

        store.put("hits", 10, Duration::from_secs(120)).unwrap();
        assert_eq!(store.increment("hits", 5).unwrap(), 15);

        match store.lookup("hits") {
            Lookup::Found(entry) => assert_eq!(entry.expires_at, clock.now() + 120),
            other => panic!("expected entry, got {:?}", other),
        }
    }

    #[test]
    fn test_increment_saturates() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        store.forever("big", i64::MAX).unwrap();
        assert_eq!(store.increment("big", 1).unwrap(), i64::MAX);
        assert_eq!(store.decrement("missing", i64::MIN).unwrap(), i64::MAX);
    }

    #[test]
    fn test_forget_reports_presence() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        store.forever("k", 1).unwrap();
        assert!(store.forget("k").unwrap());
        assert!(!store.forget("k").unwrap());
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_pull() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        store.forever("once", "token").unwrap();
        assert_eq!(store.pull("once").unwrap(), Some(Value::from("token")));
        assert_eq!(store.pull("once").unwrap(), None);
    }

    #[test]
    fn test_extend_expiration() {
        let temp_dir = TempDir::new().unwrap();
        let (store, clock) = make_store(&temp_dir);

        store.put("k", "v", Duration::from_secs(2)).unwrap();
        assert!(store.extend_expiration("k", Duration::from_secs(10)).unwrap());

        clock.advance(11);
        assert_eq!(store.get("k"), Some(Value::from("v")));
        clock.advance(2);
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_extend_missing_is_false() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        assert!(!store.extend_expiration("ghost", Duration::from_secs(10)).unwrap());
        assert!(!store.entry_path("ghost").exists());
    }

    #[test]
    fn test_many_and_put_many() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        store
            .put_many(vec![("a", 1), ("b", 2)], Duration::from_secs(60))
            .unwrap();

        let values = store.many(["b", "a", "c"]);
        let keys: Vec<_> = values.keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(values["a"], Some(Value::Int(1)));
        assert_eq!(values["c"], None);
    }

    #[test]
    fn test_flush_leaves_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);
        let other = FileStore::new(temp_dir.path(), "other");

        store.forever("a", 1).unwrap();
        store.forever("b", 2).unwrap();
        other.forever("a", 3).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "keep me").unwrap();

        assert_eq!(store.flush().unwrap(), 2);
        assert_eq!(store.get("a"), None);
        assert_eq!(other.get("a"), Some(Value::Int(3)));
        assert!(temp_dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_flush_missing_directory_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("never-created"), "test");
        assert_eq!(store.flush().unwrap(), 0);
    }

    #[test]
    fn test_flush_keeps_foreign_empty_directories() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);
        let sessions = temp_dir.path().join("sessions").join("ab");
        fs::create_dir_all(&sessions).unwrap();

        store.forever("root", 1).unwrap();
        store.tags(["people"]).forever("john", "doe").unwrap();

        assert_eq!(store.flush().unwrap(), 2);
        assert!(sessions.is_dir());
        assert!(!temp_dir.path().join("people").exists());
        assert!(temp_dir.path().is_dir());
    }

    #[test]
    fn test_flush_keeps_directories_with_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);
        let partition = store.tags(["people"]);

        partition.forever("john", "doe").unwrap();
        fs::write(temp_dir.path().join("people").join("notes.txt"), "keep").unwrap();

        assert_eq!(store.flush().unwrap(), 1);
        assert!(temp_dir.path().join("people").join("notes.txt").exists());
        assert_eq!(partition.get("john"), None);
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        fs::write(store.entry_path("bad"), "expires_at = 1;\nvalue = {\"t\":").unwrap();
        assert_eq!(store.get("bad"), None);
        assert!(!store.extend_expiration("bad", Duration::from_secs(5)).unwrap());
    }

    #[test]
    fn test_no_temp_files_left_after_writes() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = make_store(&temp_dir);

        for i in 0..5 {
            store.forever("k", i).unwrap();
        }

        let leftovers = fs::read_dir(temp_dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(TEMP_SUFFIX))
            .count();
        assert_eq!(leftovers, 0);
    }
}
