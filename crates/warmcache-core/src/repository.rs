use indexmap::IndexMap;
use std::time::Duration;

use crate::codec::Value;
use crate::config::CacheConfig;
use crate::stampede::StampedeGuard;
use crate::store::FileStore;
use crate::tags::TagSet;
use crate::Result;

/// Caller-facing cache API, optionally confined to a tag partition.
///
/// Every operation is delegated to the underlying [`FileStore`]; a tagged
/// repository simply holds a store view rooted at the partition directory.
#[derive(Debug, Clone)]
pub struct Repository {
    store: FileStore,
    tags: Option<TagSet>,
    guard: StampedeGuard,
}

impl Repository {
    /// A repository using the stampede window the store carries
    pub fn new(store: FileStore) -> Self {
        let guard = store.guard();
        Self::with_guard(store, guard)
    }

    pub fn with_guard(store: FileStore, guard: StampedeGuard) -> Self {
        Self {
            store,
            tags: None,
            guard,
        }
    }

    /// Build a store and guard from configuration
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Ok(Self::new(FileStore::from_config(config)?))
    }

    pub(crate) fn tagged(store: FileStore, tags: TagSet, guard: StampedeGuard) -> Self {
        if tags.is_empty() {
            return Self::with_guard(store, guard);
        }

        Self {
            store: store.scoped(&tags),
            tags: Some(tags),
            guard,
        }
    }

    /// A view confined to the partition of `names`, sharing this repository's
    /// root, prefix and guard. Tags do not nest: the new set replaces any current one.
    pub fn tags<I, S>(&self, names: I) -> Repository
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let root = self.store.scoped(&TagSet::default());
        Self::tagged(root, TagSet::new(names), self.guard)
    }

    pub fn tag_set(&self) -> Option<&TagSet> {
        self.tags.as_ref()
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn guard(&self) -> StampedeGuard {
        self.guard
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.has(key)
    }

    pub fn many<I, K>(&self, keys: I) -> IndexMap<String, Option<Value>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.store.many(keys)
    }

    pub fn put(&self, key: &str, value: impl Into<Value>, ttl: Duration) -> Result<()> {
        self.store.put(key, value, ttl)
    }

    pub fn put_many<I, K, V>(&self, items: I, ttl: Duration) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.store.put_many(items, ttl)
    }

    pub fn add(&self, key: &str, value: impl Into<Value>, ttl: Duration) -> Result<bool> {
        self.store.add(key, value, ttl)
    }

    pub fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.store.increment(key, delta)
    }

    pub fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.store.decrement(key, delta)
    }

    pub fn forever(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.store.forever(key, value)
    }

    pub fn forget(&self, key: &str) -> Result<bool> {
        self.store.forget(key)
    }

    pub fn pull(&self, key: &str) -> Result<Option<Value>> {
        self.store.pull(key)
    }

    pub fn extend_expiration(&self, key: &str, extra: Duration) -> Result<bool> {
        self.store.extend_expiration(key, extra)
    }

    /// Get an item, or compute and store it without letting every concurrent
    /// caller recompute at once
    pub fn remember<F, V>(&self, key: &str, ttl: Duration, compute: F) -> Result<Value>
    where
        F: FnOnce() -> V,
        V: Into<Value>,
    {
        self.guard.remember(&self.store, key, ttl, compute)
    }

    pub fn remember_forever<F, V>(&self, key: &str, compute: F) -> Result<Value>
    where
        F: FnOnce() -> V,
        V: Into<Value>,
    {
        self.guard.remember_forever(&self.store, key, compute)
    }

    /// Remove all items. A tagged repository only clears its own partition.
    pub fn flush(&self) -> Result<usize> {
        self.store.flush()
    }
}
