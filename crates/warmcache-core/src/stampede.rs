//! Fetch-or-compute with stampede mitigation.
//!
//! No lock is taken. On a miss the previous entry, if one is still on disk, is
//! kept alive for a short window so concurrent readers keep getting the stale
//! value while this caller recomputes. With no prior entry (cold start) or on
//! exactly simultaneous misses, several callers can still compute.

use std::time::Duration;
use tracing::debug;

use crate::codec::Value;
use crate::entry::CacheEntry;
use crate::store::{FileStore, Lookup};
use crate::Result;

/// Default grace window granted to a stale entry while it is recomputed
pub const DEFAULT_GUARD_WINDOW: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StampedeGuard {
    window: Duration,
}

impl Default for StampedeGuard {
    fn default() -> Self {
        Self::new(DEFAULT_GUARD_WINDOW)
    }
}

impl StampedeGuard {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Return the cached value for `key`, or compute, store and return it.
    pub fn remember<F, V>(&self, store: &FileStore, key: &str, ttl: Duration, compute: F) -> Result<Value>
    where
        F: FnOnce() -> V,
        V: Into<Value>,
    {
        let now = store.now();

        match store.lookup(key) {
            Lookup::Found(entry) if !entry.is_expired(now) => return Ok(entry.value),
            Lookup::Found(stale) => {
                // Readers see the stale value until the new one lands
                let held = CacheEntry::new(now.saturating_add(self.window.as_secs()), stale.value);
                store.write(key, &held)?;
                debug!(key, window = self.window.as_secs(), "Holding stale entry during recompute");
            }
            Lookup::Missing | Lookup::Unreadable => {
                // Nothing to hold; a no-op unless an entry appeared meanwhile
                store.extend_expiration(key, self.window)?;
            }
        }

        let value = compute().into();
        store.put(key, value.clone(), ttl)?;
        Ok(value)
    }

    pub fn remember_forever<F, V>(&self, store: &FileStore, key: &str, compute: F) -> Result<Value>
    where
        F: FnOnce() -> V,
        V: Into<Value>,
    {
        self.remember(store, key, Duration::ZERO, compute)
    }
}
