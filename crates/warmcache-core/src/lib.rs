//! File-backed key/value cache.
//!
//! Entries are stored one file per key, written atomically through a temp file
//! and a rename, and expire lazily. Tags map to sub-directories so a tag set can
//! be flushed as a directory, and [`Repository::remember`] keeps stale entries
//! alive briefly while a fresh value is computed.

pub mod clock;
pub mod codec;
pub mod config;
pub mod entry;
mod error;
pub mod hash;
pub mod maintenance;
pub mod repository;
pub mod stampede;
pub mod store;
pub mod tags;
pub mod warm;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Object, Reconstruct, Value};
pub use config::CacheConfig;
pub use entry::{CacheEntry, NEVER_EXPIRES};
pub use error::{CacheError, CodecError, Result};
pub use maintenance::CacheStats;
pub use repository::Repository;
pub use stampede::StampedeGuard;
pub use store::FileStore;
pub use tags::TagSet;
pub use warm::{MemoryWarmCache, NoWarmCache, WarmCache};

/// Prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "warmcache";

/// Extension of in-flight temp files
pub const TEMP_SUFFIX: &str = ".tmp";
