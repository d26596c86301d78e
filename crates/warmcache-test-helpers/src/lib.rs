//! Test utilities and fixtures for WarmCache
//!
//! Shared by the integration tests under each crate's `tests/` directory: a
//! throwaway store with a manual clock, warm-layer mocks, and sample values.

pub mod fixtures;
pub mod mocks;
pub mod store;

pub use store::TestCache;
