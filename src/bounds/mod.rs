//! Persisted per-group bounds for the external configuration tool.

pub mod cache;

pub use cache::{BoundsCache, CacheEntry};
