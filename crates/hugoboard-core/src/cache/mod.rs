//! Caching layer for hugoboard-core
//!
//! Provides the SQLite-backed article metadata cache.

pub mod metadata_cache;

pub use metadata_cache::{ArticleCache, CacheStats, CACHE_FILE_NAME};
