//! hugoboard-core - Core library for hugoboard
//!
//! Provides the frontmatter parser, the SQLite article cache, the cache
//! synchronizer and the store handle for a local Hugo blog.

pub mod cache;
pub mod config;
pub mod editor;
pub mod error;
pub mod models;
pub mod parsers;
pub mod store;
pub mod sync;

pub use cache::{ArticleCache, CacheStats};
pub use config::ConsoleConfig;
pub use editor::ArticleEditor;
pub use error::{CoreError, DegradedState, LoadError, SyncReport};
pub use models::{ArticleFilter, ArticlePage, CachedArticle, DraftFilter, TermCount};
pub use store::BlogStore;
pub use sync::{CacheSynchronizer, PathOutcome};
