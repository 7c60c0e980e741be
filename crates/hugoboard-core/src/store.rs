//! Blog store: the handle collaborators query
//!
//! Owns the article cache and its synchronizer for one content root. Queries
//! lazily run the first sync pass, and every row handed out is revalidated
//! against its file so a stale or orphaned row never reaches a caller.

use crate::cache::{ArticleCache, CacheStats};
use crate::config::ConsoleConfig;
use crate::error::{CoreError, DegradedState, SyncReport};
use crate::models::{mtime_seconds, ArticleFilter, ArticlePage, CachedArticle, TermCount};
use crate::parsers::{ContentIndex, FrontmatterParser};
use crate::sync::{CacheSynchronizer, PathOutcome};
use parking_lot::{Mutex, RwLock};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Listing passes before a page is returned as is (files rewritten mid-query)
const LIST_ATTEMPTS: usize = 4;

/// Central article store for one Hugo site
///
/// Thread-safe; share it through `Arc`.
pub struct BlogStore {
    config: ConsoleConfig,

    content_root: PathBuf,

    synchronizer: CacheSynchronizer,

    /// Serializes sync passes; holds whether the first one ran
    initialized: Mutex<bool>,

    /// Current degraded state
    degraded_state: RwLock<DegradedState>,
}

impl BlogStore {
    /// Open (or create) the cache for the configured site
    pub fn open(config: &ConsoleConfig) -> Result<Self, CoreError> {
        let cache = ArticleCache::new(&config.cache_path())?;
        Ok(Self::with_cache(config, cache))
    }

    /// Build a store over an already opened cache
    pub fn with_cache(config: &ConsoleConfig, cache: ArticleCache) -> Self {
        let content_root = std::path::absolute(config.content_root())
            .map(|p| normalize_lexically(&p))
            .unwrap_or_else(|_| config.content_root());
        let parser = FrontmatterParser::new().with_excerpt_chars(config.excerpt_chars);
        let index =
            ContentIndex::new(content_root.clone(), config.sections.clone()).with_parser(parser);

        debug!(
            content_root = %content_root.display(),
            cache = %cache.cache_path().display(),
            "Blog store opened"
        );

        Self {
            config: config.clone(),
            content_root,
            synchronizer: CacheSynchronizer::new(index, Arc::new(cache)),
            initialized: Mutex::new(false),
            degraded_state: RwLock::new(DegradedState::Healthy),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn cache(&self) -> &ArticleCache {
        self.synchronizer.cache()
    }

    pub fn degraded_state(&self) -> DegradedState {
        self.degraded_state.read().clone()
    }

    /// First sync pass; later calls return `None` without touching the tree
    pub fn initialize(&self) -> Result<Option<SyncReport>, CoreError> {
        let mut initialized = self.initialized.lock();
        if *initialized {
            return Ok(None);
        }
        let report = self.synchronizer.sync()?;
        *initialized = true;
        self.update_degraded_state(&report);
        Ok(Some(report))
    }

    /// Incremental sync pass
    pub fn refresh(&self) -> Result<SyncReport, CoreError> {
        let mut initialized = self.initialized.lock();
        let report = self.synchronizer.sync()?;
        *initialized = true;
        self.update_degraded_state(&report);
        Ok(report)
    }

    /// Re-parse every article regardless of mtime, then compact the database
    pub fn force_rebuild(&self) -> Result<SyncReport, CoreError> {
        let mut initialized = self.initialized.lock();
        info!("Forcing full cache rebuild");
        let report = self.synchronizer.force_rebuild()?;
        self.cache().vacuum()?;
        *initialized = true;
        self.update_degraded_state(&report);
        Ok(report)
    }

    fn update_degraded_state(&self, report: &SyncReport) {
        let state = DegradedState::from_report(report);
        if let DegradedState::PartialData { failed, reason } = &state {
            warn!(failed, reason = %reason, "Store running with partial data");
        }
        *self.degraded_state.write() = state;
    }

    /// Filtered listing; rows on the page are checked against their files.
    ///
    /// A stale or orphaned row can change whether it matches the filter and
    /// where it sorts, so the page is queried again once any row changed.
    pub fn list(&self, filter: &ArticleFilter) -> Result<ArticlePage, CoreError> {
        self.initialize()?;

        for _ in 1..LIST_ATTEMPTS {
            let page = self.cache().list(filter)?;
            if !self.revalidate_page(&page)? {
                return Ok(page);
            }
            debug!("Listed rows changed on disk, querying again");
        }

        self.cache().list(filter)
    }

    /// Revalidate every row on a page; true if any row was re-parsed or dropped
    fn revalidate_page(&self, page: &ArticlePage) -> Result<bool, CoreError> {
        let mut changed = false;
        for article in &page.articles {
            let mod_time = article.mod_time;
            match self.revalidate(article.clone())? {
                Some(fresh) if fresh.mod_time == mod_time => {}
                _ => changed = true,
            }
        }
        Ok(changed)
    }

    /// One article by path (absolute or relative to the content root)
    pub fn get(&self, path: &Path) -> Result<Option<CachedArticle>, CoreError> {
        self.initialize()?;

        let path = self.resolve_path(path)?;
        let key = path.to_string_lossy();

        match self.cache().get(&key)? {
            Some(article) => self.revalidate(article),
            None if path.is_file() && self.is_tracked(&path) => self.refresh_quietly(&path),
            None => Ok(None),
        }
    }

    /// Return the row if still fresh; re-parse it if stale; drop it if orphaned
    fn revalidate(&self, article: CachedArticle) -> Result<Option<CachedArticle>, CoreError> {
        let path = PathBuf::from(&article.path);

        let mtime = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime_seconds(mtime),
            Err(_) => {
                debug!(path = %article.path, "Cached article vanished, dropping row");
                self.cache().delete(&article.path)?;
                return Ok(None);
            }
        };

        if article.is_fresh(mtime) {
            return Ok(Some(article));
        }

        debug!(path = %article.path, "Cached article is stale, re-parsing");
        self.refresh_quietly(&path)
    }

    /// Refresh one path; a parse failure is logged and reads as absent
    fn refresh_quietly(&self, path: &Path) -> Result<Option<CachedArticle>, CoreError> {
        match self.synchronizer.refresh_path(path) {
            Ok(outcome) => Ok(outcome.into_article()),
            Err(e) if e.is_parse_error() => {
                warn!(path = %path.display(), error = %e, "Article no longer parses, dropped from cache");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Article counts per tag, most used first
    pub fn tag_counts(&self) -> Result<Vec<TermCount>, CoreError> {
        self.initialize()?;
        self.cache().tag_counts()
    }

    /// Article counts per category, most used first
    pub fn category_counts(&self) -> Result<Vec<TermCount>, CoreError> {
        self.initialize()?;
        self.cache().category_counts()
    }

    pub fn stats(&self) -> Result<CacheStats, CoreError> {
        self.cache().stats()
    }

    /// Hook for a file that was written
    ///
    /// Files outside the scanned sections or without a markdown extension are
    /// ignored. A parse failure drops the row and is returned.
    pub fn on_saved(&self, path: &Path) -> Result<Option<CachedArticle>, CoreError> {
        let path = self.resolve_path(path)?;
        if !self.is_tracked(&path) {
            debug!(path = %path.display(), "Saved file is not an article, ignoring");
            return Ok(None);
        }

        match self.synchronizer.refresh_path(&path)? {
            PathOutcome::Cached(article) => {
                debug!(path = %article.path, "Article cache updated after save");
                Ok(Some(article))
            }
            PathOutcome::SkippedEmpty | PathOutcome::Removed => Ok(None),
        }
    }

    /// Hook for a file that was deleted
    pub fn on_removed(&self, path: &Path) -> Result<bool, CoreError> {
        let path = self.resolve_path(path)?;
        self.synchronizer.remove_path(&path)
    }

    /// True when `path` would be picked up by a sync pass
    pub fn is_tracked(&self, path: &Path) -> bool {
        ContentIndex::is_article_path(path) && self.synchronizer.index().in_sections(path)
    }

    /// Absolute, lexically normalized path under the content root
    pub fn resolve_path(&self, path: &Path) -> Result<PathBuf, CoreError> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.content_root.join(path)
        };

        let normalized = normalize_lexically(&joined);
        if !normalized.starts_with(&self.content_root) {
            return Err(CoreError::InvalidPath {
                path: path.to_path_buf(),
                reason: format!("outside content root {}", self.content_root.display()),
            });
        }
        Ok(normalized)
    }

    /// Flush the WAL and release the store
    pub fn close(self) -> Result<(), CoreError> {
        self.cache().checkpoint()
    }
}

/// Resolve `.` and `..` without touching the file system
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
