//! Cache synchronizer
//!
//! Brings the article cache in line with the content tree: files whose mtime
//! differs from the cached value are re-parsed, cached paths with no file
//! behind them are dropped. Parse failures are isolated per file; store
//! failures abort the pass.

use crate::cache::ArticleCache;
use crate::error::{CoreError, SyncReport};
use crate::models::{mtime_seconds, CachedArticle};
use crate::parsers::ContentIndex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of refreshing a single path
#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    /// Parsed and written to the cache
    Cached(CachedArticle),
    /// Placeholder file with no title and no body; not cached
    SkippedEmpty,
    /// File is gone; any cached row was deleted
    Removed,
}

impl PathOutcome {
    pub fn into_article(self) -> Option<CachedArticle> {
        match self {
            PathOutcome::Cached(article) => Some(article),
            _ => None,
        }
    }
}

/// Keeps an [`ArticleCache`] consistent with one content root
pub struct CacheSynchronizer {
    index: ContentIndex,
    cache: Arc<ArticleCache>,
}

impl CacheSynchronizer {
    pub fn new(index: ContentIndex, cache: Arc<ArticleCache>) -> Self {
        Self { index, cache }
    }

    pub fn index(&self) -> &ContentIndex {
        &self.index
    }

    pub fn cache(&self) -> &Arc<ArticleCache> {
        &self.cache
    }

    /// Incremental pass: re-parse only files whose mtime changed
    pub fn sync(&self) -> Result<SyncReport, CoreError> {
        self.run(false)
    }

    /// Full pass: every discovered file is re-parsed
    pub fn force_rebuild(&self) -> Result<SyncReport, CoreError> {
        self.run(true)
    }

    fn run(&self, force: bool) -> Result<SyncReport, CoreError> {
        let start = Instant::now();
        let mut report = SyncReport::new();

        info!(
            content_root = %self.index.content_root().display(),
            force,
            "Starting cache synchronization"
        );

        let files = self.index.discover(&mut report)?;
        report.discovered = files.len();

        let cached = self.cache.mod_times()?;
        let mut seen: HashSet<String> = HashSet::with_capacity(files.len());

        for path in &files {
            let key = path.to_string_lossy().into_owned();
            seen.insert(key.clone());

            let mtime = match std::fs::metadata(path).and_then(|m| m.modified()) {
                Ok(mtime) => mtime_seconds(mtime),
                Err(e) => {
                    // Vanished between discovery and stat; the removal sweep below
                    // won't see it, so drop the row here
                    let error = CoreError::from_read(path, e);
                    warn!(path = %path.display(), error = %error, "Skipping unreadable article");
                    if self.cache.delete(&key)? {
                        report.removed += 1;
                    }
                    report.add_failure(path, &error);
                    continue;
                }
            };

            if !force && cached.get(&key) == Some(&mtime) {
                report.unchanged += 1;
                continue;
            }

            debug!(path = %path.display(), cached = cached.contains_key(&key), "Re-parsing article");

            match self.index.parse(path) {
                Ok(parsed) if parsed.empty => {
                    if self.cache.delete(&key)? {
                        report.removed += 1;
                    }
                    report.skipped_empty += 1;
                }
                Ok(parsed) => {
                    self.cache.upsert(&parsed.article)?;
                    report.reparsed += 1;
                }
                Err(error) if error.is_store_error() => return Err(error),
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "Failed to parse article, skipping");
                    if self.cache.delete(&key)? {
                        report.removed += 1;
                    }
                    report.add_failure(path, &error);
                }
            }
        }

        for stale in cached.keys().filter(|p| !seen.contains(p.as_str())) {
            if self.cache.delete(stale)? {
                debug!(path = %stale, "Removed cache entry for deleted article");
                report.removed += 1;
            }
        }

        report.duration = start.elapsed();

        info!(
            discovered = report.discovered,
            reparsed = report.reparsed,
            unchanged = report.unchanged,
            removed = report.removed,
            skipped_empty = report.skipped_empty,
            failed = report.failed,
            duration_ms = report.duration.as_millis() as u64,
            "Cache synchronization complete"
        );

        Ok(report)
    }

    /// Re-parse one path and update its row
    ///
    /// A missing file deletes the row. A parse failure deletes the row too and
    /// is returned as the error, so no stale row survives either way.
    pub fn refresh_path(&self, path: &Path) -> Result<PathOutcome, CoreError> {
        let key = path.to_string_lossy().into_owned();

        if !path.is_file() {
            self.cache.delete(&key)?;
            return Ok(PathOutcome::Removed);
        }

        match self.index.parse(path) {
            Ok(parsed) if parsed.empty => {
                self.cache.delete(&key)?;
                Ok(PathOutcome::SkippedEmpty)
            }
            Ok(parsed) => Ok(PathOutcome::Cached(self.cache.upsert(&parsed.article)?)),
            Err(error) if error.is_store_error() => Err(error),
            Err(CoreError::FileNotFound { .. }) => {
                self.cache.delete(&key)?;
                Ok(PathOutcome::Removed)
            }
            Err(error) => {
                self.cache.delete(&key)?;
                Err(error)
            }
        }
    }

    /// Drop the row for a path that no longer exists
    pub fn remove_path(&self, path: &Path) -> Result<bool, CoreError> {
        self.cache.delete(&path.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleFilter;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, PathBuf, CacheSynchronizer) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("content");
        fs::create_dir_all(root.join("post")).unwrap();
        let index = ContentIndex::new(root.clone(), vec!["post".to_string()]);
        let cache = Arc::new(ArticleCache::in_memory().unwrap());
        (dir, root, CacheSynchronizer::new(index, cache))
    }

    #[test]
    fn test_sync_caches_and_is_idempotent() {
        let (_dir, root, sync) = setup();
        fs::write(root.join("post/a.md"), "---\ntitle: A\ntags: [x]\n---\nbody").unwrap();
        fs::write(root.join("post/b.md"), "---\ntitle: B\n---\n").unwrap();

        let first = sync.sync().unwrap();
        assert_eq!(first.discovered, 2);
        assert_eq!(first.reparsed, 2);

        let second = sync.sync().unwrap();
        assert_eq!(second.reparsed, 0);
        assert_eq!(second.unchanged, 2);
        assert_eq!(sync.cache().list(&ArticleFilter::new()).unwrap().total, 2);
    }

    #[test]
    fn test_force_rebuild_reparses_everything() {
        let (_dir, root, sync) = setup();
        fs::write(root.join("post/a.md"), "---\ntitle: A\n---\n").unwrap();
        sync.sync().unwrap();

        let report = sync.force_rebuild().unwrap();
        assert_eq!(report.reparsed, 1);
        assert_eq!(report.unchanged, 0);
    }

    #[test]
    fn test_parse_failure_is_isolated_and_drops_stale_row() {
        let (_dir, root, sync) = setup();
        let bad = root.join("post/bad.md");
        fs::write(&bad, "---\ntitle: Fine\n---\n").unwrap();
        fs::write(root.join("post/good.md"), "---\ntitle: Good\n---\n").unwrap();
        sync.sync().unwrap();

        fs::write(&bad, "---\ntitle: [unclosed\n---\nbody that is longer").unwrap();
        let report = sync.force_rebuild().unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.reparsed, 1);
        assert_eq!(report.removed, 1);
        assert!(sync.cache().get(&bad.to_string_lossy()).unwrap().is_none());
        assert_eq!(report.failed_paths().count(), 1);
    }

    #[test]
    fn test_empty_placeholder_is_skipped() {
        let (_dir, root, sync) = setup();
        fs::write(root.join("post/empty.md"), "---\ndraft: true\n---\n\n").unwrap();

        let report = sync.sync().unwrap();
        assert_eq!(report.skipped_empty, 1);
        assert_eq!(sync.cache().stats().unwrap().total_articles, 0);
    }

    #[test]
    fn test_deleted_file_is_removed() {
        let (_dir, root, sync) = setup();
        let path = root.join("post/a.md");
        fs::write(&path, "---\ntitle: A\n---\n").unwrap();
        sync.sync().unwrap();

        fs::remove_file(&path).unwrap();
        let report = sync.sync().unwrap();

        assert_eq!(report.removed, 1);
        assert!(sync.cache().paths().unwrap().is_empty());
    }

    #[test]
    fn test_missing_content_root_keeps_cached_rows() {
        let (dir, root, sync) = setup();
        fs::write(root.join("post/a.md"), "---\ntitle: A\n---\n").unwrap();
        sync.sync().unwrap();

        fs::rename(&root, dir.path().join("moved")).unwrap();

        assert!(matches!(sync.sync(), Err(CoreError::DirectoryNotFound { .. })));
        assert_eq!(sync.cache().paths().unwrap().len(), 1);
    }

    #[test]
    fn test_refresh_path_outcomes() {
        let (_dir, root, sync) = setup();
        let path = root.join("post/a.md");
        fs::write(&path, "---\ntitle: A\n---\n").unwrap();

        let outcome = sync.refresh_path(&path).unwrap();
        assert_eq!(outcome.into_article().unwrap().title, "A");

        fs::write(&path, "---\ntitle: A\n").unwrap();
        assert!(sync.refresh_path(&path).unwrap_err().is_parse_error());
        assert!(sync.cache().get(&path.to_string_lossy()).unwrap().is_none());

        fs::remove_file(&path).unwrap();
        assert_eq!(sync.refresh_path(&path).unwrap(), PathOutcome::Removed);
    }
}
