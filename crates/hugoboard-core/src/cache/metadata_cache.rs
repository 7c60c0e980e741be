//! SQLite metadata cache for article files
//!
//! Caches parsed frontmatter with mtime-based invalidation so listing and
//! searching never touch the markdown files.
//!
//! Schema:
//! - articles: parsed metadata + mtime + bincode blob of the full record
//! - article_terms: one row per (article, tag|category) for filtering and counts
//! - Indexes: mtime, date, (kind, term)
//!
//! Invalidation:
//! - Synchronizer compares mtime per path and re-parses on mismatch
//! - Editor hooks upsert/delete single paths after a save
//! - Startup: compare cache_version, auto-clear if mismatch
//!
//! All access goes through one connection behind a mutex, and every upsert
//! writes the row and its terms in a single transaction, so a reader never
//! sees a half-written article.

use crate::error::CoreError;
use crate::models::{ArticleFilter, ArticlePage, CachedArticle, DraftFilter, TermCount};
use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Current cache version
///
/// **IMPORTANT**: Increment this version when changing how metadata is derived:
/// - CachedArticle structure changed (the blob is bincode, field order matters)
/// - Normalization rules modified (dates, terms, excerpt)
///
/// This triggers automatic cache invalidation on startup.
///
/// Version History:
/// - v1: Initial version
/// - v2: Added draft flag and TOML frontmatter support
const CACHE_VERSION: i32 = 2;

/// File name of the cache database inside the cache directory
pub const CACHE_FILE_NAME: &str = "cache.db";

const TERM_TAG: &str = "tag";
const TERM_CATEGORY: &str = "category";

/// SQLite-based article metadata cache (thread-safe)
pub struct ArticleCache {
    conn: Mutex<Connection>,
    cache_path: PathBuf,
}

impl ArticleCache {
    /// Create or open the cache database in `cache_dir`
    pub fn new(cache_dir: &Path) -> Result<Self, CoreError> {
        std::fs::create_dir_all(cache_dir).map_err(|source| CoreError::CacheDirectory {
            path: cache_dir.to_path_buf(),
            source,
        })?;

        let cache_path = cache_dir.join(CACHE_FILE_NAME);
        let conn = Connection::open(&cache_path)
            .map_err(|e| CoreError::store(format!("open {}", cache_path.display()), e))?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| CoreError::store("enable WAL mode", e))?;

        Self::init(conn, cache_path)
    }

    /// In-memory cache, for tests and one-shot tools
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::store("open in-memory database", e))?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, cache_path: PathBuf) -> Result<Self, CoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_metadata (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS articles (
                path TEXT PRIMARY KEY,
                relative_path TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                excerpt TEXT NOT NULL,
                date TEXT NOT NULL,
                draft INTEGER NOT NULL,
                mod_time REAL NOT NULL,
                cached_at TEXT NOT NULL,
                data BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS article_terms (
                path TEXT NOT NULL,
                kind TEXT NOT NULL,
                term TEXT NOT NULL,
                PRIMARY KEY (path, kind, term)
            );

            CREATE INDEX IF NOT EXISTS idx_articles_mod_time ON articles(mod_time);
            CREATE INDEX IF NOT EXISTS idx_articles_date ON articles(date DESC, path);
            CREATE INDEX IF NOT EXISTS idx_terms_kind_term ON article_terms(kind, term);
            "#,
        )
        .map_err(|e| CoreError::store("create schema", e))?;

        // Check cache version and auto-invalidate if mismatch
        let stored_version: Option<i32> = conn
            .query_row(
                "SELECT value FROM cache_metadata WHERE key = 'version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CoreError::store("query cache version", e))?;

        match stored_version {
            Some(v) if v != CACHE_VERSION => {
                warn!(
                    stored = v,
                    current = CACHE_VERSION,
                    "Cache version mismatch detected, clearing stale cache"
                );

                conn.execute_batch("DELETE FROM article_terms; DELETE FROM articles;")
                    .map_err(|e| CoreError::store("clear stale cache", e))?;

                conn.execute(
                    "INSERT OR REPLACE INTO cache_metadata (key, value) VALUES ('version', ?)",
                    params![CACHE_VERSION],
                )
                .map_err(|e| CoreError::store("update cache version", e))?;

                debug!("Cache cleared and version updated to {}", CACHE_VERSION);
            }
            None => {
                conn.execute(
                    "INSERT INTO cache_metadata (key, value) VALUES ('version', ?)",
                    params![CACHE_VERSION],
                )
                .map_err(|e| CoreError::store("initialize cache version", e))?;

                debug!("Cache version initialized to {}", CACHE_VERSION);
            }
            Some(_) => {
                debug!("Cache version {} matches current", CACHE_VERSION);
            }
        }

        debug!(path = %cache_path.display(), "Article cache initialized");

        Ok(Self {
            conn: Mutex::new(conn),
            cache_path,
        })
    }

    /// Location of the database file
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn.lock().map_err(|_| CoreError::LockPoisoned)
    }

    /// Point lookup by absolute path
    pub fn get(&self, path: &str) -> Result<Option<CachedArticle>, CoreError> {
        let conn = self.lock()?;

        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT data FROM articles WHERE path = ?",
                params![path],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CoreError::store("query article", e))?;

        match blob {
            Some(bytes) => {
                debug!(path, "Cache hit");
                decode(path, &bytes).map(Some)
            }
            None => {
                debug!(path, "Cache miss");
                Ok(None)
            }
        }
    }

    /// Lookup that only hits while the cached mtime equals `mod_time`
    pub fn get_fresh(&self, path: &str, mod_time: f64) -> Result<Option<CachedArticle>, CoreError> {
        let conn = self.lock()?;

        let blob: Option<Vec<u8>> = conn
            .query_row(
                "SELECT data FROM articles WHERE path = ? AND mod_time = ?",
                params![path, mod_time],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CoreError::store("query article", e))?;

        blob.map(|bytes| decode(path, &bytes)).transpose()
    }

    /// Insert or fully replace the row for `article.path`
    ///
    /// Returns the record as stored, with `cached_at` set.
    pub fn upsert(&self, article: &CachedArticle) -> Result<CachedArticle, CoreError> {
        let mut stored = article.clone();
        let now = Utc::now();
        stored.cached_at = Some(now);

        let data = bincode::serialize(&stored).map_err(|source| CoreError::CacheDecode {
            path: stored.path.clone(),
            source,
        })?;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::store("begin upsert", e))?;

        tx.execute(
            r#"
            INSERT OR REPLACE INTO articles
            (path, relative_path, title, description, excerpt, date, draft,
             mod_time, cached_at, data)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                stored.path.as_str(),
                stored.relative_path.as_str(),
                stored.title.as_str(),
                stored.description.as_str(),
                stored.excerpt.as_str(),
                stored.date.as_str(),
                if stored.draft { 1 } else { 0 },
                stored.mod_time,
                now.to_rfc3339(),
                &data,
            ],
        )
        .map_err(|e| CoreError::store("insert article", e))?;

        tx.execute(
            "DELETE FROM article_terms WHERE path = ?",
            params![stored.path.as_str()],
        )
        .map_err(|e| CoreError::store("replace article terms", e))?;

        {
            let mut insert = tx
                .prepare("INSERT OR IGNORE INTO article_terms (path, kind, term) VALUES (?, ?, ?)")
                .map_err(|e| CoreError::store("prepare term insert", e))?;
            for tag in &stored.tags {
                insert
                    .execute(params![stored.path.as_str(), TERM_TAG, tag])
                    .map_err(|e| CoreError::store("insert tag", e))?;
            }
            for category in &stored.categories {
                insert
                    .execute(params![stored.path.as_str(), TERM_CATEGORY, category])
                    .map_err(|e| CoreError::store("insert category", e))?;
            }
        }

        tx.commit()
            .map_err(|e| CoreError::store("commit upsert", e))?;

        debug!(path = %stored.path, "Article cached");
        Ok(stored)
    }

    /// Remove a row; absent paths are not an error
    ///
    /// Returns whether a row was removed.
    pub fn delete(&self, path: &str) -> Result<bool, CoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::store("begin delete", e))?;

        tx.execute("DELETE FROM article_terms WHERE path = ?", params![path])
            .map_err(|e| CoreError::store("delete article terms", e))?;
        let removed = tx
            .execute("DELETE FROM articles WHERE path = ?", params![path])
            .map_err(|e| CoreError::store("delete article", e))?;

        tx.commit()
            .map_err(|e| CoreError::store("commit delete", e))?;

        if removed > 0 {
            debug!(path, "Cache entry removed");
        }
        Ok(removed > 0)
    }

    /// Every cached path with its stored mtime
    pub fn mod_times(&self) -> Result<HashMap<String, f64>, CoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT path, mod_time FROM articles")
            .map_err(|e| CoreError::store("prepare mtime scan", e))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))
            .map_err(|e| CoreError::store("scan mtimes", e))?;

        let mut mtimes = HashMap::new();
        for row in rows {
            let (path, mtime) = row.map_err(|e| CoreError::store("read mtime row", e))?;
            mtimes.insert(path, mtime);
        }
        Ok(mtimes)
    }

    /// All cached paths, sorted
    pub fn paths(&self) -> Result<Vec<String>, CoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT path FROM articles ORDER BY path")
            .map_err(|e| CoreError::store("prepare path scan", e))?;

        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| CoreError::store("scan paths", e))?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(row.map_err(|e| CoreError::store("read path row", e))?);
        }
        Ok(paths)
    }

    /// Filtered, paginated listing ordered by date (newest first), then path
    pub fn list(&self, filter: &ArticleFilter) -> Result<ArticlePage, CoreError> {
        let (where_sql, mut args) = where_clause(filter);

        let conn = self.lock()?;

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM articles{}", where_sql),
                params_from_iter(args.iter()),
                |row| row.get(0),
            )
            .map_err(|e| CoreError::store("count articles", e))?;

        let page_size = filter.effective_page_size();
        args.push(SqlValue::Integer(page_size as i64));
        args.push(SqlValue::Integer(filter.offset() as i64));

        let mut stmt = conn
            .prepare(&format!(
                "SELECT path, data FROM articles{} ORDER BY date DESC, path ASC LIMIT ? OFFSET ?",
                where_sql
            ))
            .map_err(|e| CoreError::store("prepare listing", e))?;

        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })
            .map_err(|e| CoreError::store("list articles", e))?;

        let mut articles = Vec::new();
        for row in rows {
            let (path, bytes) = row.map_err(|e| CoreError::store("read article row", e))?;
            articles.push(decode(&path, &bytes)?);
        }

        Ok(ArticlePage {
            articles,
            total: total.max(0) as usize,
            page: filter.effective_page(),
            page_size,
        })
    }

    /// Article count per tag
    pub fn tag_counts(&self) -> Result<Vec<TermCount>, CoreError> {
        self.term_counts(TERM_TAG)
    }

    /// Article count per category
    pub fn category_counts(&self) -> Result<Vec<TermCount>, CoreError> {
        self.term_counts(TERM_CATEGORY)
    }

    fn term_counts(&self, kind: &str) -> Result<Vec<TermCount>, CoreError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                r#"
                SELECT term, COUNT(DISTINCT path) AS n
                FROM article_terms
                WHERE kind = ?
                GROUP BY term
                ORDER BY n DESC, term ASC
                "#,
            )
            .map_err(|e| CoreError::store("prepare term counts", e))?;

        let rows = stmt
            .query_map(params![kind], |row| {
                Ok(TermCount::new(row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })
            .map_err(|e| CoreError::store("count terms", e))?;

        let mut counts = Vec::new();
        for row in rows {
            counts.push(row.map_err(|e| CoreError::store("read term row", e))?);
        }
        Ok(counts)
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats, CoreError> {
        let conn = self.lock()?;

        let count = |sql: &str| -> Result<usize, CoreError> {
            conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                .map(|n| n.max(0) as usize)
                .map_err(|e| CoreError::store("compute stats", e))
        };

        let total_articles = count("SELECT COUNT(*) FROM articles")?;
        let draft_count = count("SELECT COUNT(*) FROM articles WHERE draft = 1")?;
        let tag_count =
            count("SELECT COUNT(DISTINCT term) FROM article_terms WHERE kind = 'tag'")?;
        let category_count =
            count("SELECT COUNT(DISTINCT term) FROM article_terms WHERE kind = 'category'")?;

        let total_size: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(LENGTH(data)), 0) FROM articles",
                [],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::store("compute stats", e))?;

        Ok(CacheStats {
            total_articles,
            draft_count,
            tag_count,
            category_count,
            total_size_bytes: total_size.max(0) as usize,
        })
    }

    /// Clear all cache entries (for rebuild)
    pub fn clear(&self) -> Result<(), CoreError> {
        let conn = self.lock()?;

        conn.execute_batch("DELETE FROM article_terms; DELETE FROM articles;")
            .map_err(|e| CoreError::store("clear cache", e))?;

        debug!("Cache cleared");
        Ok(())
    }

    /// Vacuum database to reclaim space
    pub fn vacuum(&self) -> Result<(), CoreError> {
        let conn = self.lock()?;

        conn.execute("VACUUM", [])
            .map_err(|e| CoreError::store("vacuum", e))?;

        debug!("Database vacuumed");
        Ok(())
    }

    /// Flush the WAL into the main database file
    pub fn checkpoint(&self) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.pragma_update(None, "wal_checkpoint", "TRUNCATE")
            .map_err(|e| CoreError::store("checkpoint WAL", e))
    }
}

impl Drop for ArticleCache {
    fn drop(&mut self) {
        // WAL checkpoint on drop so the WAL file doesn't grow across restarts
        if let Ok(conn) = self.conn.lock() {
            if let Err(e) = conn.pragma_update(None, "wal_checkpoint", "TRUNCATE") {
                warn!("Failed to checkpoint WAL on ArticleCache drop: {}", e);
            } else {
                debug!("WAL checkpoint completed on ArticleCache drop");
            }
        }
    }
}

fn decode(path: &str, bytes: &[u8]) -> Result<CachedArticle, CoreError> {
    bincode::deserialize(bytes).map_err(|source| CoreError::CacheDecode {
        path: path.to_string(),
        source,
    })
}

/// Escape LIKE wildcards; used with `ESCAPE '\'`
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn where_clause(filter: &ArticleFilter) -> (String, Vec<SqlValue>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut args = Vec::new();

    if let Some(query) = filter.query_term() {
        clauses.push(
            r"(title LIKE ? ESCAPE '\' OR description LIKE ? ESCAPE '\' OR excerpt LIKE ? ESCAPE '\')",
        );
        let pattern = like_pattern(query);
        for _ in 0..3 {
            args.push(SqlValue::Text(pattern.clone()));
        }
    }

    if let Some(tag) = filter.tag_term() {
        clauses.push("path IN (SELECT path FROM article_terms WHERE kind = 'tag' AND term = ?)");
        args.push(SqlValue::Text(tag.to_string()));
    }

    if let Some(category) = filter.category_term() {
        clauses
            .push("path IN (SELECT path FROM article_terms WHERE kind = 'category' AND term = ?)");
        args.push(SqlValue::Text(category.to_string()));
    }

    match filter.draft {
        DraftFilter::All => {}
        DraftFilter::Drafts => clauses.push("draft = 1"),
        DraftFilter::Published => clauses.push("draft = 0"),
    }

    if clauses.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), args)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_articles: usize,
    pub draft_count: usize,
    pub tag_count: usize,
    pub category_count: usize,
    pub total_size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn article(path: &str, title: &str, date: &str, tags: &[&str], categories: &[&str]) -> CachedArticle {
        let mut a = CachedArticle::from_path(Path::new(path), path.trim_start_matches('/').into());
        a.title = title.to_string();
        a.date = date.to_string();
        a.tags = tags.iter().map(|s| s.to_string()).collect();
        a.categories = categories.iter().map(|s| s.to_string()).collect();
        a.mod_time = 1_700_000_000.5;
        a
    }

    #[test]
    fn test_cache_creation() {
        let dir = tempdir().unwrap();
        let cache = ArticleCache::new(dir.path()).unwrap();

        assert!(cache.cache_path().exists());
        assert_eq!(cache.stats().unwrap().total_articles, 0);
    }

    #[test]
    fn test_upsert_get_round_trip() {
        let cache = ArticleCache::in_memory().unwrap();
        let a = article("/c/post/a.md", "Alpha", "2024-01-01 00:00:00", &["rust"], &["tech"]);

        let stored = cache.upsert(&a).unwrap();
        assert!(stored.cached_at.is_some());

        let fetched = cache.get(&a.path).unwrap().unwrap();
        assert_eq!(fetched.cached_at, stored.cached_at);
        assert_eq!(CachedArticle { cached_at: None, ..fetched }, a);
    }

    #[test]
    fn test_get_fresh_requires_matching_mtime() {
        let cache = ArticleCache::in_memory().unwrap();
        let a = article("/c/post/a.md", "Alpha", "", &[], &[]);
        cache.upsert(&a).unwrap();

        assert!(cache.get_fresh(&a.path, a.mod_time).unwrap().is_some());
        assert!(cache.get_fresh(&a.path, a.mod_time + 1.0).unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_terms() {
        let cache = ArticleCache::in_memory().unwrap();
        let mut a = article("/c/post/a.md", "Alpha", "", &["old"], &[]);
        cache.upsert(&a).unwrap();

        a.tags = vec!["new".to_string()];
        cache.upsert(&a).unwrap();

        let tags = cache.tag_counts().unwrap();
        assert_eq!(tags, vec![TermCount::new("new", 1)]);
        assert_eq!(cache.stats().unwrap().total_articles, 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let cache = ArticleCache::in_memory().unwrap();
        let a = article("/c/post/a.md", "Alpha", "", &["t"], &[]);
        cache.upsert(&a).unwrap();

        assert!(cache.delete(&a.path).unwrap());
        assert!(!cache.delete(&a.path).unwrap());
        assert!(cache.get(&a.path).unwrap().is_none());
        assert!(cache.tag_counts().unwrap().is_empty());
    }

    #[test]
    fn test_list_orders_by_date_then_path() {
        let cache = ArticleCache::in_memory().unwrap();
        cache.upsert(&article("/c/b.md", "B", "2024-01-01 00:00:00", &[], &[])).unwrap();
        cache.upsert(&article("/c/a.md", "A", "2024-01-01 00:00:00", &[], &[])).unwrap();
        cache.upsert(&article("/c/c.md", "C", "2024-06-01 00:00:00", &[], &[])).unwrap();
        cache.upsert(&article("/c/d.md", "D", "", &[], &[])).unwrap();

        let page = cache.list(&ArticleFilter::new()).unwrap();
        let titles: Vec<_> = page.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B", "D"]);
        assert_eq!(page.total, 4);
    }

    #[test]
    fn test_list_filters() {
        let cache = ArticleCache::in_memory().unwrap();
        cache
            .upsert(&article("/c/a.md", "Rust tips", "2024-01-01 00:00:00", &["rust"], &["tech"]))
            .unwrap();
        cache
            .upsert(&article("/c/b.md", "Hugo themes", "2024-01-02 00:00:00", &["hugo"], &["tech"]))
            .unwrap();
        let mut draft = article("/c/c.md", "Travel", "2024-01-03 00:00:00", &["rust"], &["life"]);
        draft.draft = true;
        cache.upsert(&draft).unwrap();

        let by_query = cache.list(&ArticleFilter::new().with_query("RUST")).unwrap();
        assert_eq!(by_query.total, 1);
        assert_eq!(by_query.articles[0].title, "Rust tips");

        let by_tag = cache.list(&ArticleFilter::new().with_tag("rust")).unwrap();
        assert_eq!(by_tag.total, 2);

        let tag_and_category = cache
            .list(&ArticleFilter::new().with_tag("rust").with_category("tech"))
            .unwrap();
        assert_eq!(tag_and_category.total, 1);

        let published = cache
            .list(&ArticleFilter::new().with_draft(DraftFilter::Published))
            .unwrap();
        assert_eq!(published.total, 2);

        let drafts = cache
            .list(&ArticleFilter::new().with_draft(DraftFilter::Drafts))
            .unwrap();
        assert_eq!(drafts.articles[0].title, "Travel");
    }

    #[test]
    fn test_query_wildcards_are_literal() {
        let cache = ArticleCache::in_memory().unwrap();
        cache.upsert(&article("/c/a.md", "100% Rust", "", &[], &[])).unwrap();
        cache.upsert(&article("/c/b.md", "1000 Rust", "", &[], &[])).unwrap();

        let page = cache.list(&ArticleFilter::new().with_query("0%")).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.articles[0].title, "100% Rust");
    }

    #[test]
    fn test_pagination() {
        let cache = ArticleCache::in_memory().unwrap();
        for i in 1..=25 {
            let date = format!("2024-01-{:02} 00:00:00", i);
            cache
                .upsert(&article(&format!("/c/{:02}.md", i), &format!("P{}", i), &date, &[], &[]))
                .unwrap();
        }

        let page = cache.list(&ArticleFilter::new().with_page(2, 10)).unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.articles.len(), 10);
        assert_eq!(page.articles[0].title, "P15");
        assert_eq!(page.articles[9].title, "P6");

        let last = cache.list(&ArticleFilter::new().with_page(3, 10)).unwrap();
        assert_eq!(last.articles.len(), 5);
        assert!(!last.has_next());

        let beyond = cache.list(&ArticleFilter::new().with_page(9, 10)).unwrap();
        assert!(beyond.articles.is_empty());
        assert_eq!(beyond.total, 25);
    }

    #[test]
    fn test_term_counts_sorted_and_distinct() {
        let cache = ArticleCache::in_memory().unwrap();
        cache.upsert(&article("/c/a.md", "A", "", &["a", "b", "b"], &["x"])).unwrap();
        cache.upsert(&article("/c/b.md", "B", "", &["b"], &["x", "y"])).unwrap();

        assert_eq!(
            cache.tag_counts().unwrap(),
            vec![TermCount::new("b", 2), TermCount::new("a", 1)]
        );
        assert_eq!(
            cache.category_counts().unwrap(),
            vec![TermCount::new("x", 2), TermCount::new("y", 1)]
        );
    }

    #[test]
    fn test_mod_times_and_paths() {
        let cache = ArticleCache::in_memory().unwrap();
        cache.upsert(&article("/c/b.md", "B", "", &[], &[])).unwrap();
        cache.upsert(&article("/c/a.md", "A", "", &[], &[])).unwrap();

        let mtimes = cache.mod_times().unwrap();
        assert_eq!(mtimes.get("/c/a.md"), Some(&1_700_000_000.5));
        assert_eq!(cache.paths().unwrap(), vec!["/c/a.md", "/c/b.md"]);
    }

    #[test]
    fn test_cache_stats() {
        let cache = ArticleCache::in_memory().unwrap();
        let mut a = article("/c/a.md", "A", "", &["t1", "t2"], &["c1"]);
        a.draft = true;
        cache.upsert(&a).unwrap();
        cache.upsert(&article("/c/b.md", "B", "", &["t1"], &[])).unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_articles, 2);
        assert_eq!(stats.draft_count, 1);
        assert_eq!(stats.tag_count, 2);
        assert_eq!(stats.category_count, 1);
        assert!(stats.total_size_bytes > 0);
    }

    #[test]
    fn test_cache_stats_reports_size_query_failure() {
        let cache = ArticleCache::in_memory().unwrap();
        cache.upsert(&article("/c/a.md", "A", "", &[], &[])).unwrap();
        cache
            .lock()
            .unwrap()
            .execute_batch("ALTER TABLE articles RENAME COLUMN data TO payload;")
            .unwrap();

        let err = cache.stats().unwrap_err();
        assert!(err.is_store_error());
        assert!(err.to_string().contains("compute stats"));
    }

    #[test]
    fn test_cache_clear() {
        let cache = ArticleCache::in_memory().unwrap();
        cache.upsert(&article("/c/a.md", "A", "", &["t"], &[])).unwrap();

        cache.clear().unwrap();

        assert_eq!(cache.stats().unwrap(), CacheStats::default());
    }

    #[test]
    fn test_vacuum_keeps_remaining_rows() {
        let dir = tempdir().unwrap();
        let cache = ArticleCache::new(dir.path()).unwrap();
        for i in 0..50 {
            cache
                .upsert(&article(&format!("/c/{}.md", i), "T", "", &["t"], &[]))
                .unwrap();
        }
        for i in 1..50 {
            cache.delete(&format!("/c/{}.md", i)).unwrap();
        }

        cache.vacuum().unwrap();

        assert_eq!(cache.paths().unwrap(), vec!["/c/0.md"]);
        assert_eq!(cache.tag_counts().unwrap(), vec![TermCount::new("t", 1)]);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempdir().unwrap();
        {
            let cache = ArticleCache::new(dir.path()).unwrap();
            cache.upsert(&article("/c/a.md", "A", "", &[], &[])).unwrap();
        }
        let cache = ArticleCache::new(dir.path()).unwrap();
        assert!(cache.get("/c/a.md").unwrap().is_some());
    }

    #[test]
    fn test_version_mismatch_clears_cache() {
        let dir = tempdir().unwrap();
        {
            let cache = ArticleCache::new(dir.path()).unwrap();
            cache.upsert(&article("/c/a.md", "A", "", &[], &[])).unwrap();
        }
        {
            let conn = Connection::open(dir.path().join(CACHE_FILE_NAME)).unwrap();
            conn.execute("UPDATE cache_metadata SET value = 0 WHERE key = 'version'", [])
                .unwrap();
        }
        let cache = ArticleCache::new(dir.path()).unwrap();
        assert_eq!(cache.stats().unwrap().total_articles, 0);
    }
}
