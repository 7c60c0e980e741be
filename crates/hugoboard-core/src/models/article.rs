//! Article models for the metadata cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;

/// Canonical date layout stored in [`CachedArticle::date`]
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Default page size for article listings
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Normalized metadata for one article file
///
/// Every field is materialized: strings are empty rather than absent and
/// term lists are empty rather than null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedArticle {
    /// Absolute file-system path (primary key)
    pub path: String,

    /// Path relative to the content root, `/`-separated
    pub relative_path: String,

    pub title: String,

    pub description: String,

    /// Plain-text preview of the body
    pub excerpt: String,

    /// `YYYY-MM-DD HH:MM:SS`, or empty when the source has no usable date
    pub date: String,

    pub tags: Vec<String>,

    pub categories: Vec<String>,

    pub draft: bool,

    /// File modification time (seconds since epoch) at last parse
    pub mod_time: f64,

    /// Last cache write, set by the store
    pub cached_at: Option<DateTime<Utc>>,
}

impl CachedArticle {
    /// Empty record for a file, every field at its normalized default
    pub fn from_path(path: &Path, relative_path: String) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            relative_path,
            title: String::new(),
            description: String::new(),
            excerpt: String::new(),
            date: String::new(),
            tags: Vec::new(),
            categories: Vec::new(),
            draft: false,
            mod_time: 0.0,
            cached_at: None,
        }
    }

    /// True when `mtime` matches the time this record was parsed at
    pub fn is_fresh(&self, mtime: f64) -> bool {
        self.mod_time == mtime
    }

    /// Date portion (`YYYY-MM-DD`) for compact listings
    pub fn date_display(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }

    /// `mod_time` rendered in local time
    pub fn mod_time_display(&self) -> String {
        DateTime::from_timestamp(self.mod_time.trunc() as i64, 0)
            .map(|dt| {
                dt.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Modification time as float seconds since the Unix epoch
///
/// Times before the epoch map to negative values so they still compare
/// consistently.
pub fn mtime_seconds(mtime: SystemTime) -> f64 {
    match mtime.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Draft visibility filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftFilter {
    /// Drafts and published articles
    #[default]
    All,
    /// Only articles with `draft: true`
    Drafts,
    /// Only articles without `draft: true`
    Published,
}

/// Query parameters for [`crate::cache::ArticleCache::list`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleFilter {
    /// Substring matched against title, description and excerpt
    pub query: Option<String>,
    /// Exact tag
    pub tag: Option<String>,
    /// Exact category
    pub category: Option<String>,
    pub draft: DraftFilter,
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for ArticleFilter {
    fn default() -> Self {
        Self {
            query: None,
            tag: None,
            category: None,
            draft: DraftFilter::All,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ArticleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_draft(mut self, draft: DraftFilter) -> Self {
        self.draft = draft;
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Page number clamped to at least 1
    pub fn effective_page(&self) -> usize {
        self.page.max(1)
    }

    /// Page size clamped to at least 1
    pub fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }

    /// Row offset of the first article on the requested page
    pub fn offset(&self) -> usize {
        (self.effective_page() - 1).saturating_mul(self.effective_page_size())
    }

    /// Blank strings count as "no filter"
    pub fn query_term(&self) -> Option<&str> {
        non_blank(self.query.as_deref())
    }

    pub fn tag_term(&self) -> Option<&str> {
        non_blank(self.tag.as_deref())
    }

    pub fn category_term(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// One page of a filtered listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticlePage {
    pub articles: Vec<CachedArticle>,
    /// Matching articles across all pages
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl ArticlePage {
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Aggregated count for one tag or category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermCount {
    pub name: String,
    pub count: usize,
}

impl TermCount {
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}
