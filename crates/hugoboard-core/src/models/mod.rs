//! Data models for hugoboard

pub mod article;

pub use article::{
    mtime_seconds, ArticleFilter, ArticlePage, CachedArticle, DraftFilter, TermCount,
    DATE_FORMAT, DEFAULT_PAGE_SIZE,
};
