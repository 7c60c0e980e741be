//! Article discovery under the content root
//!
//! An article is any regular markdown file inside one of the configured
//! sections. Page bundles (`<dir>/index.md`) are picked up as ordinary files;
//! directories themselves are never articles, even when their name ends in
//! `.md`.

use crate::error::{CoreError, SyncReport};
use crate::parsers::frontmatter::{FrontmatterParser, ParsedArticle};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Extensions recognized as article sources
pub const ARTICLE_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Discovers and parses articles for one content root
#[derive(Debug, Clone)]
pub struct ContentIndex {
    content_root: PathBuf,
    sections: Vec<String>,
    parser: FrontmatterParser,
}

impl ContentIndex {
    pub fn new(content_root: PathBuf, sections: Vec<String>) -> Self {
        Self {
            content_root,
            sections,
            parser: FrontmatterParser::new(),
        }
    }

    pub fn with_parser(mut self, parser: FrontmatterParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// Directories scanned for articles; an empty section list means the whole root
    pub fn section_dirs(&self) -> Vec<PathBuf> {
        if self.sections.is_empty() {
            return vec![self.content_root.clone()];
        }
        self.sections
            .iter()
            .map(|s| self.content_root.join(s))
            .collect()
    }

    /// True when `path` names a markdown file by extension
    pub fn is_article_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| ARTICLE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// True when `path` lies inside one of the scanned sections
    pub fn in_sections(&self, path: &Path) -> bool {
        self.section_dirs().iter().any(|dir| path.starts_with(dir))
    }

    /// Discover all article files, sorted for deterministic passes
    ///
    /// Missing section directories are reported as warnings. A missing
    /// content root is an error: an empty scan would otherwise read as every
    /// article having been deleted.
    pub fn discover(&self, report: &mut SyncReport) -> Result<Vec<PathBuf>, CoreError> {
        if !self.content_root.is_dir() {
            return Err(CoreError::DirectoryNotFound {
                path: self.content_root.clone(),
            });
        }

        let mut articles = Vec::new();

        for dir in self.section_dirs() {
            if !dir.is_dir() {
                report.add_warning(
                    "content",
                    format!("Section directory not found: {}", dir.display()),
                );
                continue;
            }

            let walker = WalkDir::new(&dir)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "Skipping unreadable directory entry");
                        report.add_warning("content", format!("Unreadable entry: {}", e));
                        continue;
                    }
                };

                if entry.file_type().is_file() && Self::is_article_path(entry.path()) {
                    articles.push(entry.into_path());
                }
            }
        }

        articles.sort();
        articles.dedup();
        debug!(count = articles.len(), "Discovered article files");
        Ok(articles)
    }

    /// Parse one article file relative to this content root
    pub fn parse(&self, path: &Path) -> Result<ParsedArticle, CoreError> {
        self.parser.parse_file(path, &self.content_root)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_discover_files_and_bundles() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let post = root.join("post");
        fs::create_dir_all(post.join("2024-01-01-bundle")).unwrap();
        fs::create_dir_all(post.join("nested").join("deeper")).unwrap();
        fs::create_dir_all(post.join("looks-like.md")).unwrap();
        fs::create_dir_all(post.join(".drafts")).unwrap();

        fs::write(post.join("single.md"), "---\ntitle: a\n---\n").unwrap();
        fs::write(post.join("2024-01-01-bundle").join("index.md"), "x").unwrap();
        fs::write(post.join("nested").join("deeper").join("old.markdown"), "x").unwrap();
        fs::write(post.join("looks-like.md").join("index.md"), "x").unwrap();
        fs::write(post.join(".drafts").join("secret.md"), "x").unwrap();
        fs::write(post.join("2024-01-01-bundle").join("cover.png"), "png").unwrap();

        let index = ContentIndex::new(root.to_path_buf(), vec!["post".to_string()]);
        let mut report = SyncReport::new();
        let found = index.discover(&mut report).unwrap();

        let rel: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            rel,
            vec![
                "post/2024-01-01-bundle/index.md",
                "post/looks-like.md/index.md",
                "post/nested/deeper/old.markdown",
                "post/single.md",
            ]
        );
        assert!(!report.has_errors());
    }

    #[test]
    fn test_missing_section_is_a_warning() {
        let dir = tempdir().unwrap();
        let index = ContentIndex::new(dir.path().to_path_buf(), vec!["post".to_string()]);
        let mut report = SyncReport::new();

        assert!(index.discover(&mut report).unwrap().is_empty());
        assert_eq!(report.error_count(), (1, 0));
    }

    #[test]
    fn test_missing_content_root_is_an_error() {
        let dir = tempdir().unwrap();
        let index = ContentIndex::new(dir.path().join("content"), vec!["post".to_string()]);

        assert!(matches!(
            index.discover(&mut SyncReport::new()),
            Err(CoreError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn test_sections_limit_the_scan() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("post")).unwrap();
        fs::create_dir_all(root.join("page")).unwrap();
        fs::write(root.join("post").join("a.md"), "x").unwrap();
        fs::write(root.join("page").join("about.md"), "x").unwrap();

        let posts_only = ContentIndex::new(root.to_path_buf(), vec!["post".to_string()]);
        assert_eq!(posts_only.discover(&mut SyncReport::new()).unwrap().len(), 1);
        assert!(posts_only.in_sections(&root.join("post").join("a.md")));
        assert!(!posts_only.in_sections(&root.join("page").join("about.md")));

        let everything = ContentIndex::new(root.to_path_buf(), Vec::new());
        assert_eq!(everything.discover(&mut SyncReport::new()).unwrap().len(), 2);
    }

    #[test]
    fn test_is_article_path() {
        assert!(ContentIndex::is_article_path(Path::new("a.md")));
        assert!(ContentIndex::is_article_path(Path::new("a.MD")));
        assert!(ContentIndex::is_article_path(Path::new("a.markdown")));
        assert!(!ContentIndex::is_article_path(Path::new("a.txt")));
        assert!(!ContentIndex::is_article_path(Path::new("README")));
    }
}
