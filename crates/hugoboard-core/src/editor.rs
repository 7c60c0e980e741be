//! Article authoring
//!
//! Thin file operations over the content root that keep the cache in step:
//! every write or delete goes through the store hooks.

use crate::error::CoreError;
use crate::store::BlogStore;
use chrono::{DateTime, FixedOffset};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const NEW_ARTICLE_BODY: &str = "Write your post here.\n";

/// Creates, reads, saves and removes articles for one store
pub struct ArticleEditor<'a> {
    store: &'a BlogStore,
}

impl<'a> ArticleEditor<'a> {
    pub fn new(store: &'a BlogStore) -> Self {
        Self { store }
    }

    /// Absolute path under the content root; `..` escapes are rejected
    pub fn resolve(&self, path: &Path) -> Result<PathBuf, CoreError> {
        self.store.resolve_path(path)
    }

    pub fn read(&self, path: &Path) -> Result<String, CoreError> {
        let path = self.resolve(path)?;
        fs::read_to_string(&path).map_err(|e| CoreError::from_read(&path, e))
    }

    /// Write `content` and refresh the cached row
    ///
    /// Frontmatter that no longer parses does not fail the save; the file is
    /// on disk and its row is dropped until it parses again.
    pub fn save(&self, path: &Path, content: &str) -> Result<PathBuf, CoreError> {
        let path = self.resolve(path)?;
        write_file(&path, content)?;
        self.refresh_after_write(&path)?;
        Ok(path)
    }

    /// Create a draft page bundle in the primary section
    ///
    /// Returns the new file's path relative to the content root.
    pub fn create(&self, title: &str, now: DateTime<FixedOffset>) -> Result<String, CoreError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::InvalidPath {
                path: PathBuf::new(),
                reason: "article title is empty".to_string(),
            });
        }

        let bundle = bundle_name(title, now);
        let relative = match self.store.config().primary_section() {
            Some(section) => format!("{}/{}/index.md", section, bundle),
            None => format!("{}/index.md", bundle),
        };
        let path = self.resolve(Path::new(&relative))?;

        if path.exists() {
            return Err(CoreError::ArticleExists { path });
        }

        write_file(&path, &new_article(title, now))?;
        self.refresh_after_write(&path)?;

        info!(path = %relative, "Created article");
        Ok(relative)
    }

    fn refresh_after_write(&self, path: &Path) -> Result<(), CoreError> {
        match self.store.on_saved(path) {
            Ok(_) => Ok(()),
            Err(e) if e.is_parse_error() => {
                warn!(path = %path.display(), error = %e, "Saved article does not parse, not cached");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the file and its cached row
    pub fn remove(&self, path: &Path) -> Result<(), CoreError> {
        let path = self.resolve(path)?;
        fs::remove_file(&path).map_err(|e| CoreError::from_read(&path, e))?;
        self.store.on_removed(&path)?;
        info!(path = %path.display(), "Removed article");
        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CoreError::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, content).map_err(|source| CoreError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// `<YYYY-MM-DD>-<title with spaces as dashes>`
fn bundle_name(title: &str, now: DateTime<FixedOffset>) -> String {
    let slug: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect();
    format!("{}-{}", now.format("%Y-%m-%d"), slug)
}

fn new_article(title: &str, now: DateTime<FixedOffset>) -> String {
    let title = serde_yaml::to_string(title).unwrap_or_else(|_| format!("{:?}\n", title));
    format!(
        "---\ntitle: {}date: {}\ndraft: true\ncategories: []\ntags: []\n---\n\n{}",
        title,
        now.format("%Y-%m-%dT%H:%M:%S%:z"),
        NEW_ARTICLE_BODY
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;
    use crate::models::ArticleFilter;
    use chrono::TimeZone;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, BlogStore) {
        let dir = tempdir().unwrap();
        let config = ConsoleConfig::new(dir.path());
        fs::create_dir_all(config.content_root().join("post")).unwrap();
        let store = BlogStore::open(&config).unwrap();
        (dir, store)
    }

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 10, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_create_writes_bundle_and_caches_it() {
        let (_dir, store) = setup();
        let editor = ArticleEditor::new(&store);

        let relative = editor.create("Hello Hugo World", now()).unwrap();
        assert_eq!(relative, "post/2024-03-01-Hello-Hugo-World/index.md");

        let content = editor.read(Path::new(&relative)).unwrap();
        assert!(content.contains("date: 2024-03-01T10:30:00+08:00"));
        assert!(content.contains("draft: true"));

        let article = store.get(Path::new(&relative)).unwrap().unwrap();
        assert_eq!(article.title, "Hello Hugo World");
        assert_eq!(article.date, "2024-03-01 10:30:00");
        assert!(article.draft);
        assert!(article.tags.is_empty());
    }

    #[test]
    fn test_create_refuses_to_overwrite() {
        let (_dir, store) = setup();
        let editor = ArticleEditor::new(&store);
        editor.create("Twice", now()).unwrap();

        assert!(matches!(
            editor.create("Twice", now()),
            Err(CoreError::ArticleExists { .. })
        ));
    }

    #[test]
    fn test_create_quotes_awkward_titles() {
        let (_dir, store) = setup();
        let editor = ArticleEditor::new(&store);
        let relative = editor.create("Rust: the #1 choice", now()).unwrap();

        let article = store.get(Path::new(&relative)).unwrap().unwrap();
        assert_eq!(article.title, "Rust: the #1 choice");
    }

    #[test]
    fn test_save_updates_cache() {
        let (_dir, store) = setup();
        let editor = ArticleEditor::new(&store);
        let relative = editor.create("Draft", now()).unwrap();

        editor
            .save(Path::new(&relative), "---\ntitle: Renamed\ntags: [x]\n---\nbody\n")
            .unwrap();

        let page = store.list(&ArticleFilter::new().with_tag("x")).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.articles[0].title, "Renamed");
    }

    #[test]
    fn test_save_with_broken_frontmatter_still_writes() {
        let (_dir, store) = setup();
        let editor = ArticleEditor::new(&store);
        editor
            .save(Path::new("post/x.md"), "---\ntitle: Fine\n---\nbody\n")
            .unwrap();

        let path = editor
            .save(Path::new("post/x.md"), "---\ntitle: [oops\n---\nbody\n")
            .unwrap();

        assert!(path.exists());
        assert!(store.cache().get(&path.to_string_lossy()).unwrap().is_none());
    }

    #[test]
    fn test_remove_deletes_file_and_row() {
        let (_dir, store) = setup();
        let editor = ArticleEditor::new(&store);
        let relative = editor.create("Gone soon", now()).unwrap();

        editor.remove(Path::new(&relative)).unwrap();

        assert!(!editor.resolve(Path::new(&relative)).unwrap().exists());
        assert_eq!(store.stats().unwrap().total_articles, 0);
    }

    #[test]
    fn test_paths_outside_root_are_rejected() {
        let (_dir, store) = setup();
        let editor = ArticleEditor::new(&store);

        assert!(matches!(
            editor.save(Path::new("../../etc/passwd"), "x"),
            Err(CoreError::InvalidPath { .. })
        ));
    }
}
