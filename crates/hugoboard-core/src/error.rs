//! Error types for hugoboard-core
//!
//! Parse failures are isolated per file and collected in a [`SyncReport`];
//! store failures propagate to the caller of the cache operation.

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Core error type for hugoboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Invalid path: {path} - {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("Article already exists: {path}")]
    ArticleExists { path: PathBuf },

    // ===================
    // Parse Errors
    // ===================
    #[error("File is not valid UTF-8: {path}")]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Failed to parse YAML in {path}: {message}")]
    YamlParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse TOML in {path}: {message}")]
    TomlParse {
        path: PathBuf,
        message: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid frontmatter in {path}: {message}")]
    FrontmatterParse { path: PathBuf, message: String },

    // ===================
    // Store Errors
    // ===================
    #[error("Cache store failed to {operation}")]
    Store {
        operation: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Corrupt cache row for {path}")]
    CacheDecode {
        path: String,
        #[source]
        source: bincode::Error,
    },

    #[error("Failed to create cache directory: {path}")]
    CacheDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata cache lock poisoned")]
    LockPoisoned,

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CoreError {
    /// Wrap a rusqlite error with the operation that failed
    pub fn store(operation: impl Into<String>, source: rusqlite::Error) -> Self {
        CoreError::Store {
            operation: operation.into(),
            source,
        }
    }

    /// Map an IO error on `path` to `FileNotFound` or `FileRead`
    pub fn from_read(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            CoreError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            CoreError::FileRead {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// True for failures caused by a single source file (recorded, file skipped)
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            CoreError::FileRead { .. }
                | CoreError::FileNotFound { .. }
                | CoreError::Encoding { .. }
                | CoreError::YamlParse { .. }
                | CoreError::TomlParse { .. }
                | CoreError::FrontmatterParse { .. }
        )
    }

    /// True when the persistent table itself could not be read or written
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            CoreError::Store { .. }
                | CoreError::CacheDecode { .. }
                | CoreError::CacheDirectory { .. }
                | CoreError::LockPoisoned
        )
    }
}

/// Severity level for errors during a synchronization pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Non-critical, can continue with degraded functionality
    Warning,
    /// The file was skipped
    Error,
}

/// Individual error entry in a sync report
#[derive(Debug, Clone)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    /// Create user-friendly error from CoreError with context-aware suggestions
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let source = source.into();
        let (message, suggestion) = match error {
            CoreError::FileNotFound { path } => (
                format!("File not found: {}", path.display()),
                Some(format!("Check if file exists: ls {}", path.display())),
            ),
            CoreError::FileRead { path, .. } => (
                format!("Cannot read file: {}", path.display()),
                Some(format!("Check permissions: chmod +r {}", path.display())),
            ),
            CoreError::Encoding { path, .. } => (
                format!("Not valid UTF-8: {}", path.display()),
                Some(format!("Re-encode the file: iconv -t UTF-8 {}", path.display())),
            ),
            CoreError::YamlParse { path, message, .. } => (
                format!("Invalid YAML frontmatter in {}: {}", path.display(), message),
                Some("Check the block between the leading '---' lines".to_string()),
            ),
            CoreError::TomlParse { path, message, .. } => (
                format!("Invalid TOML frontmatter in {}: {}", path.display(), message),
                Some("Check the block between the leading '+++' lines".to_string()),
            ),
            CoreError::FrontmatterParse { path, message } => (
                format!("Invalid frontmatter in {}: {}", path.display(), message),
                None,
            ),
            _ => (error.to_string(), None),
        };

        Self {
            source,
            message,
            severity: ErrorSeverity::Error,
            suggestion,
        }
    }
}

/// Outcome of one synchronization pass
///
/// A pass never aborts on a single bad file: failures are collected here and
/// everything that parsed stays cached.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub errors: Vec<LoadError>,
    /// Article files found under the content sections
    pub discovered: usize,
    /// Files parsed and written to the cache during this pass
    pub reparsed: usize,
    /// Files whose cached mtime still matched
    pub unchanged: usize,
    /// Cached rows deleted because their file is gone (or no longer parses)
    pub removed: usize,
    /// Placeholder files with neither title nor body
    pub skipped_empty: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::warning(source, message));
    }

    /// Record a per-file failure
    pub fn add_failure(&mut self, path: &Path, error: &CoreError) {
        self.failed += 1;
        self.errors
            .push(LoadError::from_core_error(path.display().to_string(), error));
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Paths that were skipped because they failed to parse, with the reason
    pub fn failed_paths(&self) -> impl Iterator<Item = (&str, &str)> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Error)
            .map(|e| (e.source.as_str(), e.message.as_str()))
    }

    /// Returns (warnings, errors)
    pub fn error_count(&self) -> (usize, usize) {
        let warnings = self
            .errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
            .count();
        let errors = self
            .errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Error)
            .count();
        (warnings, errors)
    }
}

/// Degraded state indicator for the blog store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedState {
    /// Everything synchronized successfully
    Healthy,
    /// Some articles could not be cached
    PartialData { failed: usize, reason: String },
}

impl DegradedState {
    pub fn from_report(report: &SyncReport) -> Self {
        if report.failed == 0 {
            DegradedState::Healthy
        } else {
            DegradedState::PartialData {
                failed: report.failed,
                reason: format!("{} article(s) skipped during sync", report.failed),
            }
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, DegradedState::Healthy)
    }

    pub fn is_degraded(&self) -> bool {
        !self.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_severity_counting() {
        let mut report = SyncReport::new();
        report.add_warning("content", "Section missing");
        report.add_failure(
            Path::new("post/a.md"),
            &CoreError::FrontmatterParse {
                path: PathBuf::from("post/a.md"),
                message: "Parse error".into(),
            },
        );

        assert_eq!(report.error_count(), (1, 1));
        assert!(report.has_errors());
    }

    #[test]
    fn test_failed_paths_lists_only_file_failures() {
        let mut report = SyncReport::new();
        report.add_warning("content", "Section missing");
        report.add_failure(
            Path::new("/blog/content/post/bad.md"),
            &CoreError::FrontmatterParse {
                path: PathBuf::from("/blog/content/post/bad.md"),
                message: "unterminated block".into(),
            },
        );

        let failed: Vec<_> = report.failed_paths().collect();
        assert_eq!(report.failed, 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "/blog/content/post/bad.md");
        assert!(failed[0].1.contains("unterminated block"));
    }

    #[test]
    fn test_error_classification() {
        let parse = CoreError::FrontmatterParse {
            path: PathBuf::from("a.md"),
            message: "x".into(),
        };
        assert!(parse.is_parse_error());
        assert!(!parse.is_store_error());

        let store = CoreError::store("read row", rusqlite::Error::QueryReturnedNoRows);
        assert!(store.is_store_error());
        assert!(!store.is_parse_error());
    }

    #[test]
    fn test_degraded_state_from_report() {
        let report = SyncReport::new();
        assert!(DegradedState::from_report(&report).is_healthy());

        let mut report = SyncReport::new();
        report.add_failure(
            Path::new("x.md"),
            &CoreError::FileNotFound {
                path: PathBuf::from("x.md"),
            },
        );
        assert!(DegradedState::from_report(&report).is_degraded());
    }
}
