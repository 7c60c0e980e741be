//! Layered console configuration
//!
//! Precedence (lowest to highest): built-in defaults, the user config at
//! `<config_dir>/hugoboard/config.toml`, the site config at
//! `<site>/hugoboard.toml`, an explicit `--config` file, then CLI flags
//! (applied by the binary on the returned value).

use crate::error::CoreError;
use crate::models::DEFAULT_PAGE_SIZE;
use crate::parsers::excerpt::DEFAULT_EXCERPT_CHARS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Site-local config file name
pub const SITE_CONFIG_FILE: &str = "hugoboard.toml";

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Hugo site root (the directory holding `content/`)
    pub site_root: PathBuf,

    /// Content directory, relative to the site root unless absolute
    pub content_dir: PathBuf,

    /// Sections scanned for articles; empty scans the whole content directory
    pub sections: Vec<String>,

    /// Cache directory, relative to the site root unless absolute
    pub cache_dir: PathBuf,

    /// Excerpt length in characters
    pub excerpt_chars: usize,

    /// Default listing page size
    pub page_size: usize,
}

impl ConsoleConfig {
    /// Defaults for a site
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
            content_dir: PathBuf::from("content"),
            sections: vec!["post".to_string()],
            cache_dir: PathBuf::from(".hugoboard"),
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// The one root every article path is computed against
    pub fn content_root(&self) -> PathBuf {
        self.site_root.join(&self.content_dir)
    }

    /// Directory holding `cache.db`
    pub fn cache_path(&self) -> PathBuf {
        self.site_root.join(&self.cache_dir)
    }

    /// Section that new articles are created in
    pub fn primary_section(&self) -> Option<&str> {
        self.sections.first().map(String::as_str)
    }

    /// `<config_dir>/hugoboard/config.toml`, when the platform has a config dir
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hugoboard").join("config.toml"))
    }

    pub fn site_config_path(site_root: &Path) -> PathBuf {
        site_root.join(SITE_CONFIG_FILE)
    }

    /// Resolve the layered configuration
    ///
    /// `site_root` comes from the CLI; without it the explicit file, then the
    /// user file, may name one, falling back to the current directory.
    pub fn load(site_root: Option<PathBuf>, explicit: Option<&Path>) -> Result<Self, CoreError> {
        let user = match Self::user_config_path() {
            Some(path) => ConfigLayer::load_optional(&path)?,
            None => None,
        };
        let explicit = match explicit {
            Some(path) => Some(ConfigLayer::load(path)?),
            None => None,
        };

        let site_root = site_root
            .or_else(|| explicit.as_ref().and_then(|l| l.site_root.clone()))
            .or_else(|| user.as_ref().and_then(|l| l.site_root.clone()))
            .unwrap_or_else(|| PathBuf::from("."));

        let site = ConfigLayer::load_optional(&Self::site_config_path(&site_root))?;

        let mut config = Self::new(site_root);
        for layer in [user, site, explicit].into_iter().flatten() {
            config.apply(layer);
        }

        config.validate()?;
        debug!(
            site_root = %config.site_root.display(),
            content_root = %config.content_root().display(),
            sections = ?config.sections,
            "Configuration resolved"
        );
        Ok(config)
    }

    /// Overlay the keys a layer sets; `site_root` is left alone
    pub fn apply(&mut self, layer: ConfigLayer) {
        if let Some(dir) = layer.content_dir {
            self.content_dir = dir;
        }
        if let Some(sections) = layer.sections {
            self.sections = sections;
        }
        if let Some(dir) = layer.cache_dir {
            self.cache_dir = dir;
        }
        if let Some(chars) = layer.excerpt_chars {
            self.excerpt_chars = chars;
        }
        if let Some(size) = layer.page_size {
            self.page_size = size;
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.page_size == 0 {
            return Err(CoreError::InvalidConfig {
                message: "page_size must be at least 1".to_string(),
            });
        }
        if let Some(bad) = self
            .sections
            .iter()
            .find(|s| s.trim().is_empty() || Path::new(s.as_str()).is_absolute() || s.contains(".."))
        {
            return Err(CoreError::InvalidConfig {
                message: format!("invalid section name: {:?}", bad),
            });
        }
        Ok(())
    }
}

/// One config file; every key optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub site_root: Option<PathBuf>,
    pub content_dir: Option<PathBuf>,
    pub sections: Option<Vec<String>>,
    pub cache_dir: Option<PathBuf>,
    pub excerpt_chars: Option<usize>,
    pub page_size: Option<usize>,
}

impl ConfigLayer {
    pub fn parse(content: &str, origin: &Path) -> Result<Self, CoreError> {
        toml::from_str(content).map_err(|e| CoreError::InvalidConfig {
            message: format!("{}: {}", origin.display(), e.message()),
        })
    }

    /// Load a file that must exist
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CoreError::from_read(path, e))?;
        Self::parse(&content, path)
    }

    /// Load a file if present
    pub fn load_optional(path: &Path) -> Result<Option<Self>, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let layer = Self::parse(&content, path)?;
                debug!(path = %path.display(), "Loaded config layer");
                Ok(Some(layer))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable config file");
                Err(CoreError::from_read(path, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = ConsoleConfig::new("/blog");
        assert_eq!(config.content_root(), PathBuf::from("/blog/content"));
        assert_eq!(config.cache_path(), PathBuf::from("/blog/.hugoboard"));
        assert_eq!(config.primary_section(), Some("post"));
        assert_eq!(config.page_size, 20);
        assert_eq!(config.excerpt_chars, 200);
    }

    #[test]
    fn test_layers_override_in_order() {
        let dir = tempdir().unwrap();
        let site = dir.path();
        fs::write(
            site.join(SITE_CONFIG_FILE),
            "sections = [\"posts\", \"notes\"]\npage_size = 5\n",
        )
        .unwrap();
        let explicit = dir.path().join("override.toml");
        fs::write(&explicit, "page_size = 50\n").unwrap();

        let config = ConsoleConfig::load(Some(site.to_path_buf()), Some(&explicit)).unwrap();
        assert_eq!(config.sections, vec!["posts", "notes"]);
        assert_eq!(config.page_size, 50);
        assert_eq!(config.site_root, site);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = ConfigLayer::parse("colour = \"red\"\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = ConsoleConfig::load(Some(dir.path().to_path_buf()), Some(&missing)).unwrap_err();
        assert!(matches!(err, CoreError::FileNotFound { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ConsoleConfig::new("/blog");
        config.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = ConsoleConfig::new("/blog");
        config.sections = vec!["../outside".to_string()];
        assert!(config.validate().is_err());
    }
}
