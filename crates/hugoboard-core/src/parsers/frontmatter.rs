//! Parser for Hugo article frontmatter
//!
//! Reads a markdown file, splits off the YAML (`---`) or TOML (`+++`)
//! frontmatter block and normalizes the loosely typed fields into a
//! [`CachedArticle`]. Normalization happens here, once: downstream code never
//! has to care whether `tags` was a string or a list, or whether `date` was
//! text or a native datetime.

use crate::error::CoreError;
use crate::models::{mtime_seconds, CachedArticle, DATE_FORMAT};
use crate::parsers::excerpt::{generate_excerpt, DEFAULT_EXCERPT_CHARS};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};
use std::path::{Component, Path};
use tracing::trace;

const YAML_DELIMITER: &str = "---";
const TOML_DELIMITER: &str = "+++";

/// Naive layouts accepted for `date`, tried in order after RFC 3339
/// Offset layouts beyond RFC 3339; the YAML 1.1 form puts a space before the offset
const OFFSET_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f %:z"];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Frontmatter syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontmatterFormat {
    Yaml,
    Toml,
}

/// A markdown document split into its frontmatter block and body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitDocument<'a> {
    pub frontmatter: Option<(FrontmatterFormat, &'a str)>,
    pub body: &'a str,
}

/// Result of parsing one article file
#[derive(Debug, Clone)]
pub struct ParsedArticle {
    pub article: CachedArticle,
    /// No title and a blank body (placeholder files are not cached)
    pub empty: bool,
}

/// Parser for article files
#[derive(Debug, Clone)]
pub struct FrontmatterParser {
    excerpt_chars: usize,
}

impl Default for FrontmatterParser {
    fn default() -> Self {
        Self {
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl FrontmatterParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_excerpt_chars(mut self, chars: usize) -> Self {
        self.excerpt_chars = chars;
        self
    }

    /// Parse an article file located under `content_root`
    pub fn parse_file(&self, path: &Path, content_root: &Path) -> Result<ParsedArticle, CoreError> {
        let relative_path = relative_to_root(path, content_root)?;

        // Stat before reading so a concurrent save shows up as stale next pass
        let metadata = std::fs::metadata(path).map_err(|e| CoreError::from_read(path, e))?;
        if !metadata.is_file() {
            return Err(CoreError::InvalidPath {
                path: path.to_path_buf(),
                reason: "not a regular file".to_string(),
            });
        }
        let mtime = metadata
            .modified()
            .map_err(|e| CoreError::from_read(path, e))?;

        let bytes = std::fs::read(path).map_err(|e| CoreError::from_read(path, e))?;
        let content = String::from_utf8(bytes).map_err(|source| CoreError::Encoding {
            path: path.to_path_buf(),
            source,
        })?;

        let mut parsed = self.parse_str(&content, path, relative_path)?;
        parsed.article.mod_time = mtime_seconds(mtime);
        Ok(parsed)
    }

    /// Parse article text; `mod_time` is left at zero
    pub fn parse_str(
        &self,
        content: &str,
        path: &Path,
        relative_path: String,
    ) -> Result<ParsedArticle, CoreError> {
        let doc = split_frontmatter(content).map_err(|message| CoreError::FrontmatterParse {
            path: path.to_path_buf(),
            message,
        })?;

        let fields = match doc.frontmatter {
            Some((FrontmatterFormat::Yaml, raw)) => parse_yaml_block(raw, path)?,
            Some((FrontmatterFormat::Toml, raw)) => parse_toml_block(raw, path)?,
            None => Mapping::new(),
        };

        let mut article = CachedArticle::from_path(path, relative_path);
        article.title = string_field(&fields, "title");
        article.description = string_field(&fields, "description");
        article.date = date_field(&fields, "date");
        article.tags = terms_field(&fields, "tags");
        article.categories = terms_field(&fields, "categories");
        article.draft = bool_field(&fields, "draft");
        article.excerpt = generate_excerpt(doc.body, self.excerpt_chars);

        let empty = article.title.is_empty() && doc.body.trim().is_empty();

        trace!(
            path = %path.display(),
            tags = article.tags.len(),
            categories = article.categories.len(),
            "Parsed article frontmatter"
        );

        Ok(ParsedArticle { article, empty })
    }
}

/// Split content into frontmatter and body
///
/// The opening delimiter must be the first line. Without one the whole text is
/// body. An opening delimiter without a matching closing line is an error.
pub fn split_frontmatter(content: &str) -> Result<SplitDocument<'_>, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let first_line_end = content.find('\n').unwrap_or(content.len());
    let first_line = content[..first_line_end].trim_end();
    let format = match first_line {
        YAML_DELIMITER => FrontmatterFormat::Yaml,
        TOML_DELIMITER => FrontmatterFormat::Toml,
        _ => {
            return Ok(SplitDocument {
                frontmatter: None,
                body: content,
            })
        }
    };
    let delimiter = match format {
        FrontmatterFormat::Yaml => YAML_DELIMITER,
        FrontmatterFormat::Toml => TOML_DELIMITER,
    };

    let block_start = (first_line_end + 1).min(content.len());
    let mut offset = block_start;
    for line in content[block_start..].split_inclusive('\n') {
        if line.trim_end() == delimiter {
            return Ok(SplitDocument {
                frontmatter: Some((format, &content[block_start..offset])),
                body: &content[offset + line.len()..],
            });
        }
        offset += line.len();
    }

    Err(format!("missing closing '{}' line", delimiter))
}

fn parse_yaml_block(raw: &str, path: &Path) -> Result<Mapping, CoreError> {
    if raw.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let value: Value = serde_yaml::from_str(raw).map_err(|source| CoreError::YamlParse {
        path: path.to_path_buf(),
        message: source.to_string(),
        source,
    })?;
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(CoreError::FrontmatterParse {
            path: path.to_path_buf(),
            message: "frontmatter is not a key/value mapping".to_string(),
        }),
    }
}

fn parse_toml_block(raw: &str, path: &Path) -> Result<Mapping, CoreError> {
    let table: toml::Table = toml::from_str(raw).map_err(|source| CoreError::TomlParse {
        path: path.to_path_buf(),
        message: source.message().to_string(),
        source,
    })?;
    let mut map = Mapping::new();
    for (key, value) in table {
        map.insert(Value::String(key), toml_to_yaml(value));
    }
    Ok(map)
}

/// Bring TOML values into the YAML value model; datetimes become text
fn toml_to_yaml(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => Value::Number(f.into()),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Sequence(items.into_iter().map(toml_to_yaml).collect()),
        toml::Value::Table(table) => {
            let mut map = Mapping::new();
            for (key, value) in table {
                map.insert(Value::String(key), toml_to_yaml(value));
            }
            Value::Mapping(map)
        }
    }
}

// ===================
// Typed accessors
// ===================

/// Hugo treats frontmatter keys case-insensitively
fn lookup<'a>(fields: &'a Mapping, key: &str) -> Option<&'a Value> {
    fields.iter().find_map(|(k, v)| match k {
        Value::String(name) if name.eq_ignore_ascii_case(key) => Some(untag(v)),
        _ => None,
    })
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

/// Scalars as text; null and collections have no text form
fn scalar_text(value: &Value) -> Option<String> {
    match untag(value) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn string_field(fields: &Mapping, key: &str) -> String {
    lookup(fields, key)
        .and_then(scalar_text)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// A list of scalars, or a single string as a one-element list
pub(crate) fn terms_field(fields: &Mapping, key: &str) -> Vec<String> {
    let Some(value) = lookup(fields, key) else {
        return Vec::new();
    };

    let raw: Vec<String> = match untag(value) {
        Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    };

    raw.into_iter()
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty())
        .collect()
}

pub(crate) fn bool_field(fields: &Mapping, key: &str) -> bool {
    match lookup(fields, key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub(crate) fn date_field(fields: &Mapping, key: &str) -> String {
    match lookup(fields, key) {
        Some(Value::String(s)) => normalize_date(s),
        _ => String::new(),
    }
}

/// Normalize a frontmatter date to `YYYY-MM-DD HH:MM:SS`
///
/// Keeps the wall-clock time as written (offsets are dropped, not converted).
/// Returns an empty string for anything unrecognized.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.naive_local().format(DATE_FORMAT).to_string();
    }
    for layout in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, layout) {
            return dt.naive_local().format(DATE_FORMAT).to_string();
        }
    }
    for layout in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return dt.format(DATE_FORMAT).to_string();
        }
    }
    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return dt.format(DATE_FORMAT).to_string();
    }

    String::new()
}

/// `path` relative to `content_root`, with `/` separators
pub fn relative_to_root(path: &Path, content_root: &Path) -> Result<String, CoreError> {
    let relative = path
        .strip_prefix(content_root)
        .map_err(|_| CoreError::InvalidPath {
            path: path.to_path_buf(),
            reason: format!("not under content root {}", content_root.display()),
        })?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(parts.join("/"))
}
