//! Plain-text excerpts from markdown bodies

use once_cell::sync::Lazy;
use regex::Regex;

/// Default excerpt length in characters
pub const DEFAULT_EXCERPT_CHARS: usize = 200;

static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#+ ").expect("valid heading regex"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link regex"));
static EMPHASIS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_`]").expect("valid emphasis regex"));

/// Strip common markdown syntax and keep the first `max_chars` characters
///
/// Truncated excerpts end with `...`.
pub fn generate_excerpt(body: &str, max_chars: usize) -> String {
    if body.trim().is_empty() {
        return String::new();
    }

    let text = HEADING_RE.replace_all(body, "");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = EMPHASIS_RE.replace_all(&text, "");
    let text = text.trim();

    let mut chars = text.chars();
    let mut excerpt: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        excerpt.push_str("...");
    }
    excerpt
}
