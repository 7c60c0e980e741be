//! CLI output for article listings and cache maintenance
//!
//! Formatters take core types and return strings; `main` does the printing.

use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use hugoboard_core::cache::CacheStats;
use hugoboard_core::error::CoreError;
use hugoboard_core::models::{ArticlePage, CachedArticle, TermCount};
use hugoboard_core::{DegradedState, SyncReport};
use serde::Serialize;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug)]
pub enum CliError {
    NotFound { path: String },
    Core(CoreError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NotFound { path } => {
                write!(f, "No article at '{}' (paths are relative to the content root)", path)
            }
            CliError::Core(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<CoreError> for CliError {
    fn from(e: CoreError) -> Self {
        CliError::Core(e)
    }
}

// ============================================================================
// Formatters
// ============================================================================

/// Listing page as a table (human) or JSON
pub fn format_article_table(page: &ArticlePage, json: bool, no_color: bool) -> String {
    if json {
        return to_json(page, "{}");
    }

    if page.articles.is_empty() {
        return if page.total == 0 {
            "No articles found.".to_string()
        } else {
            format!("Page {} is past the end ({} articles).", page.page, page.total)
        };
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header(&["Date", "Title", "Tags", "Categories", "Draft", "Path"], no_color));

    for article in &page.articles {
        let title = if article.title.is_empty() {
            "(untitled)".to_string()
        } else {
            truncate(&article.title, 40)
        };
        let draft = if article.draft { "yes" } else { "" };

        table.add_row(Row::from(vec![
            article.date_display().to_string(),
            title,
            truncate(&article.tags.join(", "), 30),
            truncate(&article.categories.join(", "), 20),
            draft.to_string(),
            article.relative_path.clone(),
        ]));
    }

    format!(
        "{}\nPage {}/{} ({} articles)",
        table,
        page.page,
        page.total_pages().max(1),
        page.total
    )
}

/// Tag or category counts
pub fn format_term_table(counts: &[TermCount], label: &str, json: bool, no_color: bool) -> String {
    if json {
        return to_json(counts, "[]");
    }

    if counts.is_empty() {
        return format!("No article has a {}.", label.to_lowercase());
    }

    let mut table = Table::new();
    table.set_header(header(&[label, "Articles"], no_color));
    for term in counts {
        table.add_row(Row::from(vec![term.name.clone(), term.count.to_string()]));
    }
    table.to_string()
}

/// Single article details (human or JSON)
pub fn format_article_info(article: &CachedArticle, json: bool) -> String {
    if json {
        return to_json(article, "{}");
    }

    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };

    let mut lines = vec![];
    lines.push(format!("Title:        {}", or_dash(&article.title)));
    lines.push(format!("Path:         {}", article.relative_path));
    lines.push(format!("File:         {}", article.path));
    lines.push(format!("Date:         {}", or_dash(&article.date)));
    lines.push(format!("Draft:        {}", article.draft));
    lines.push(format!("Tags:         {}", or_dash(&article.tags.join(", "))));
    lines.push(format!("Categories:   {}", or_dash(&article.categories.join(", "))));
    lines.push(format!("Description:  {}", or_dash(&article.description)));
    lines.push(format!("Modified:     {}", article.mod_time_display()));
    lines.push(format!(
        "Cached at:    {}",
        article
            .cached_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string())
    ));
    lines.push(String::new());
    lines.push(or_dash(&article.excerpt));

    lines.join("\n")
}

/// One-paragraph summary of a sync pass, with the files that failed
pub fn format_sync_report(report: &SyncReport, label: &str) -> String {
    let mut lines = vec![format!(
        "{} complete in {}ms: {} articles, {} re-parsed, {} unchanged, {} removed",
        label,
        report.duration.as_millis(),
        report.discovered,
        report.reparsed,
        report.unchanged,
        report.removed
    )];

    if report.skipped_empty > 0 {
        lines.push(format!("  {} empty placeholder(s) skipped", report.skipped_empty));
    }

    for error in &report.errors {
        lines.push(format!("  - {}: {}", error.source, error.message));
        if let Some(suggestion) = &error.suggestion {
            lines.push(format!("    hint: {}", suggestion));
        }
    }

    lines.join("\n")
}

pub fn format_stats(stats: &CacheStats, state: &DegradedState, location: &str) -> String {
    let mut lines = vec![];
    lines.push("hugoboard - Cache Statistics".to_string());
    lines.push("============================".to_string());
    lines.push(String::new());
    lines.push(format!("Articles:         {}", stats.total_articles));
    lines.push(format!("  Drafts:         {}", stats.draft_count));
    lines.push(format!("Distinct tags:    {}", stats.tag_count));
    lines.push(format!("Categories:       {}", stats.category_count));
    lines.push(format!("Cached data:      {}", format_size(stats.total_size_bytes as u64)));
    lines.push(format!("Location:         {}", location));
    if let DegradedState::PartialData { reason, .. } = state {
        lines.push(String::new());
        lines.push(format!("Warning: {}", reason));
    }
    lines.join("\n")
}

// ============================================================================
// Utilities
// ============================================================================

fn header(labels: &[&str], no_color: bool) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| {
            let cell = Cell::new(label);
            if no_color {
                cell
            } else {
                cell.fg(Color::Cyan)
            }
        })
        .collect()
}

fn to_json<T: Serialize + ?Sized>(value: &T, fallback: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| fallback.to_string())
}

pub fn format_size(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1_024 {
        format!("{:.1}KB", bytes as f64 / 1_024.0)
    } else {
        format!("{}B", bytes)
    }
}

fn truncate(s: &str, max: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max {
        s.to_string()
    } else {
        // Char-based so multi-byte titles don't panic
        s.chars().take(max - 1).collect::<String>() + "…"
    }
}

// ============================================================================
// Tests
// ============================================================================
