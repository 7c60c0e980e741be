//! Parsers for Hugo content files

pub mod content_index;
pub mod excerpt;
pub mod frontmatter;

pub use content_index::ContentIndex;
pub use excerpt::generate_excerpt;
pub use frontmatter::{normalize_date, FrontmatterParser, ParsedArticle};
