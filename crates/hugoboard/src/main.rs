//! hugoboard - Local console for a Hugo blog

mod cli;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use hugoboard_core::cache::CACHE_FILE_NAME;
use hugoboard_core::{ArticleEditor, ArticleFilter, BlogStore, ConsoleConfig, DraftFilter};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "hugoboard",
    version,
    about = "Local console for a Hugo blog",
    long_about = "Lists, searches and authors articles of a Hugo site.\n\
                  \n\
                  Article metadata is cached in SQLite and kept in sync with the content\n\
                  tree by file modification time, so listings never re-read every file.\n\
                  \n\
                  Examples:\n\
                    hugoboard list                       # Newest articles first\n\
                    hugoboard list --tag rust --page 2   # Filter and paginate\n\
                    hugoboard tags                       # Tag usage counts\n\
                    hugoboard new \"My next post\"         # Create a draft bundle\n\
                    hugoboard rebuild                    # Re-parse every article\n\
                  \n\
                  Environment Variables:\n\
                    HUGOBOARD_SITE_ROOT              # Hugo site directory\n\
                    HUGOBOARD_NO_COLOR               # Disable ANSI colors\n\
                    HUGOBOARD_LOG                    # Log filter (e.g. debug, hugoboard_core=trace)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Hugo site root (default: current directory)
    #[arg(long, global = true, env = "HUGOBOARD_SITE_ROOT")]
    site_root: Option<PathBuf>,

    /// Extra config file, applied over user and site config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory (default: <site>/.hugoboard)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Disable ANSI colors (log-friendly)
    #[arg(long, global = true, env = "HUGOBOARD_NO_COLOR")]
    no_color: bool,

    /// Verbose logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Bring the cache up to date with the content tree
    Sync,
    /// Re-parse every article regardless of modification time
    Rebuild,
    /// List articles, newest first
    List {
        /// Substring matched against title, description and excerpt
        #[arg(long, short = 'q')]
        query: Option<String>,
        /// Exact tag
        #[arg(long, short = 't')]
        tag: Option<String>,
        /// Exact category
        #[arg(long, short = 'c')]
        category: Option<String>,
        /// Only drafts
        #[arg(long, conflicts_with = "published")]
        drafts: bool,
        /// Only published articles
        #[arg(long)]
        published: bool,
        /// Page number (1-based)
        #[arg(long, short = 'p', default_value = "1")]
        page: usize,
        /// Articles per page (default: config page_size)
        #[arg(long, short = 'n')]
        per_page: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Tag usage counts
    Tags {
        #[arg(long)]
        json: bool,
    },
    /// Category usage counts
    Categories {
        #[arg(long)]
        json: bool,
    },
    /// Show one article's cached metadata
    Info {
        /// Article path, relative to the content root or absolute
        path: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a draft article bundle
    New {
        /// Article title
        title: String,
    },
    /// Print cache statistics
    Stats,
    /// Delete the cache database and exit
    ClearCache,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.no_color);

    let config = load_config(&cli)?;
    let no_color = cli.no_color;

    match cli.command {
        Command::ClearCache => run_clear_cache(&config.cache_path()),
        Command::Sync => run_sync(&config, false),
        Command::Rebuild => run_sync(&config, true),
        Command::List {
            query,
            tag,
            category,
            drafts,
            published,
            page,
            per_page,
            json,
        } => {
            let draft = match (drafts, published) {
                (true, _) => DraftFilter::Drafts,
                (_, true) => DraftFilter::Published,
                _ => DraftFilter::All,
            };
            let mut filter = ArticleFilter::new()
                .with_draft(draft)
                .with_page(page, per_page.unwrap_or(config.page_size));
            filter.query = query;
            filter.tag = tag;
            filter.category = category;
            run_list(&config, &filter, json, no_color)
        }
        Command::Tags { json } => run_terms(&config, "Tag", json, no_color),
        Command::Categories { json } => run_terms(&config, "Category", json, no_color),
        Command::Info { path, json } => run_info(&config, &path, json),
        Command::New { title } => run_new(&config, &title),
        Command::Stats => run_stats(&config),
    }
}

fn init_tracing(verbose: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("HUGOBOARD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .init();
}

fn load_config(cli: &Cli) -> Result<ConsoleConfig> {
    let mut config = ConsoleConfig::load(cli.site_root.clone(), cli.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(cache_dir) = &cli.cache_dir {
        config.cache_dir = cache_dir.clone();
    }

    config.site_root = std::fs::canonicalize(&config.site_root).with_context(|| {
        format!("Site root not found: {}", config.site_root.display())
    })?;

    debug!(
        site_root = %config.site_root.display(),
        cache = %config.cache_path().display(),
        "Using site"
    );
    Ok(config)
}

fn open_store(config: &ConsoleConfig) -> Result<BlogStore> {
    BlogStore::open(config).with_context(|| {
        format!("Failed to open cache in {}", config.cache_path().display())
    })
}

fn run_sync(config: &ConsoleConfig, force: bool) -> Result<()> {
    let store = open_store(config)?;

    let (report, label) = if force {
        (store.force_rebuild()?, "Rebuild")
    } else {
        (store.refresh()?, "Sync")
    };

    println!("{}", cli::format_sync_report(&report, label));
    store.close()?;
    Ok(())
}

fn run_list(config: &ConsoleConfig, filter: &ArticleFilter, json: bool, no_color: bool) -> Result<()> {
    let store = open_store(config)?;
    let page = store.list(filter)?;

    println!("{}", cli::format_article_table(&page, json, no_color));
    warn_if_degraded(&store);
    store.close()?;
    Ok(())
}

fn run_terms(config: &ConsoleConfig, label: &str, json: bool, no_color: bool) -> Result<()> {
    let store = open_store(config)?;
    let counts = if label == "Tag" {
        store.tag_counts()?
    } else {
        store.category_counts()?
    };

    println!("{}", cli::format_term_table(&counts, label, json, no_color));
    store.close()?;
    Ok(())
}

fn run_info(config: &ConsoleConfig, path: &Path, json: bool) -> Result<()> {
    let store = open_store(config)?;

    let article = store.get(path)?.ok_or_else(|| cli::CliError::NotFound {
        path: path.display().to_string(),
    })?;

    println!("{}", cli::format_article_info(&article, json));
    store.close()?;
    Ok(())
}

fn run_new(config: &ConsoleConfig, title: &str) -> Result<()> {
    let store = open_store(config)?;
    let editor = ArticleEditor::new(&store);

    let relative = editor
        .create(title, Local::now().fixed_offset())
        .map_err(cli::CliError::from)?;

    println!("✅ Created {}", relative);
    println!("   File: {}", store.content_root().join(&relative).display());
    store.close()?;
    Ok(())
}

fn run_stats(config: &ConsoleConfig) -> Result<()> {
    let store = open_store(config)?;
    store.initialize()?;

    let stats = store.stats()?;
    let location = store.cache().cache_path().display().to_string();
    println!("{}", cli::format_stats(&stats, &store.degraded_state(), &location));
    store.close()?;
    Ok(())
}

fn warn_if_degraded(store: &BlogStore) {
    if let hugoboard_core::DegradedState::PartialData { reason, .. } = store.degraded_state() {
        eprintln!("⚠ {} (run `hugoboard sync` for details)", reason);
    }
}

fn run_clear_cache(cache_dir: &Path) -> Result<()> {
    let cache_path = cache_dir.join(CACHE_FILE_NAME);

    if !cache_path.exists() {
        println!("❌ Cache not found at: {}", cache_path.display());
        println!("   Nothing to clear.");
        return Ok(());
    }

    // Get file size before deletion
    let size_bytes = std::fs::metadata(&cache_path)
        .with_context(|| format!("Failed to read cache metadata: {}", cache_path.display()))?
        .len();

    std::fs::remove_file(&cache_path)
        .with_context(|| format!("Failed to delete cache: {}", cache_path.display()))?;

    // Delete WAL files if they exist
    for suffix in ["-wal", "-shm"] {
        let sidecar = cache_dir.join(format!("{}{}", CACHE_FILE_NAME, suffix));
        if sidecar.exists() {
            let _ = std::fs::remove_file(&sidecar);
        }
    }

    println!("✅ Cache cleared successfully");
    println!("   Location: {}", cache_path.display());
    println!("   Freed: {}", cli::format_size(size_bytes));
    println!();
    println!("💡 Next run will rebuild the cache from the content tree.");

    Ok(())
}
