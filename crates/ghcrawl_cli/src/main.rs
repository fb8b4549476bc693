//! ghcrawl CLI - command-line interface for the repository metadata crawler.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ghcrawl")]
#[command(version)]
#[command(about = "A GitHub repository metadata crawler")]
#[command(
    long_about = "ghcrawl harvests repository metadata (issues, pull requests, comments, \
reviews, CI checks) for every public repository matching a star/date search \
space, into a local relational database. Runs are resumable: every write is \
an idempotent upsert, so an interrupted crawl can simply be re-run."
)]
#[command(after_long_help = r#"EXAMPLES
    Crawl with the configured defaults:
        $ ghcrawl crawl

    Crawl 500 repositories with at least 1000 stars:
        $ ghcrawl crawl --total-repos 500 --min-stars 1000

    Spread requests over several tokens:
        $ ghcrawl crawl --token ghp_aaa --token ghp_bbb

    Bring the schema up without crawling:
        $ ghcrawl migrate up

CONFIGURATION
    ghcrawl reads configuration from:
      1. ~/.config/ghcrawl/config.toml (or $XDG_CONFIG_HOME/ghcrawl/config.toml)
      2. ./ghcrawl.toml
      3. Environment variables (GHCRAWL_* prefix)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GHCRAWL_DATABASE_URL      Database connection string (default: ~/.local/state/ghcrawl/ghcrawl.db)
    GHCRAWL_GITHUB_TOKENS     Comma-separated GitHub personal access tokens
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a crawl over the configured search space
    Crawl {
        #[command(flatten)]
        args: CrawlArgs,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

/// Crawl options; every flag overrides its config-file counterpart.
#[derive(Debug, Clone, clap::Args)]
struct CrawlArgs {
    /// GitHub personal access token - can specify multiple
    #[arg(short = 't', long)]
    token: Vec<String>,

    /// Records requested per page (default from config or 50)
    #[arg(short = 'b', long)]
    batch_size: Option<u32>,

    /// Stop after this many repositories (default from config or 10000)
    #[arg(short = 'n', long)]
    total_repos: Option<usize>,

    /// Only crawl repositories with at least this many stars (default from config or 100)
    #[arg(short = 's', long)]
    min_stars: Option<u32>,

    /// Match count at which a search partition is split (default from config or 1000)
    #[arg(long)]
    partition_threshold: Option<u64>,

    /// Creation-date axis starts in this year (default from config or 2024)
    #[arg(long)]
    start_year: Option<i32>,

    /// Creation-date axis starts in this month (default from config or 1)
    #[arg(long)]
    start_month: Option<u32>,

    /// Retry attempts per request (default from config or 3)
    #[arg(short = 'r', long)]
    max_retries: Option<usize>,

    /// Concurrent repository workers (default: one per token)
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Set up graceful shutdown handler (Ctrl+C)
    let shutdown = shutdown::setup_shutdown_handler();

    // Initialize tracing for non-TTY mode (structured logging)
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("ghcrawl=info,ghcrawl_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    let database_url = config
        .database_url()
        .expect("Failed to determine database URL - this should not happen");

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        // Strip query parameters (e.g., ?mode=rwc) before path operations
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory. \
                 Consider using an absolute path.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    match cli.command {
        Commands::Crawl { args } => {
            commands::crawl::handle_crawl(args, &config, &database_url, shutdown).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
    }

    Ok(())
}
