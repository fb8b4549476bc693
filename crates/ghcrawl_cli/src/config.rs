//! Configuration file support for the crawler CLI.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GHCRAWL_`, e.g., `GHCRAWL_DATABASE_URL`)
//! 3. Config file (~/.config/ghcrawl/config.toml or ./ghcrawl.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/ghcrawl/ghcrawl.db`
//! on Linux (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/ghcrawl/ghcrawl.db"  # optional, this is the default
//!
//! [github]
//! api_url = "https://api.github.com/graphql"  # optional, this is the default
//! tokens = ["ghp_aaa", "ghp_bbb"]  # or GHCRAWL_GITHUB_TOKENS=ghp_aaa,ghp_bbb
//!
//! [crawler]
//! batch_size = 50
//! total_num_repo = 10000
//! max_retries = 3
//! min_stars = 100
//! partition_threshold = 1000
//! start_year = 2024
//! start_month = 1
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use ghcrawl::crawl;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// GitHub API configuration.
    pub github: GitHubConfig,
    /// Crawl defaults.
    pub crawler: CrawlerConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    /// Defaults to `sqlite://~/.local/state/ghcrawl/ghcrawl.db` if not specified.
    pub url: Option<String>,
}

/// GitHub API configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GraphQL endpoint URL.
    pub api_url: String,
    /// Personal access tokens to multiplex requests over.
    /// Can also be set via GHCRAWL_GITHUB_TOKENS (comma-separated).
    pub tokens: Vec<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com/graphql".to_string(),
            tokens: Vec::new(),
        }
    }
}

/// Crawl defaults, overridable per run via CLI flags.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Records requested per page.
    pub batch_size: u32,
    /// Stop after this many repositories.
    pub total_num_repo: usize,
    /// Retry attempts per request.
    pub max_retries: usize,
    /// Star floor for the search space.
    pub min_stars: u32,
    /// Match count at which a search partition is split.
    pub partition_threshold: u64,
    /// Creation-date axis starts at the first of this year/month.
    pub start_year: i32,
    pub start_month: u32,
    /// Concurrent repository workers. Defaults to the token count.
    pub concurrency: Option<usize>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: crawl::DEFAULT_BATCH_SIZE,
            total_num_repo: crawl::DEFAULT_TOTAL_REPOS,
            max_retries: ghcrawl::retry::DEFAULT_MAX_RETRIES,
            min_stars: crawl::DEFAULT_MIN_STARS,
            partition_threshold: crawl::DEFAULT_PARTITION_THRESHOLD,
            start_year: crawl::DEFAULT_START_YEAR,
            start_month: crawl::DEFAULT_START_MONTH,
            concurrency: None,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/ghcrawl/config.toml)
    /// 3. Local config file (./ghcrawl.toml)
    /// 4. Environment variables with GHCRAWL_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(proj_dirs) = ProjectDirs::from("", "", "ghcrawl") {
            let xdg_config = proj_dirs.config_dir().join("config.toml");
            if xdg_config.exists() {
                tracing::debug!("Loading config from {:?}", xdg_config);
                builder = builder.add_source(
                    File::from(xdg_config)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        // Local config file (higher priority than XDG)
        let local_config = PathBuf::from("ghcrawl.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./ghcrawl.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // GHCRAWL_ prefixed environment variables,
        // e.g. GHCRAWL_DATABASE_URL -> database.url
        builder = builder.add_source(
            Environment::with_prefix("GHCRAWL")
                .separator("_")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("github.tokens"),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter enables read-write access and creates the
    /// file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("ghcrawl.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Get the default config file path.
    #[allow(dead_code)]
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ghcrawl").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/ghcrawl` or `~/.local/state/ghcrawl`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ghcrawl").map(|dirs| {
            // state_dir() returns None on macOS/Windows, fall back to data_dir
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
