//! Configuration infrastructure
//!
//! Contains configuration loading and management for the stats zone crawler.
//!
//! Configuration is a single JSON document grouped by concern:
//! 1. `crawl`: what to crawl and how to react to failures
//! 2. `pipeline`, `http`, `discovery`: throughput and politeness knobs
//! 3. `store`, `logging`, `selectors`: collaborators and site markup

#![allow(clippy::uninlined_format_args)]

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use crate::domain::constants::site;
use crate::infrastructure::parsing::SelectorConfig;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "STATSZONE_CONFIG";

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crawl: CrawlConfig,
    pub pipeline: PipelineConfig,
    pub http: HttpConfig,
    pub discovery: DiscoveryConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
    pub selectors: SelectorConfig,
}

/// What gets crawled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub league_id: String,

    /// Starting year of the season, e.g. "2016" for 2016/17
    pub season: String,

    /// Crawl a single day (`YYYY-MM-DD`) across all leagues instead of a season
    pub match_date: Option<String>,

    /// Only process the first N discovered matches
    pub max_matches: Option<usize>,

    pub failure_policy: FailurePolicy,
}

/// How the pipeline reacts to a failed match or player page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first error of any kind aborts the run
    FailFast,
    /// Failed player pages are skipped and failed matches left un-crawled;
    /// discovery and store errors still abort
    #[default]
    Supervised,
}

/// Stage widths, queue capacities and pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub player_workers: usize,
    pub match_queue_capacity: usize,
    pub player_queue_capacity: usize,
    pub dedup_concurrency: usize,
    /// Pause after each finished match
    pub match_cooldown_ms: u64,
    /// Optional per-worker pause after each player page
    pub player_fetch_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
    /// Aggregate request rate shared by every stage
    pub max_requests_per_second: u32,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Upper bound on listing pages followed per season
    pub max_listing_pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Sqlite,
    /// Nothing is persisted; useful for dry runs
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub database_url: String,
    pub max_connections: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs (file output only)
    pub json_format: bool,

    pub console_output: bool,
    pub file_output: bool,

    /// Directory for rotated log files; defaults to `<data dir>/statszone-crawler/logs`
    pub log_dir: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            league_id: defaults::LEAGUE_ID.to_string(),
            season: defaults::SEASON.to_string(),
            match_date: None,
            max_matches: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            player_workers: defaults::PLAYER_WORKERS,
            match_queue_capacity: defaults::MATCH_QUEUE_CAPACITY,
            player_queue_capacity: defaults::PLAYER_QUEUE_CAPACITY,
            dedup_concurrency: defaults::DEDUP_CONCURRENCY,
            match_cooldown_ms: defaults::MATCH_COOLDOWN_MS,
            player_fetch_delay_ms: defaults::PLAYER_FETCH_DELAY_MS,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: site::BASE_URL.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            max_retries: defaults::RETRY_ATTEMPTS,
            retry_base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_listing_pages: defaults::MAX_LISTING_PAGES,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            database_url: defaults::DATABASE_URL.to_string(),
            max_connections: defaults::MAX_DB_CONNECTIONS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters.insert("statszone_crawler".to_string(), "info".to_string());
                filters
            },
        }
    }
}

/// Rejected configuration values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("crawl.season must be a year, got '{0}'")]
    InvalidSeason(String),

    #[error("crawl.match_date must be YYYY-MM-DD, got '{0}'")]
    InvalidMatchDate(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("Invalid selector configuration: {0}")]
    Selectors(String),
}

impl AppConfig {
    /// Checks the values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawl.season.trim().parse::<i32>().is_err() {
            return Err(ConfigError::InvalidSeason(self.crawl.season.clone()));
        }
        if let Some(date) = &self.crawl.match_date {
            if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
                return Err(ConfigError::InvalidMatchDate(date.clone()));
            }
        }

        let counts = [
            ("pipeline.player_workers", self.pipeline.player_workers),
            ("pipeline.match_queue_capacity", self.pipeline.match_queue_capacity),
            ("pipeline.player_queue_capacity", self.pipeline.player_queue_capacity),
            ("pipeline.dedup_concurrency", self.pipeline.dedup_concurrency),
            ("http.max_requests_per_second", self.http.max_requests_per_second as usize),
            ("discovery.max_listing_pages", self.discovery.max_listing_pages as usize),
            ("store.max_connections", self.store.max_connections as usize),
        ];
        if let Some((name, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroValue(name));
        }

        self.selectors
            .validate()
            .map_err(|e| ConfigError::Selectors(e.to_string()))
    }
}

/// Configuration manager for loading and saving settings
/// Where `ConfigManager::load_config` got its configuration from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    Loaded,
    /// No file existed; the defaults were written to the config path
    CreatedDefault,
}

pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// `$STATSZONE_CONFIG` when set, otherwise the per-user config file
    pub fn new() -> Result<Self> {
        let config_path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME),
        };

        Ok(Self { config_path })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist.
    ///
    /// Runs before logging is initialized, so the caller reports the origin.
    pub async fn load_config(&self) -> Result<(AppConfig, ConfigOrigin)> {
        if !self.config_path.exists() {
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok((default_config, ConfigOrigin::CreatedDefault));
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration file {:?}", self.config_path))?;
        config.validate()?;

        Ok((config, ConfigOrigin::Loaded))
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "statszone-crawler";
    pub const CONFIG_FILE_NAME: &str = "config.json";

    /// Premier League
    pub const LEAGUE_ID: &str = "8";
    pub const SEASON: &str = "2016";

    pub const PLAYER_WORKERS: usize = 10;
    pub const MATCH_QUEUE_CAPACITY: usize = 10;
    pub const PLAYER_QUEUE_CAPACITY: usize = 10;
    pub const DEDUP_CONCURRENCY: usize = 8;

    /// One minute between matches
    pub const MATCH_COOLDOWN_MS: u64 = 60_000;
    pub const PLAYER_FETCH_DELAY_MS: u64 = 0;

    pub const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 2;
    pub const RETRY_ATTEMPTS: u32 = 3;
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;

    pub const MAX_LISTING_PAGES: u32 = 20;

    pub const DATABASE_URL: &str = "sqlite:fourfourtwo.db";
    pub const MAX_DB_CONNECTIONS: u32 = 5;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
}
