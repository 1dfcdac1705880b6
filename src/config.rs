use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;

use crate::services::collector::CollectorConfig;
use crate::services::details::DetailsConfig;
use crate::services::pipeline::HarvestConfig;

pub const DEFAULT_LISTING_URL: &str = "https://m.imdb.com/search/title/?title_type=feature,tv_movie,tv_special,video,tv_series,tv_miniseries&interests=in0000027";
pub const DEFAULT_LOAD_MORE_XPATH: &str = "//span[contains(text(), '50 more')]/ancestor::button";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid duration for --{name}: {value}")]
    InvalidDuration { name: &'static str, value: f64 },
    #[error("{0} is not configured")]
    MissingApiKey(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "harvester", author, version, about = "Anime listing harvester", long_about = None)]
pub struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Document store connection string; store mirroring is skipped when empty
    #[arg(long, global = true, env = "MONGODB_URI", hide_env_values = true)]
    pub mongodb_uri: Option<String>,

    /// Document store database name
    #[arg(long, global = true, env = "DB_NAME", default_value = "anime_db")]
    pub db_name: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn store_uri(&self) -> Option<&str> {
        self.mongodb_uri
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect the listing, enrich new titles and persist the merged collection
    Collect(CollectArgs),
    /// Fetch full per-identifier details for an existing collection
    Details(DetailsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Target total size of the collection
    #[arg(long, env = "HARVEST_LIMIT", default_value = "1500")]
    pub limit: usize,

    /// Seconds between expansions and between enrichment lookups
    #[arg(long, env = "HARVEST_DELAY", default_value = "2")]
    pub delay: f64,

    /// Snapshot file (read as the existing collection and rewritten)
    #[arg(long, default_value = "anime_list.json")]
    pub output: PathBuf,

    /// Existing collection to extend, if different from --output
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long, default_value = "en-US, en")]
    pub primary_locale: String,

    /// Second locale run; an empty value disables it
    #[arg(long, default_value = "ru-RU, ru")]
    pub secondary_locale: String,

    /// Persist identifier-only records without enrichment lookups
    #[arg(long)]
    pub no_enrich: bool,

    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    pub tmdb_api_key: Option<String>,

    /// Language for overview and status lookups
    #[arg(long, default_value = "ru-RU")]
    pub language: String,

    #[arg(long, default_value = "available_tags.json")]
    pub tags_file: PathBuf,

    #[arg(long, default_value = "available_genres.json")]
    pub genres_file: PathBuf,

    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    pub webdriver_url: String,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    #[arg(long, default_value = DEFAULT_LISTING_URL)]
    pub listing_url: String,

    #[arg(long, default_value = DEFAULT_LOAD_MORE_XPATH)]
    pub load_more_xpath: String,

    /// Expansion attempts per locale run
    #[arg(long, default_value = "10")]
    pub max_attempts: usize,

    #[arg(long, default_value = "10")]
    pub initial_timeout: f64,

    #[arg(long, default_value = "10")]
    pub control_timeout: f64,

    #[arg(long, default_value = "15")]
    pub expansion_timeout: f64,

    #[arg(long, default_value = "1")]
    pub scroll_pause: f64,

    #[arg(long, default_value = "0.25")]
    pub poll_interval: f64,

    #[arg(long, env = "COLLECTION_NAME", default_value = "anime_list")]
    pub collection: String,
}

impl CollectArgs {
    pub fn harvest_config(&self) -> Result<HarvestConfig, ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidConfig(
                "--max-attempts must be at least 1".into(),
            ));
        }
        if self.primary_locale.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "--primary-locale must not be empty".into(),
            ));
        }

        let delay = secs("delay", self.delay)?;
        let secondary = self.secondary_locale.trim();

        Ok(HarvestConfig {
            limit: self.limit,
            delay,
            input_path: self.input.clone().unwrap_or_else(|| self.output.clone()),
            snapshot_path: self.output.clone(),
            primary_locale: self.primary_locale.trim().to_string(),
            secondary_locale: (!secondary.is_empty()).then(|| secondary.to_string()),
            collection: self.collection.clone(),
            collector: CollectorConfig {
                listing_url: self.listing_url.clone(),
                max_attempts: self.max_attempts,
                initial_timeout: secs("initial-timeout", self.initial_timeout)?,
                control_timeout: secs("control-timeout", self.control_timeout)?,
                expansion_timeout: secs("expansion-timeout", self.expansion_timeout)?,
                scroll_pause: secs("scroll-pause", self.scroll_pause)?,
                delay,
                poll_interval: secs("poll-interval", self.poll_interval)?,
            },
        })
    }

    pub fn tmdb_api_key(&self) -> Option<String> {
        non_blank(self.tmdb_api_key.as_deref())
    }
}

#[derive(Args, Debug, Clone)]
pub struct DetailsArgs {
    /// Collection whose identifiers are looked up
    #[arg(long, default_value = "anime_ttid_list.json")]
    pub input: PathBuf,

    #[arg(long, default_value = "anime_full_data.json")]
    pub output: PathBuf,

    #[arg(long, env = "OMDB_API_KEY", hide_env_values = true)]
    pub omdb_api_key: Option<String>,

    /// Seconds between requests
    #[arg(long, default_value = "1")]
    pub delay: f64,

    /// Write a partial snapshot every N successful fetches (0 disables)
    #[arg(long, default_value = "100")]
    pub checkpoint_every: usize,

    #[arg(long, env = "COLLECTION_NAME", default_value = "anime_full_data")]
    pub collection: String,
}

impl DetailsArgs {
    pub fn details_config(&self) -> Result<DetailsConfig, ConfigError> {
        Ok(DetailsConfig {
            input_path: self.input.clone(),
            output_path: self.output.clone(),
            delay: secs("delay", self.delay)?,
            checkpoint_every: self.checkpoint_every,
            collection: self.collection.clone(),
        })
    }

    pub fn api_key(&self) -> Result<String, ConfigError> {
        non_blank(self.omdb_api_key.as_deref()).ok_or(ConfigError::MissingApiKey("OMDB_API_KEY"))
    }
}

fn secs(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDuration { name, value })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
