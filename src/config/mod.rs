//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::pagination::DEFAULT_PAGE_SIZE;
use crate::application::session::{DEFAULT_LOAD_MORE_DELAY, SessionOptions};
use crate::application::strategy::{DEFAULT_FANOUT_CATEGORIES, StrategyConfig};
use crate::domain::query::{DEFAULT_RESULT_CAP, MAX_RESULT_CAP};
use crate::domain::types::{AdminId, CategoryId, SortOrder, StatusFilter};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "gazette";
const ENV_PREFIX: &str = "GAZETTE";

/// Command-line arguments for the Gazette binary.
#[derive(Debug, Parser)]
#[command(name = "gazette", version, about = "Resilient publication feed client")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "GAZETTE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Fetch the feed for a query and print each page as JSON.
    Browse(BrowseArgs),
    /// Print the category catalog as JSON.
    Categories,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the backend base URL.
    #[arg(long = "base-url", value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct BrowseArgs {
    /// Free-text search term; takes precedence over --category.
    #[arg(long, value_name = "TERM")]
    pub search: Option<String>,

    /// Restrict the feed to one category.
    #[arg(long, value_name = "ID")]
    pub category: Option<CategoryId>,

    /// Show the admin listing for one administrator.
    #[arg(long, value_name = "ID")]
    pub admin: Option<AdminId>,

    /// Status filter (all|published|draft).
    #[arg(long, value_name = "STATUS")]
    pub status: Option<StatusFilter>,

    /// Sort order (recent|oldest|alphabetical).
    #[arg(long, value_name = "ORDER")]
    pub sort: Option<SortOrder>,

    /// Maximum number of records fetched.
    #[arg(long, value_name = "COUNT")]
    pub cap: Option<usize>,

    /// Number of pages to reveal.
    #[arg(long, value_name = "COUNT", default_value_t = 1)]
    pub pages: usize,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: SourceSettings,
    pub feed: FeedSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Required by commands that talk to the backend.
    pub base_url: Option<Url>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub page_size: NonZeroUsize,
    pub result_cap: usize,
    pub fanout_categories: NonZeroUsize,
    pub load_more_delay: Duration,
    pub legacy_backoff: Duration,
}

impl FeedSettings {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            page_size: self.page_size,
            load_more_delay: self.load_more_delay,
            strategy: StrategyConfig {
                fanout_categories: self.fanout_categories,
                legacy_backoff: self.legacy_backoff,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    source: RawSourceSettings,
    feed: RawFeedSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.base_url.as_ref() {
            self.source.base_url = Some(url.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            source,
            feed,
            logging,
        } = raw;

        Ok(Self {
            source: build_source_settings(source)?,
            feed: build_feed_settings(feed)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_source_settings(source: RawSourceSettings) -> Result<SourceSettings, LoadError> {
    let base_url = match non_blank(source.base_url) {
        Some(value) => {
            let url = Url::parse(&value).map_err(|err| {
                LoadError::invalid("source.base_url", format!("invalid url `{value}`: {err}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "source.base_url",
                    format!("unsupported scheme `{}`", url.scheme()),
                ));
            }
            Some(url)
        }
        None => None,
    };

    Ok(SourceSettings {
        base_url,
        user_agent: non_blank(source.user_agent),
    })
}

fn build_feed_settings(feed: RawFeedSettings) -> Result<FeedSettings, LoadError> {
    let page_size = match feed.page_size {
        Some(value) => non_zero(value, "feed.page_size")?,
        None => DEFAULT_PAGE_SIZE,
    };

    let result_cap = feed.result_cap.unwrap_or(DEFAULT_RESULT_CAP);
    if result_cap == 0 || result_cap > MAX_RESULT_CAP {
        return Err(LoadError::invalid(
            "feed.result_cap",
            format!("must be between 1 and {MAX_RESULT_CAP}"),
        ));
    }

    let fanout_categories = match feed.fanout_categories {
        Some(value) => non_zero(value, "feed.fanout_categories")?,
        None => DEFAULT_FANOUT_CATEGORIES,
    };

    let load_more_delay = feed
        .load_more_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_LOAD_MORE_DELAY);
    let legacy_backoff = Duration::from_millis(feed.legacy_backoff_ms.unwrap_or(0));

    Ok(FeedSettings {
        page_size,
        result_cap,
        fanout_categories,
        load_more_delay,
        legacy_backoff,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSourceSettings {
    base_url: Option<String>,
    user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFeedSettings {
    page_size: Option<usize>,
    result_cap: Option<usize>,
    fanout_categories: Option<usize>,
    load_more_delay_ms: Option<u64>,
    legacy_backoff_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn non_zero(value: usize, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
