use crate::error::{AnalyticsError, Result};
use crate::services::aggregation::{validate_limit, DEFAULT_TOP_USERS_LIMIT};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub cache: CacheConfig,
    pub polling: PollingConfig,
    pub fetch: FetchConfig,
    pub source: SourceConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Freshness window for fetched collections
    pub max_age: Duration,
}

#[derive(Debug, Clone)]
pub struct PollingConfig {
    pub interval: Duration,
    /// Whether polling starts enabled
    pub auto_refresh: bool,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Retries after the first failed attempt
    pub retries: u32,
    /// Per-attempt timeout
    pub timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Randomise each backoff delay by up to 30%
    pub jitter: bool,
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Fixture JSON to serve instead of the bundled one
    pub fixture_path: Option<PathBuf>,
    pub users_latency: Duration,
    pub posts_latency: Duration,
    pub comments_latency: Duration,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub top_users_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "development".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_millis(default_cache_max_age_ms()),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(default_poll_interval_ms()),
            auto_refresh: true,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            timeout: Duration::from_millis(default_fetch_timeout_ms()),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            jitter: false,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            fixture_path: None,
            users_latency: Duration::from_millis(500),
            posts_latency: Duration::from_millis(700),
            comments_latency: Duration::from_millis(600),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_users_limit: DEFAULT_TOP_USERS_LIMIT,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source, applying defaults for unset keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Config {
            app: AppConfig {
                env: lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
                log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                log_format: parse_var(&lookup, "LOG_FORMAT", LogFormat::Text)?,
            },
            cache: CacheConfig {
                max_age: millis_var(&lookup, "CACHE_MAX_AGE_MS", default_cache_max_age_ms())?,
            },
            polling: PollingConfig {
                interval: millis_var(&lookup, "POLL_INTERVAL_MS", default_poll_interval_ms())?,
                auto_refresh: parse_var(&lookup, "AUTO_REFRESH", true)?,
            },
            fetch: FetchConfig {
                retries: parse_var(&lookup, "FETCH_RETRIES", 2)?,
                timeout: millis_var(&lookup, "FETCH_TIMEOUT_MS", default_fetch_timeout_ms())?,
                jitter: parse_var(&lookup, "FETCH_JITTER", false)?,
                ..FetchConfig::default()
            },
            source: SourceConfig {
                fixture_path: lookup("FIXTURE_PATH")
                    .filter(|path| !path.trim().is_empty())
                    .map(PathBuf::from),
                users_latency: millis_var(&lookup, "USERS_LATENCY_MS", 500)?,
                posts_latency: millis_var(&lookup, "POSTS_LATENCY_MS", 700)?,
                comments_latency: millis_var(&lookup, "COMMENTS_LATENCY_MS", 600)?,
            },
            dashboard: DashboardConfig {
                top_users_limit: validate_limit(parse_var(
                    &lookup,
                    "TOP_USERS_LIMIT",
                    DEFAULT_TOP_USERS_LIMIT as i64,
                )?)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cache.max_age.is_zero() {
            return Err(AnalyticsError::Config(
                "CACHE_MAX_AGE_MS must be greater than zero".to_string(),
            ));
        }
        if self.polling.interval.is_zero() {
            return Err(AnalyticsError::Config(
                "POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        if self.fetch.timeout.is_zero() {
            return Err(AnalyticsError::Config(
                "FETCH_TIMEOUT_MS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            cache: CacheConfig::default(),
            polling: PollingConfig::default(),
            fetch: FetchConfig::default(),
            source: SourceConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            AnalyticsError::Config(format!("{}: invalid value '{}': {}", key, raw, e))
        }),
        None => Ok(default),
    }
}

fn millis_var<F>(lookup: &F, key: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_var(lookup, key, default).map(Duration::from_millis)
}

fn default_cache_max_age_ms() -> u64 {
    dashboard_cache::DEFAULT_MAX_AGE.as_millis() as u64
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}
