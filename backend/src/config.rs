//! Application configuration file support.
//!
//! Settings are read from an `erp.toml` file (every field has a default, so
//! the file itself is optional) and then overridden by environment variables.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::db::RecordCounts;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub reports: ReportSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Data source selection and tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// `synthetic` or `sqlserver`
    #[serde(rename = "type", default = "default_source_type")]
    pub source_type: String,
    /// Per-department fetch timeout.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Fixed seed for the synthetic generator; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Row counts for the synthetic generator.
    #[serde(default)]
    pub records: RecordCounts,
}

/// Report output locations and retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_report_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_csv_subdir")]
    pub csv_subdir: String,
    /// Age after which timestamped report copies are deleted; `0` keeps them forever.
    #[serde(default = "default_keep_days")]
    pub keep_days: u32,
}

/// Refresh cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Local wall-clock time of the daily run, `HH:MM`.
    #[serde(default = "default_daily_time")]
    pub daily_time: String,
    /// Interval between periodic refreshes; `0` disables the interval tick.
    #[serde(default = "default_refresh_interval_minutes")]
    pub refresh_interval_minutes: u64,
    #[serde(default = "default_true")]
    pub refresh_on_startup: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_source_type() -> String {
    "synthetic".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_csv_subdir() -> String {
    "csv".to_string()
}

fn default_keep_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_daily_time() -> String {
    "08:00".to_string()
}

/// Longest accepted refresh interval.
const MAX_REFRESH_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

fn default_refresh_interval_minutes() -> u64 {
    60
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            source_type: default_source_type(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            seed: None,
            records: RecordCounts::default(),
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            dir: default_report_dir(),
            csv_subdir: default_csv_subdir(),
            keep_days: default_keep_days(),
        }
    }
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_time: default_daily_time(),
            refresh_interval_minutes: default_refresh_interval_minutes(),
            refresh_on_startup: true,
        }
    }
}

impl ReportSettings {
    pub fn csv_dir(&self) -> PathBuf {
        self.dir.join(&self.csv_subdir)
    }
}

impl ScheduleSettings {
    /// Parse `daily_time` (`HH:MM` or `HH:MM:SS`).
    pub fn daily_at(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.daily_time, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&self.daily_time, "%H:%M:%S"))
            .map_err(|e| ConfigError::Invalid {
                key: "schedule.daily_time".to_string(),
                message: format!("'{}': {}", self.daily_time, e),
            })
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        if self.refresh_interval_minutes == 0 {
            return None;
        }
        self.refresh_interval_minutes
            .checked_mul(60)
            .map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Locate the configuration file.
    ///
    /// `ERP_CONFIG` wins; otherwise `erp.toml` is searched in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var("ERP_CONFIG") {
            return Some(PathBuf::from(path));
        }

        [
            PathBuf::from("erp.toml"),
            PathBuf::from("backend/erp.toml"),
            PathBuf::from("../erp.toml"),
        ]
        .into_iter()
        .find(|p| p.exists())
    }

    /// Load from the default location (or defaults when no file exists) and
    /// apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override settings from environment variables.
    ///
    /// # Environment Variables
    /// - `HOST`, `PORT`: listener address
    /// - `SOURCE_TYPE`: `synthetic` | `sqlserver`
    /// - `FETCH_TIMEOUT_SECS`: per-department fetch timeout
    /// - `REPORT_DIR`: report output directory
    /// - `KEEP_REPORTS_DAYS`: retention of timestamped reports
    /// - `DAILY_REPORT_TIME`: `HH:MM`
    /// - `REFRESH_INTERVAL_MINUTES`: periodic refresh interval
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env("PORT")? {
            self.server.port = port;
        }
        if let Ok(source_type) = env::var("SOURCE_TYPE") {
            self.source.source_type = source_type;
        }
        if let Some(secs) = parse_env("FETCH_TIMEOUT_SECS")? {
            self.source.fetch_timeout_secs = secs;
        }
        if let Ok(dir) = env::var("REPORT_DIR") {
            self.reports.dir = PathBuf::from(dir);
        }
        if let Some(days) = parse_env("KEEP_REPORTS_DAYS")? {
            self.reports.keep_days = days;
        }
        if let Ok(time) = env::var("DAILY_REPORT_TIME") {
            self.schedule.daily_time = time;
        }
        if let Some(minutes) = parse_env("REFRESH_INTERVAL_MINUTES")? {
            self.schedule.refresh_interval_minutes = minutes;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.daily_at()?;
        if self.schedule.refresh_interval_minutes > MAX_REFRESH_INTERVAL_MINUTES {
            return Err(ConfigError::Invalid {
                key: "schedule.refresh_interval_minutes".to_string(),
                message: format!("must be at most {} (one year)", MAX_REFRESH_INTERVAL_MINUTES),
            });
        }
        if self.source.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "source.fetch_timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            message: format!("'{}': {}", raw, e),
        }),
        Err(_) => Ok(None),
    }
}
