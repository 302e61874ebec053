//! Configuration module for rdsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for rdsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub log: LoggingConfig,
    pub scheduler: SchedulerConfig,
    /// Named accounts, referenced by jobs.
    pub accounts: BTreeMap<String, AccountConfig>,
    /// Named sync jobs.
    pub syncs: BTreeMap<String, JobConfig>,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Budget for general API calls.
    pub rate_limit_per_minute: u32,
    /// Budget for the torrent-add endpoint, enforced on top of the general one.
    pub torrents_rate_limit_per_minute: u32,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Page size used when listing an account.
    pub fetch_torrents_page_size: u32,
    /// Silence the HTTP client's own debug logging.
    pub disable_http_logging: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    pub format: LogFormat,
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Job scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Grace period for closing jobs on shutdown.
    pub shutdown_timeout_secs: u64,
}

/// A remote account.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub token: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("token", &"<redacted>")
            .field("description", &self.description)
            .finish()
    }
}

/// When a job fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScheduleConfig {
    /// Every N seconds, first run immediately.
    Interval(#[serde(deserialize_with = "deserialize_seconds")] u64),
    /// Cron expression, first run at the next matching time.
    Cron(String),
}

impl ScheduleConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Interval(_) => "interval",
            Self::Cron(_) => "cron",
        }
    }

    /// The configured value rendered as a string (seconds or expression).
    pub fn value(&self) -> String {
        match self {
            Self::Interval(secs) => secs.to_string(),
            Self::Cron(expr) => expr.clone(),
        }
    }
}

/// Interval values may be written as integers or numeric strings.
fn deserialize_seconds<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Int(u64),
        Str(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Int(n) => Ok(n),
        Seconds::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid interval seconds: {s:?}"))),
    }
}

/// A sync job: replicate torrents from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Name of the source account.
    pub source: String,
    /// Name of the destination account.
    pub destination: String,
    pub schedule: ScheduleConfig,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_true() -> bool {
    true
}

impl JobConfig {
    /// An enabled, non-dry-run job.
    pub fn new(
        source: impl Into<String>,
        destination: impl Into<String>,
        schedule: ScheduleConfig,
    ) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            schedule,
            enabled: true,
            dry_run: false,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Errors raised while locating or reading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error loading config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/rd-sync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("rd-sync")
            .join("config.yaml")
    }

    /// Picks the explicit path when given, the default path otherwise.
    ///
    /// Either way the file must exist.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ConfigError::NotFound(path))
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default remote endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.real-debrid.com/rest/1.0";

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            rate_limit_per_minute: 250,
            torrents_rate_limit_per_minute: 75,
            timeout_secs: 60,
            fetch_torrents_page_size: 2000,
            disable_http_logging: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"api.timeout_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `log.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl LoggingConfig {
    /// The level as an `EnvFilter` directive.
    ///
    /// Case-insensitive; `warning` and `critical` are accepted as aliases for
    /// `warn` and `error`. Returns `None` for anything else.
    pub fn level_directive(&self) -> Option<&'static str> {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" => Some("trace"),
            "debug" => Some("debug"),
            "info" => Some("info"),
            "warn" | "warning" => Some("warn"),
            "error" | "critical" => Some("error"),
            _ => None,
        }
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Jobs that reference
    /// unknown accounts are not reported here; the job manager rejects them
    /// individually at registration time.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: String| {
            errors.push(ValidationError { field, message });
        };

        // --- api ---
        if self.api.base_url.trim().is_empty() {
            push("api.base_url".into(), "must not be empty".into());
        }
        if self.api.rate_limit_per_minute == 0 {
            push(
                "api.rate_limit_per_minute".into(),
                "must be greater than 0".into(),
            );
        }
        if self.api.torrents_rate_limit_per_minute == 0 {
            push(
                "api.torrents_rate_limit_per_minute".into(),
                "must be greater than 0".into(),
            );
        }
        if self.api.timeout_secs == 0 {
            push("api.timeout_secs".into(), "must be greater than 0".into());
        }
        if self.api.fetch_torrents_page_size == 0 {
            push(
                "api.fetch_torrents_page_size".into(),
                "must be greater than 0".into(),
            );
        }

        // --- log ---
        if self.log.level_directive().is_none() {
            push(
                "log.level".into(),
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.log.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        // --- scheduler ---
        if self.scheduler.shutdown_timeout_secs == 0 {
            push(
                "scheduler.shutdown_timeout_secs".into(),
                "must be greater than 0".into(),
            );
        }

        // --- accounts ---
        for (name, account) in &self.accounts {
            if account.token.trim().is_empty() {
                push(format!("accounts.{name}.token"), "must not be empty".into());
            }
        }

        // --- syncs ---
        for (name, job) in &self.syncs {
            match &job.schedule {
                ScheduleConfig::Interval(0) => push(
                    format!("syncs.{name}.schedule"),
                    "interval must be greater than 0".into(),
                ),
                ScheduleConfig::Cron(expr) if expr.trim().is_empty() => push(
                    format!("syncs.{name}.schedule"),
                    "cron expression must not be empty".into(),
                ),
                _ => {}
            }
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust
/// use rdsync_core::config::{ConfigBuilder, JobConfig, ScheduleConfig};
///
/// let config = ConfigBuilder::new()
///     .account("main", "token-a")
///     .account("backup", "token-b")
///     .job("mirror", JobConfig::new("main", "backup", ScheduleConfig::Interval(3600)))
///     .build();
/// assert_eq!(config.syncs.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- api ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn api_rate_limit_per_minute(mut self, n: u32) -> Self {
        self.config.api.rate_limit_per_minute = n;
        self
    }

    pub fn torrents_rate_limit_per_minute(mut self, n: u32) -> Self {
        self.config.api.torrents_rate_limit_per_minute = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api.timeout_secs = secs;
        self
    }

    pub fn fetch_torrents_page_size(mut self, n: u32) -> Self {
        self.config.api.fetch_torrents_page_size = n;
        self
    }

    // --- log ---

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log.level = level.into();
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.log.format = format;
        self
    }

    // --- scheduler ---

    pub fn shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.config.scheduler.shutdown_timeout_secs = secs;
        self
    }

    // --- accounts / jobs ---

    pub fn account(mut self, name: impl Into<String>, token: impl Into<String>) -> Self {
        self.config.accounts.insert(
            name.into(),
            AccountConfig {
                token: token.into(),
                description: None,
            },
        );
        self
    }

    pub fn job(mut self, name: impl Into<String>, job: JobConfig) -> Self {
        self.config.syncs.insert(name.into(), job);
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
