use std::fmt;
use std::path::{Path, PathBuf};

use lesson_core::merge::MergePolicy;
use lesson_core::model::DEFAULT_WEEKLY_GOAL;
use services::ServiceSettings;
use services::progress::DEFAULT_MAX_RETRIES;

pub const DEFAULT_DB_URL: &str = "sqlite://lessons.sqlite3?mode=rwc";
pub const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" | "pretty" => Some(Self::Plain),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, raw: String },
    InvalidLogFormat { raw: String },
    InvalidDbUrl { raw: String },
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidNumber { key, raw } => {
                write!(f, "{key} must be a non-negative integer, got {raw:?}")
            }
            ConfigError::InvalidLogFormat { raw } => {
                write!(f, "LESSON_LOG_FORMAT must be plain or json, got {raw:?}")
            }
            ConfigError::InvalidDbUrl { raw } => write!(f, "invalid database url: {raw}"),
            ConfigError::Io(err) => write!(f, "cannot prepare database file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Runtime settings: defaults, then `.env`, then process environment.
/// Command-line flags are applied on top by the argument parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub weekly_goal: u32,
    pub max_merge_retries: u32,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.into(),
            weekly_goal: DEFAULT_WEEKLY_GOAL,
            max_merge_retries: DEFAULT_MAX_RETRIES,
            log_filter: DEFAULT_LOG_FILTER.into(),
            log_format: LogFormat::Plain,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for values that are set but unparsable.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("LESSON_DB_URL").filter(|v| !v.trim().is_empty()) {
            config.db_url = normalize_sqlite_url(raw);
        }
        if let Some(raw) = lookup("LESSON_WEEKLY_GOAL") {
            config.weekly_goal = parse_number("LESSON_WEEKLY_GOAL", raw)?;
        }
        if let Some(raw) = lookup("LESSON_MAX_MERGE_RETRIES") {
            config.max_merge_retries = parse_number("LESSON_MAX_MERGE_RETRIES", raw)?;
        }
        if let Some(raw) = lookup("LESSON_LOG").filter(|v| !v.trim().is_empty()) {
            config.log_filter = raw;
        }
        if let Some(raw) = lookup("LESSON_LOG_FORMAT") {
            config.log_format =
                LogFormat::parse(&raw).ok_or(ConfigError::InvalidLogFormat { raw })?;
        }

        Ok(config)
    }

    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            policy: MergePolicy {
                default_weekly_goal: self.weekly_goal,
                ..MergePolicy::default()
            },
            max_merge_retries: self.max_merge_retries,
        }
    }
}

fn parse_number(key: &'static str, raw: String) -> Result<u32, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber { key, raw })
}

/// Turn a bare path or `sqlite:` URL into an absolute `sqlite://path?mode=rwc` URL.
///
/// `sqlite://` URLs keep their path; an explicit `mode=` parameter is left alone.
pub fn normalize_sqlite_url(raw: String) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" {
        return trimmed.to_string();
    }
    if trimmed.starts_with("sqlite://") {
        return with_create_mode(trimmed.to_string());
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    with_create_mode(format!("sqlite://{}", absolute.display()))
}

fn with_create_mode(url: String) -> String {
    match url.split_once('?') {
        Some((_, query)) if query.split('&').any(|p| p.starts_with("mode=")) => url,
        Some(_) => format!("{url}&mode=rwc"),
        None => format!("{url}?mode=rwc"),
    }
}

/// Create the database file and its parent directory so the pool can open it.
///
/// # Errors
///
/// Returns `ConfigError` for malformed URLs or filesystem failures.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), ConfigError> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ConfigError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl {
            raw: db_url.to_string(),
        });
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}
