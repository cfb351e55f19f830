//! Run configuration, read from the process environment.

use chrono_tz::Tz;
use std::fmt;
use std::path::PathBuf;
use url::Url;

use crate::error::ConfigError;

pub const ENV_API_HOST: &str = "FB_API_HOST";
pub const ENV_API_KEY: &str = "FB_API_KEY";
pub const ENV_PASSWORD: &str = "FB_PASSWORD";
pub const ENV_USERNAME: &str = "FB_USERNAME";
pub const ENV_CACHE_PATH: &str = "FB_CACHE_PATH";
pub const ENV_ICS_PATH: &str = "FB_ICS_PATH";
pub const ENV_TIMEZONE: &str = "FB_TIMEZONE";

/// Variables the job needs, in the order they are checked and reported.
pub const REQUIRED_VARS: [&str; 4] = [ENV_API_HOST, ENV_API_KEY, ENV_PASSWORD, ENV_USERNAME];

pub const DEFAULT_CACHE_PATH: &str = "./scheduleData.json";
pub const DEFAULT_ICS_PATH: &str = "./schedule.ics";
pub const DEFAULT_TIMEZONE: &str = "America/Toronto";

/// A single configuration problem
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// First error as a `ConfigError`, if any
    pub fn into_error(self) -> Option<ConfigError> {
        self.errors
            .into_iter()
            .next()
            .map(|e| ConfigError::invalid(e.field, e.message))
    }
}

/// Backend credentials and endpoints.
#[derive(Clone)]
pub struct ApiConfig {
    /// Backend hostname, without scheme
    pub host: String,
    /// Project API key, sent as `apiKey` and as the login bearer
    pub api_key: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,

    /// JSON cache holding the session token and known shifts
    pub cache_path: PathBuf,

    /// Generated iCalendar feed
    pub ics_path: PathBuf,

    /// IANA zone the backend's civil timestamps are expressed in
    pub timezone: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Every missing required variable is logged, but the load only fails
    /// when more than one is missing. A single missing value is carried as an
    /// empty string and will surface later as an authentication failure.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|&&key| lookup(key).is_none())
            .map(|key| key.to_string())
            .collect();

        if missing.len() > 1 {
            return Err(ConfigError::MissingSettings(missing));
        }
        if let Some(key) = missing.first() {
            tracing::warn!("Missing environment variable {}, continuing without it", key);
        }

        let required = |key: &str| lookup(key).unwrap_or_default();

        let config = Self {
            api: ApiConfig {
                host: required(ENV_API_HOST),
                api_key: required(ENV_API_KEY),
                username: required(ENV_USERNAME),
                password: required(ENV_PASSWORD),
            },
            cache_path: lookup(ENV_CACHE_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH)),
            ics_path: lookup(ENV_ICS_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ICS_PATH)),
            timezone: lookup(ENV_TIMEZONE).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        };

        let validation = config.validate();
        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }
        match validation.into_error() {
            Some(err) => Err(err),
            None => Ok(config),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.api.host.is_empty() {
            result.add_warning(ENV_API_HOST, "Host is empty");
        } else {
            match Url::parse(&format!("https://{}", self.api.host)) {
                Ok(url) if url.host_str().is_some() && url.path() == "/" => {}
                Ok(_) => result.add_error(ENV_API_HOST, "Expected a bare hostname"),
                Err(e) => result.add_error(ENV_API_HOST, format!("Invalid hostname: {}", e)),
            }
        }

        if self.timezone.parse::<Tz>().is_err() {
            result.add_error(
                ENV_TIMEZONE,
                format!("Unknown time zone: {}", self.timezone),
            );
        }

        if self.cache_path == self.ics_path {
            result.add_error(ENV_ICS_PATH, "Feed path must differ from the cache path");
        }

        result
    }
}
