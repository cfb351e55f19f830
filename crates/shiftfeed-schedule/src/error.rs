//! Schedule-specific error types.

use shiftfeed_core::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid timestamp '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("Unknown time zone: {0}")]
    Zone(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error: {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Another run holds the lock on {0}")]
    Locked(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ScheduleError {
    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    /// Short message for the run log.
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse { input, .. } => format!("Could not read shift time '{}'", input),
            Self::Zone(zone) => format!("Unknown time zone '{}'", zone),
            Self::Auth(_) => "Sign-in was rejected. Check FB_USERNAME and FB_PASSWORD.".to_string(),
            Self::Api { status, .. } if *status >= 500 => {
                "The schedule server is having issues. Try again later.".to_string()
            }
            Self::Api { status, .. } => format!("Schedule request failed ({})", status),
            Self::InvalidResponse(_) => "Received an unexpected response from the server".to_string(),
            Self::Storage(_) | Self::Io(_) => "A file operation failed".to_string(),
            Self::Config(e) => e.user_message().to_string(),
            Self::Locked(_) => "Another run is already in progress".to_string(),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
        }
    }

    /// Whether the failure came out of the time normalizer.
    pub fn is_normalization(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Zone(_))
    }

    /// Whether this error suggests the session token is no longer valid.
    pub fn should_relogin(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}
