//! Configuration error types shared by the shiftfeed crates.
//!
//! Errors carry full context for logging and expose a short
//! `user_message()` suitable for the one-line diagnostic the job prints
//! before exiting.

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing the following environment variables: {}", .0.join(", "))]
    MissingSettings(Vec<String>),

    #[error("Invalid configuration: {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::MissingSettings(_) => {
                "Required settings are missing. Check the FB_* environment variables."
            }
            ConfigError::Invalid { .. } => "Invalid configuration. Check your settings.",
        }
    }

    /// Process exit code used when the job aborts on this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
