// src/error.rs

//! Unified error handling for the listing monitor.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
///
/// Only [`AppError::Config`] is fatal. Everything else is caught by the
/// poll loop at the narrowest scope and retried on the next cycle.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream snapshot could not be retrieved or understood
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A single upstream record could not be parsed
    #[error("Parse error for record {index}: {message}")]
    Parse { index: usize, message: String },

    /// Message could not be delivered
    #[error("Delivery error for listing {id}: {message}")]
    Delivery { id: u64, message: String },

    /// State file could not be written
    #[error("Persistence error for {path}: {message}")]
    Persistence { path: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a fetch error.
    pub fn fetch(message: impl fmt::Display) -> Self {
        Self::Fetch(message.to_string())
    }

    /// Create a record-level parse error.
    pub fn parse(index: usize, message: impl fmt::Display) -> Self {
        Self::Parse {
            index,
            message: message.to_string(),
        }
    }

    /// Create a delivery error for a listing.
    pub fn delivery(id: u64, message: impl fmt::Display) -> Self {
        Self::Delivery {
            id,
            message: message.to_string(),
        }
    }

    /// Create a persistence error for a state path.
    pub fn persistence(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_errors_are_fatal() {
        assert!(AppError::config("missing token").is_fatal());
        assert!(!AppError::fetch("timeout").is_fatal());
        assert!(!AppError::parse(3, "missing id").is_fatal());
        assert!(!AppError::delivery(42, "rejected").is_fatal());
        assert!(!AppError::persistence("state.json", "read-only").is_fatal());
    }

    #[test]
    fn messages_carry_context() {
        let err = AppError::delivery(106_123, "chat not found");
        assert_eq!(
            err.to_string(),
            "Delivery error for listing 106123: chat not found"
        );

        let err = AppError::parse(7, "missing field `id`");
        assert!(err.to_string().contains("record 7"));
    }
}
