// src/error.rs

//! Unified error handling for the monitor.

use std::fmt;

use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad or unsafe configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fetch failed (timeout, connection, non-success status)
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Content could not be interpreted as markup
    #[error("Parse error for {context}: {message}")]
    Parse { context: String, message: String },

    /// Persisting records failed
    #[error("Store write error at {location}: {message}")]
    StoreWrite { location: String, message: String },

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV reading/writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Coarse error category, used for per-target reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Network,
    Parse,
    StoreWrite,
    Other,
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a network error for a URL.
    pub fn network(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a store write error.
    pub fn store_write(location: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::StoreWrite {
            location: location.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Selector { .. } | Self::Toml(_) | Self::Url(_) => {
                ErrorKind::Config
            }
            Self::Network { .. } => ErrorKind::Network,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::StoreWrite { .. } | Self::Csv(_) => ErrorKind::StoreWrite,
            Self::Io(_) | Self::Json(_) => ErrorKind::Other,
        }
    }
}
