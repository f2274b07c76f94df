// src/error.rs

//! Unified error handling for the indexer.

use std::fmt;

use thiserror::Error;

/// Result type alias for indexer operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
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

    /// Skip pattern or text format pattern did not compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed crate graph
    #[error("Graph error: {0}")]
    Graph(String),

    /// Repository request returned an unusable response
    #[error("Fetch error for {context}: {message}")]
    Fetch { context: String, message: String },

    /// Search index rejected a request
    #[error("Index error ({status}): {message}")]
    Index { status: u16, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a graph error.
    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph(message.into())
    }

    /// Create a fetch error with context.
    pub fn fetch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a search index error.
    pub fn index(status: u16, message: impl Into<String>) -> Self {
        Self::Index {
            status,
            message: message.into(),
        }
    }
}
