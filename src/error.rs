// src/error.rs

//! Unified error handling for the reconciler.

use std::fmt;

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// A record is missing a field the parser contract requires
    #[error("Missing field '{field}' in {context}")]
    MissingField { context: String, field: &'static str },

    /// Nothing to reconcile for a thread
    #[error("No usable snapshots for thread '{0}'")]
    EmptyInput(String),

    /// Timestamp could not be parsed
    #[error("Invalid timestamp '{value}': {message}")]
    Timestamp { value: String, message: String },

    /// An immutable artifact already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a missing-field error.
    pub fn missing_field(context: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            context: context.into(),
            field,
        }
    }

    /// Create an empty-input error for a thread.
    pub fn empty_input(thread_id: impl Into<String>) -> Self {
        Self::EmptyInput(thread_id.into())
    }

    /// Create a timestamp parsing error.
    pub fn timestamp(value: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Timestamp {
            value: value.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error describes bad data rather than a failed read.
    ///
    /// Contract violations are skipped by the reconcilers; everything else is
    /// surfaced to the caller.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::Json(_) | Self::MissingField { .. } | Self::Timestamp { .. } | Self::Validation(_)
        )
    }
}
