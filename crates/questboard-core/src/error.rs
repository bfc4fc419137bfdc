//! Core error types for questboard-core.
//!
//! Catalog and ledger mutations surface these to the caller. Read-side
//! checklist rendering never sees them: lookups against an unavailable
//! ledger report every task as unchecked instead.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for questboard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced game, task, event or user does not exist
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// Name collision on create or rename
    #[error("{kind} already exists: {name}")]
    Conflict { kind: &'static str, name: String },

    /// Malformed date, unknown period or kind, empty name
    #[error("Invalid value for '{field}': {message}")]
    InvalidInput { field: String, message: String },

    /// The persistence layer could not provide a store, even from backup
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Notification delivery errors
    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn conflict(kind: &'static str, name: impl Into<String>) -> Self {
        CoreError::Conflict {
            kind,
            name: name.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to read a document
    #[error("Failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a document
    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SQLite backend failure
    #[error("SQLite error: {0}")]
    Sqlite(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Notification-specific errors.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Sink is missing required settings
    #[error("Notification sink not configured: {0}")]
    NotConfigured(String),

    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Endpoint answered with a non-success status
    #[error("Delivery rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Sqlite(err.to_string())
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Http(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
