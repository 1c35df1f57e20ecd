//! Core error types for discipline-core.
//!
//! This module defines the error hierarchy using thiserror. Ledger and timer
//! rejections share [`LedgerError`] so the boundary can turn any of them into a
//! human-readable status line.

use std::path::PathBuf;
use thiserror::Error;

use crate::rewards::RewardCategory;

/// Core error type for discipline-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Ledger and session errors
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejections raised by the session timer and the reward ledger.
///
/// Every variant leaves the authoritative balance untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// start while running, stop while idle, or a stale session id.
    #[error("Cannot {action}: {reason}")]
    IllegalTransition {
        action: &'static str,
        reason: String,
    },

    /// Negative, non-finite or non-numeric quantity.
    #[error("Invalid amount for '{field}': {value}")]
    InvalidAmount { field: &'static str, value: String },

    #[error("Unknown reward category: {0}")]
    UnknownCategory(String),

    #[error("Insufficient {category} balance: requested {requested}, available {available}")]
    InsufficientBalance {
        category: RewardCategory,
        requested: f64,
        available: f64,
    },

    /// The persistence or transport collaborator could not be reached.
    #[error("Ledger unavailable: {0}")]
    CollaboratorUnavailable(String),
}

impl LedgerError {
    pub(crate) fn invalid_amount(field: &'static str, value: impl ToString) -> Self {
        LedgerError::InvalidAmount {
            field,
            value: value.to_string(),
        }
    }

    pub(crate) fn illegal(action: &'static str, reason: impl Into<String>) -> Self {
        LedgerError::IllegalTransition {
            action,
            reason: reason.into(),
        }
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
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
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg)
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<DatabaseError> for LedgerError {
    fn from(err: DatabaseError) -> Self {
        LedgerError::CollaboratorUnavailable(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
