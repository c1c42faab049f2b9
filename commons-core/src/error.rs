//! Error types for commons operations

use thiserror::Error;

/// Durable storage errors.
///
/// Internal store paths return these so tests and diagnostics can tell a
/// corrupt record from a missing one. The public `load` boundary collapses
/// them into "absent".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Persistent medium unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage quota exceeded writing {key} ({bytes} bytes)")]
    QuotaExceeded { key: String, bytes: usize },

    #[error("Malformed record under {key}: {reason}")]
    Malformed { key: String, reason: String },

    #[error("Record under {key} failed shape check: {reason}")]
    ShapeMismatch { key: String, reason: String },

    #[error("Record under {key} belongs to another owner")]
    OwnerMismatch { key: String },

    #[error("Record under {key} has version {found}, expected {expected}")]
    VersionMismatch { key: String, found: u32, expected: u32 },

    #[error("Record under {key} holds {found}, expected {expected}")]
    KindMismatch {
        key: String,
        found: String,
        expected: String,
    },

    #[error("Serialization failed for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Trust ledger errors. These indicate static misconfiguration, not data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Unknown trust action: {key}")]
    UnknownAction { key: String },

    #[error("No active user to apply {action} to")]
    NoActiveUser { action: String },
}

/// Errors reported by the remote data collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Remote {kind} {id} not found")]
    NotFound { kind: String, id: String },

    #[error("Remote request for {kind} failed: {reason}")]
    RequestFailed { kind: String, reason: String },

    #[error("Remote rejected mutation of {kind} {id}: {reason}")]
    Rejected {
        kind: String,
        id: String,
        reason: String,
    },
}

/// Master error type for all commons errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommonsError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Result type alias for commons operations.
pub type CommonsResult<T> = Result<T, CommonsError>;

/// Result type alias for the durable storage layer.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// TESTS
// =============================================================================
