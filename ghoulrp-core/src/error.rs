//! Error types for the progression core.

use thiserror::Error;

use crate::types::RecordKind;

/// Top-level error type for all progression and storage operations.
#[derive(Error, Debug)]
pub enum ProgressionError {
    /// The record does not exist. Not fatal: callers usually prompt creation.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// Which table was queried.
        kind: RecordKind,
        /// Key that was looked up.
        key: String,
    },

    /// A record with this key already exists.
    ///
    /// Public create operations turn this into a `false` outcome; it only
    /// escapes when a caller uses an insert primitive directly.
    #[error("{kind} already exists: {key}")]
    DuplicateKey {
        /// Which table rejected the insert.
        kind: RecordKind,
        /// Conflicting key.
        key: String,
    },

    /// The underlying store is unreachable, or a row could not be decoded.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// An XP or experience delta was rejected before touching storage.
    #[error("Invalid delta: {0}")]
    InvalidDelta(String),

    /// An update request carried no fields or an out-of-range value.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// A character-creation bundle failed validation.
    #[error("Invalid character profile: {0}")]
    InvalidProfile(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProgressionError {
    /// `true` for outcomes a caller should report to the user rather than
    /// treat as an operational failure.
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::DuplicateKey { .. }
                | Self::InvalidDelta(_)
                | Self::InvalidUpdate(_)
                | Self::InvalidProfile(_)
        )
    }

    pub(crate) fn not_found(kind: RecordKind, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ProgressionError>;
