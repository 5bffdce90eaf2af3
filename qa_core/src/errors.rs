//! # Error Types
//!
//! Structured error types for qa_core. Every failure the engine can report is
//! a variant here, carrying enough context for an operator (or an audit log)
//! to see exactly which input was rejected.
//!
//! ## Example
//!
//! ```rust
//! use qa_core::errors::{QaError, QaResult};
//!
//! fn validate_weight(sieve: &str, grams: f64) -> QaResult<f64> {
//!     if grams < 0.0 {
//!         let reason = "Weight cannot be negative";
//!         return Err(QaError::invalid_weight(sieve, grams.to_string(), reason));
//!     }
//!     Ok(grams)
//! }
//!
//! assert!(validate_weight("#4", -1.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for qa_core operations
pub type QaResult<T> = Result<T, QaError>;

/// Structured error type for QA operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum QaError {
    /// A weight is negative, non-numeric, or the washed weight exceeds the total
    #[error("Invalid weight for '{sieve}': {value} - {reason}")]
    InvalidWeight {
        sieve: String,
        value: String,
        reason: String,
    },

    /// No aggregate specification exists under this name
    #[error("Aggregate specification not found: {name}")]
    MissingAggregateSpecification { name: String },

    /// Envelope (or raw weight list) length does not match the sieve stack
    #[error("Incompatible envelope length: expected {expected} sieves, got {actual}")]
    IncompatibleEnvelopeLength { expected: usize, actual: usize },

    /// An aggregate specification is malformed (ordering, bounds, missing Pan)
    #[error("Invalid specification '{name}': {reason}")]
    InvalidSpecification { name: String, reason: String },

    /// No test record with this id
    #[error("Test record not found: {id}")]
    RecordNotFound { id: String },

    /// No strand pattern with this id
    #[error("Strand pattern not found: {id}")]
    PatternNotFound { id: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl QaError {
    /// Create an InvalidWeight error
    pub fn invalid_weight(
        sieve: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        QaError::InvalidWeight {
            sieve: sieve.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingAggregateSpecification error
    pub fn missing_specification(name: impl Into<String>) -> Self {
        QaError::MissingAggregateSpecification { name: name.into() }
    }

    /// Create an IncompatibleEnvelopeLength error
    pub fn incompatible_length(expected: usize, actual: usize) -> Self {
        QaError::IncompatibleEnvelopeLength { expected, actual }
    }

    /// Create an InvalidSpecification error
    pub fn invalid_specification(name: impl Into<String>, reason: impl Into<String>) -> Self {
        QaError::InvalidSpecification {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        QaError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(
        path: impl Into<String>,
        locked_by: impl Into<String>,
        locked_at: impl Into<String>,
    ) -> Self {
        QaError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, QaError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            QaError::InvalidWeight { .. } => "INVALID_WEIGHT",
            QaError::MissingAggregateSpecification { .. } => "MISSING_AGGREGATE_SPECIFICATION",
            QaError::IncompatibleEnvelopeLength { .. } => "INCOMPATIBLE_ENVELOPE_LENGTH",
            QaError::InvalidSpecification { .. } => "INVALID_SPECIFICATION",
            QaError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            QaError::PatternNotFound { .. } => "PATTERN_NOT_FOUND",
            QaError::FileError { .. } => "FILE_ERROR",
            QaError::FileLocked { .. } => "FILE_LOCKED",
            QaError::SerializationError { .. } => "SERIALIZATION_ERROR",
            QaError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}
