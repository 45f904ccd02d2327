//! Audit-related error types.
//!
//! Only reading the trail back can fail hard; appending is best effort.

use thiserror::Error;

/// Errors that can occur while reading the audit trail.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The log file could not be read.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// A line is not a valid audit entry.
    #[error("malformed audit entry on line {line}: {reason}")]
    MalformedEntry {
        /// One-based line number.
        line: usize,
        /// Parser message.
        reason: String,
    },
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
