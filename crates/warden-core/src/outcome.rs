//! Soft outcomes for best-effort operations.
//!
//! Some operations (appending to the audit trail, wiping a plaintext source
//! after first-run encryption, mirroring a document into tmpfs) must never
//! interrupt the action they accompany. They return [`SoftOutcome`] instead
//! of a `Result`: a degraded outcome is logged and otherwise ignored. Hard
//! failures keep using each crate's `Result` type and are propagated.

use std::fmt;

/// Result of a best-effort operation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum SoftOutcome {
    /// The operation completed.
    Completed,
    /// The operation was skipped because it is not configured.
    Skipped,
    /// The operation failed; the caller continues regardless.
    Degraded {
        /// Short name of the operation (e.g. `"audit.append"`).
        operation: &'static str,
        /// Human-readable failure reason.
        reason: String,
    },
}

impl SoftOutcome {
    /// Build a degraded outcome from any displayable error.
    pub fn degraded(operation: &'static str, reason: impl fmt::Display) -> Self {
        Self::Degraded {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if the operation failed.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Log a degraded outcome at `warn` and return `self`.
    pub fn log(self) -> Self {
        if let Self::Degraded { operation, reason } = &self {
            tracing::warn!(
                operation = *operation,
                reason = %reason,
                "best-effort operation degraded"
            );
        }
        self
    }
}

impl fmt::Display for SoftOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Degraded { operation, reason } => write!(f, "{operation} degraded: {reason}"),
        }
    }
}
