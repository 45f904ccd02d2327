//! Runtime error types.

use thiserror::Error;

/// Errors that can occur in the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(#[from] warden_config::ConfigError),

    /// Logging could not be initialised.
    #[error("Telemetry error: {0}")]
    TelemetryError(#[from] warden_telemetry::TelemetryError),

    /// Approval error (e.g. an invalid TOTP code).
    #[error("Approval error: {0}")]
    ApprovalError(#[from] warden_approval::ApprovalError),

    /// Vault error other than an integrity failure.
    #[error("Vault error: {0}")]
    VaultError(warden_vault::VaultError),

    /// The protected document failed its integrity check; the consuming
    /// session must not start.
    #[error("Session refused: {reason}")]
    SessionRefused {
        /// Why.
        reason: String,
    },

    /// A send exceeded its rate limit under the `queue` overflow policy.
    #[error("Rate limited: {reason}")]
    RateLimited {
        /// Channel the send was for.
        channel: String,
        /// Limiter explanation.
        reason: String,
    },

    /// The channel adapter failed to send.
    #[error("Send failed on {channel}: {reason}")]
    SendFailed {
        /// Channel the send was for.
        channel: String,
        /// Adapter error text.
        reason: String,
    },

    /// A TOTP code was submitted before any secret was enrolled.
    #[error("TOTP is not enrolled")]
    NotEnrolled,

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<warden_vault::VaultError> for RuntimeError {
    fn from(e: warden_vault::VaultError) -> Self {
        match e {
            warden_vault::VaultError::IntegrityMismatch { .. } => Self::SessionRefused {
                reason: e.to_string(),
            },
            other => Self::VaultError(other),
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_mismatch_refuses_session() {
        let err = RuntimeError::from(warden_vault::VaultError::IntegrityMismatch {
            expected: "aa".into(),
            actual: "bb".into(),
        });
        assert!(matches!(err, RuntimeError::SessionRefused { .. }));
        assert!(err.to_string().contains("integrity"));
    }

    #[test]
    fn test_other_vault_errors_pass_through() {
        let err = RuntimeError::from(warden_vault::VaultError::CorruptSecret);
        assert!(matches!(err, RuntimeError::VaultError(_)));
    }
}
