/// Errors that can occur while obtaining approval.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The submitted TOTP code is malformed, expired, or wrong.
    #[error("invalid or expired approval code")]
    InvalidCode,

    /// The approval round trip exceeded its deadline.
    #[error("approval timeout after {timeout_ms}ms")]
    Timeout {
        /// Time awaited before timeout, in milliseconds.
        timeout_ms: u64,
    },

    /// The exec-approval socket could not be reached or broke mid-request.
    #[error("exec-approval transport error: {0}")]
    Transport(String),

    /// The exec-approval service answered with something unexpected.
    #[error("exec-approval protocol error: {0}")]
    Protocol(String),

    /// The selected approval mode is missing a required collaborator.
    #[error("approval backend not configured: {0}")]
    NotConfigured(String),
}

impl From<std::io::Error> for ApprovalError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for ApprovalError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;
