//! Audit entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::truncate_chars;

/// Content longer than this many characters is truncated before it is
/// written.
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Why an outbound attempt was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// Delivery is in watch-only mode.
    WatchMode,
    /// The content starts with a denied command.
    DenyCommands,
    /// The channel or account exceeded its send rate.
    RateLimit,
    /// Approval was denied or timed out.
    TrustGate,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::WatchMode => "watch_mode",
            Self::DenyCommands => "deny_commands",
            Self::RateLimit => "rate_limit",
            Self::TrustGate => "trust_gate",
        };
        f.write_str(s)
    }
}

/// One outbound attempt. Serialized as a single JSON line with camelCase
/// keys; `blockReason` and `sessionId` are written as `null` when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// When the attempt was made.
    pub timestamp: DateTime<Utc>,
    /// Channel name (e.g. `telegram`).
    pub channel: String,
    /// Recipient on the channel.
    pub recipient: String,
    /// Message body, at most [`MAX_CONTENT_CHARS`] characters once written.
    pub content: String,
    /// Whether the message was withheld.
    pub blocked: bool,
    /// Why it was withheld.
    pub block_reason: Option<BlockReason>,
    /// Conversation session, if known.
    pub session_id: Option<String>,
}

impl AuditLogEntry {
    /// An entry for a message that was sent.
    #[must_use]
    pub fn sent(
        channel: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            channel: channel.into(),
            recipient: recipient.into(),
            content: content.into(),
            blocked: false,
            block_reason: None,
            session_id: None,
        }
    }

    /// An entry for a message that was withheld for `reason`.
    #[must_use]
    pub fn blocked(
        channel: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
        reason: BlockReason,
    ) -> Self {
        Self {
            blocked: true,
            block_reason: Some(reason),
            ..Self::sent(channel, recipient, content)
        }
    }

    /// Attach a session id.
    #[must_use]
    pub fn with_session(mut self, session_id: Option<&str>) -> Self {
        self.session_id = session_id.map(ToOwned::to_owned);
        self
    }

    /// Override the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Serialize as one JSON line (no trailing newline), truncating content.
    pub(crate) fn to_line(&self) -> serde_json::Result<String> {
        let content = truncate_chars(&self.content, MAX_CONTENT_CHARS);
        if content.len() == self.content.len() {
            return serde_json::to_string(self);
        }
        let truncated = Self {
            content: content.to_owned(),
            ..self.clone()
        };
        serde_json::to_string(&truncated)
    }
}
