//! Outbound messages and the channel-adapter seam.

use async_trait::async_trait;
use warden_audit::BlockReason;

/// A message a channel adapter wants to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Channel name (e.g. `"telegram"`).
    pub channel: String,
    /// Recipient on that channel.
    pub recipient: String,
    /// Message body.
    pub content: String,
    /// Sending account, for channels with several.
    pub account_id: Option<String>,
    /// Conversation session, if known.
    pub session_id: Option<String>,
}

impl OutboundMessage {
    /// Message with no account or session.
    #[must_use]
    pub fn new(
        channel: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            recipient: recipient.into(),
            content: content.into(),
            account_id: None,
            session_id: None,
        }
    }

    /// Set the sending account.
    #[must_use]
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Set the session.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// First whitespace-separated token of the content, if any.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        self.content.split_whitespace().next()
    }
}

/// Sends a message on a real channel. Implemented by channel adapters.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Deliver `message`. The error text is surfaced in
    /// [`RuntimeError::SendFailed`](crate::RuntimeError::SendFailed).
    async fn send(&self, message: &OutboundMessage) -> Result<(), String>;
}

/// What happened to one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Sent and recorded.
    Sent,
    /// Not sent; audited with `reason`.
    Blocked {
        /// Why.
        reason: BlockReason,
        /// Set when the trust gate is waiting for a TOTP code.
        prompt_message: Option<String>,
    },
    /// Over its rate limit under the `drop` policy; skipped silently.
    Dropped {
        /// Limiter explanation.
        reason: String,
    },
}

impl DeliveryOutcome {
    /// Returns `true` if the message went out.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }

    /// The block reason, if blocked.
    #[must_use]
    pub fn block_reason(&self) -> Option<BlockReason> {
        match self {
            Self::Blocked { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Whether the content's leading command token is in `deny`. Matching is
/// ASCII case-insensitive.
pub(crate) fn is_denied_command(message: &OutboundMessage, deny: &[String]) -> bool {
    message
        .command()
        .is_some_and(|cmd| deny.iter().any(|d| d.eq_ignore_ascii_case(cmd)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_token() {
        let msg = OutboundMessage::new("telegram", "alice", "  /reset now please");
        assert_eq!(msg.command(), Some("/reset"));
        assert_eq!(OutboundMessage::new("telegram", "alice", "   ").command(), None);
    }

    #[test]
    fn test_denied_command_matches_leading_token_only() {
        let deny = vec!["/reset".to_owned()];
        let msg = |c: &str| OutboundMessage::new("telegram", "alice", c);
        assert!(is_denied_command(&msg("/reset"), &deny));
        assert!(is_denied_command(&msg("/RESET all"), &deny));
        assert!(!is_denied_command(&msg("please /reset"), &deny));
        assert!(!is_denied_command(&msg("/resetting"), &deny));
        assert!(!is_denied_command(&msg("/reset"), &[]));
    }
}
