//! Per-delivery correlation context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one outbound delivery attempt across the gate, the rate
/// limiter and the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryContext {
    /// Unique delivery identifier.
    pub delivery_id: Uuid,
    /// Channel the message is going out on.
    pub channel: String,
    /// Recipient on that channel.
    pub recipient: String,
    /// Account the message is sent from, if the channel has several.
    pub account_id: Option<String>,
    /// Conversation session, if known.
    pub session_id: Option<String>,
    /// When the attempt started.
    pub started_at: DateTime<Utc>,
}

impl DeliveryContext {
    /// Create a context for a new attempt.
    #[must_use]
    pub fn new(channel: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            delivery_id: Uuid::new_v4(),
            channel: channel.into(),
            recipient: recipient.into(),
            account_id: None,
            session_id: None,
            started_at: Utc::now(),
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

    /// Milliseconds since the attempt started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// First eight characters of the delivery id, for log lines.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.delivery_id.simple().to_string().chars().take(8).collect()
    }

    /// A tracing span carrying this context's fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "delivery",
            delivery_id = %self.short_id(),
            channel = %self.channel,
            account = self.account_id.as_deref(),
            session = self.session_id.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_creation() {
        let ctx = DeliveryContext::new("telegram", "alice");
        assert_eq!(ctx.channel, "telegram");
        assert_eq!(ctx.recipient, "alice");
        assert!(ctx.account_id.is_none());
        assert!(ctx.session_id.is_none());
    }

    #[test]
    fn test_builder_and_ids() {
        let a = DeliveryContext::new("sms", "+15550100")
            .with_account("work")
            .with_session("s-1");
        let b = DeliveryContext::new("sms", "+15550100");
        assert_ne!(a.delivery_id, b.delivery_id);
        assert_eq!(a.account_id.as_deref(), Some("work"));
        assert_eq!(a.session_id.as_deref(), Some("s-1"));
        assert_eq!(a.short_id().len(), 8);
    }

    #[test]
    fn test_elapsed() {
        let ctx = DeliveryContext::new("sms", "bob");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(ctx.elapsed_ms() >= 10);
    }

    #[test]
    fn test_serialization() {
        let ctx = DeliveryContext::new("email", "carol@example.com").with_account("primary");
        let json = serde_json::to_string(&ctx).unwrap();
        let parsed: DeliveryContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.delivery_id, ctx.delivery_id);
        assert_eq!(parsed.account_id.as_deref(), Some("primary"));
    }
}
