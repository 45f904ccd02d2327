//! Observers notified when a gated send needs a TOTP code.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};
use warden_core::truncate_chars;

/// Characters of message content shown in a prompt preview.
pub const PREVIEW_CHARS: usize = 100;

/// A request for the owner to approve an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPrompt {
    /// Channel the message is going out on.
    pub channel: String,
    /// Recipient on that channel.
    pub recipient: String,
    /// Start of the message content.
    pub preview: String,
    /// Minutes the approval window stays open once a code is accepted.
    pub window_minutes: u32,
    /// Text to show the owner.
    pub message: String,
}

impl ApprovalPrompt {
    /// Build the prompt for a send of `content` to `recipient`.
    #[must_use]
    pub fn new(channel: &str, recipient: &str, content: &str, window_minutes: u32) -> Self {
        let preview = preview(content);
        let message = format!(
            "Approval needed to send on {channel} to {recipient}:\n\"{preview}\"\n\
             Reply with your 6-digit authenticator code to approve sends for \
             {window_minutes} minutes."
        );
        Self {
            channel: channel.to_owned(),
            recipient: recipient.to_owned(),
            preview,
            window_minutes,
            message,
        }
    }
}

/// First [`PREVIEW_CHARS`] characters, with `…` appended if cut.
#[must_use]
pub fn preview(content: &str) -> String {
    let head = truncate_chars(content, PREVIEW_CHARS);
    if head.len() < content.len() {
        format!("{head}…")
    } else {
        head.to_owned()
    }
}

/// Receives approval prompts (e.g. to forward them to the owner's phone).
pub trait PromptListener: Send + Sync {
    /// Called once per gated send that is waiting for a code.
    fn on_prompt(&self, prompt: &ApprovalPrompt);
}

impl<F> PromptListener for F
where
    F: Fn(&ApprovalPrompt) + Send + Sync,
{
    fn on_prompt(&self, prompt: &ApprovalPrompt) {
        self(prompt);
    }
}

/// Handle returned by [`PromptListeners::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registry of prompt listeners.
#[derive(Default)]
pub struct PromptListeners {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn PromptListener>)>>,
}

impl std::fmt::Debug for PromptListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptListeners")
            .field("count", &self.len())
            .finish()
    }
}

impl PromptListeners {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener.
    pub fn register(&self, listener: Arc<dyn PromptListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Deliver `prompt` to every listener. Returns how many were notified.
    pub fn notify(&self, prompt: &ApprovalPrompt) -> usize {
        // Call outside the lock so listeners may register or unregister.
        let listeners: Vec<Arc<dyn PromptListener>> = self
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        if listeners.is_empty() {
            debug!(channel = %prompt.channel, "no prompt listeners registered");
        }
        for listener in &listeners {
            listener.on_prompt(prompt);
        }
        listeners.len()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<(ListenerId, Arc<dyn PromptListener>)>> {
        self.listeners.read().unwrap_or_else(|e| {
            warn!("prompt listener lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, Vec<(ListenerId, Arc<dyn PromptListener>)>> {
        self.listeners.write().unwrap_or_else(|e| {
            warn!("prompt listener lock poisoned, recovering");
            e.into_inner()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_preview_short_content_unchanged() {
        assert_eq!(preview("hello"), "hello");
        assert_eq!(preview(&"a".repeat(100)), "a".repeat(100));
    }

    #[test]
    fn test_preview_long_content_gets_ellipsis() {
        let p = preview(&"ü".repeat(150));
        assert_eq!(p.chars().count(), 101);
        assert!(p.ends_with('…'));
    }

    #[test]
    fn test_prompt_message_mentions_window() {
        let prompt = ApprovalPrompt::new("telegram", "alice", "see you soon", 30);
        assert!(prompt.message.contains("telegram"));
        assert!(prompt.message.contains("alice"));
        assert!(prompt.message.contains("see you soon"));
        assert!(prompt.message.contains("30 minutes"));
    }

    #[test]
    fn test_register_notify_unregister() {
        let listeners = PromptListeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = listeners.register(Arc::new(move |p: &ApprovalPrompt| {
            sink.lock().unwrap().push(p.recipient.clone());
        }));

        let prompt = ApprovalPrompt::new("sms", "bob", "hi", 5);
        assert_eq!(listeners.notify(&prompt), 1);
        assert_eq!(seen.lock().unwrap().as_slice(), ["bob".to_owned()]);

        assert!(listeners.unregister(id));
        assert!(!listeners.unregister(id));
        assert_eq!(listeners.notify(&prompt), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_listener_may_unregister_itself() {
        let listeners = Arc::new(PromptListeners::new());
        let registry = Arc::clone(&listeners);
        let own_id = Arc::new(Mutex::new(None::<ListenerId>));
        let id_slot = Arc::clone(&own_id);
        let id = listeners.register(Arc::new(move |_: &ApprovalPrompt| {
            if let Some(id) = *id_slot.lock().unwrap() {
                registry.unregister(id);
            }
        }));
        *own_id.lock().unwrap() = Some(id);

        listeners.notify(&ApprovalPrompt::new("sms", "bob", "hi", 5));
        assert!(listeners.is_empty());
    }
}
