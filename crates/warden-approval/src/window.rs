//! The approval window state machine.
//!
//! There is no background timer. Whether an open window has lapsed is a pure
//! function of the current instant ([`WindowState::evaluate`]); the manager
//! applies the transition to `Closed` the next time the state is read.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;
use warden_config::MESSAGE_SEND;

/// Which actions a window approves, and where it was opened from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowScope {
    /// Approved actions. `None` approves only `message.send`.
    pub actions: Option<Vec<String>>,
    /// Channel the approval came in on.
    pub channel: Option<String>,
    /// Account on that channel.
    pub account_id: Option<String>,
}

impl WindowScope {
    /// Scope approving exactly `actions`.
    #[must_use]
    pub fn for_actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: Some(actions.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Record the channel and account the approval came from.
    #[must_use]
    pub fn on_channel(mut self, channel: impl Into<String>, account_id: Option<&str>) -> Self {
        self.channel = Some(channel.into());
        self.account_id = account_id.map(ToOwned::to_owned);
        self
    }
}

/// An open approval window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalWindow {
    /// When the window lapses.
    pub expires_at: Instant,
    /// Actions approved while the window is open.
    pub approved_actions: HashSet<String>,
    /// Channel the approval came in on.
    pub channel: Option<String>,
    /// Account on that channel.
    pub account_id: Option<String>,
}

impl ApprovalWindow {
    /// Open a window at `now` lasting `duration`.
    #[must_use]
    pub fn open(now: Instant, duration: Duration, scope: WindowScope) -> Self {
        let approved_actions = match scope.actions {
            Some(actions) if !actions.is_empty() => actions.into_iter().collect(),
            _ => HashSet::from([MESSAGE_SEND.to_owned()]),
        };
        Self {
            expires_at: now.checked_add(duration).unwrap_or(now),
            approved_actions,
            channel: scope.channel,
            account_id: scope.account_id,
        }
    }
}

/// What [`WindowState::evaluate`] reports for a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// No window.
    Closed,
    /// A window is open and has not lapsed.
    Open,
    /// A window is recorded but lapsed; the next read closes it.
    Expired,
}

/// Approval window state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum WindowState {
    /// No approval in effect.
    #[default]
    Closed,
    /// Approval in effect until the window's `expires_at`.
    Open(ApprovalWindow),
}

impl WindowState {
    /// Phase at `now`. Pure: never changes the state.
    #[must_use]
    pub fn evaluate(&self, now: Instant) -> WindowPhase {
        match self {
            Self::Closed => WindowPhase::Closed,
            Self::Open(window) if now >= window.expires_at => WindowPhase::Expired,
            Self::Open(_) => WindowPhase::Open,
        }
    }

    /// Returns `true` if the window is open at `now` and approves `action`.
    #[must_use]
    pub fn approves(&self, action: &str, now: Instant) -> bool {
        match self {
            Self::Open(window) => {
                self.evaluate(now) == WindowPhase::Open && window.approved_actions.contains(action)
            },
            Self::Closed => false,
        }
    }

    /// The open window, if any, regardless of expiry.
    #[must_use]
    pub fn window(&self) -> Option<&ApprovalWindow> {
        match self {
            Self::Open(window) => Some(window),
            Self::Closed => None,
        }
    }
}
