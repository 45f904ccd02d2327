//! Approval window manager.
//!
//! Holds the single [`WindowState`] for a process context together with the
//! queue of callers waiting for approval. All mutation happens in short
//! critical sections of a `std::sync::Mutex` that is never held across an
//! `.await`.
//!
//! # Lifecycle
//!
//! 1. [`start_window`](ApprovalWindowManager::start_window) opens (or
//!    replaces) the window and, in the same critical section, releases every
//!    waiter whose action it approves.
//! 2. Reads ([`is_window_active`](ApprovalWindowManager::is_window_active),
//!    [`is_action_approved`](ApprovalWindowManager::is_action_approved))
//!    close a lapsed window lazily.
//! 3. [`close_window`](ApprovalWindowManager::close_window) closes it and
//!    denies every waiter.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::waiters::WaiterQueue;
use crate::window::{ApprovalWindow, WindowPhase, WindowScope, WindowState};

#[derive(Debug, Default)]
struct Inner {
    state: WindowState,
    waiters: WaiterQueue,
}

impl Inner {
    /// Apply a lapsed window's transition to `Closed`.
    fn refresh(&mut self, now: Instant) {
        if self.state.evaluate(now) == WindowPhase::Expired {
            debug!("approval window expired");
            self.state = WindowState::Closed;
        }
    }
}

/// Point-in-time view of the manager, for status displays and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    /// Whether a window is open.
    pub active: bool,
    /// Time left in the open window.
    pub remaining: Option<Duration>,
    /// Approved actions, sorted.
    pub approved_actions: Vec<String>,
    /// Channel the window was opened from.
    pub channel: Option<String>,
    /// Account the window was opened from.
    pub account_id: Option<String>,
    /// Callers currently waiting for approval.
    pub pending: usize,
}

/// Owns the approval window and its waiters.
#[derive(Debug, Default)]
pub struct ApprovalWindowManager {
    inner: Mutex<Inner>,
}

impl ApprovalWindowManager {
    /// Create a manager with no open window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| {
            warn!("approval window lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Open the window for `duration_minutes`, replacing any open window.
    ///
    /// Returns the number of waiters released.
    pub fn start_window(&self, duration_minutes: u32, scope: WindowScope) -> usize {
        let duration = Duration::from_secs(u64::from(duration_minutes).saturating_mul(60));
        let mut inner = self.lock();
        let window = ApprovalWindow::open(Instant::now(), duration, scope);
        let released = inner.waiters.release_matching(&window.approved_actions);
        info!(
            minutes = duration_minutes,
            actions = ?sorted(&window.approved_actions),
            channel = window.channel.as_deref(),
            released,
            "approval window opened"
        );
        inner.state = WindowState::Open(window);
        released
    }

    /// Returns `true` if a window is open. Closes a lapsed window.
    pub fn is_window_active(&self) -> bool {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.refresh(now);
        inner.state.evaluate(now) == WindowPhase::Open
    }

    /// Returns `true` if a window is open and approves `action`.
    pub fn is_action_approved(&self, action: &str) -> bool {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.refresh(now);
        inner.state.approves(action, now)
    }

    /// Close the window and deny every waiter. Returns how many were denied.
    pub fn close_window(&self) -> usize {
        let mut inner = self.lock();
        inner.state = WindowState::Closed;
        let denied = inner.waiters.deny_all();
        info!(denied, "approval window closed");
        denied
    }

    /// Wait until `action` is approved, the window is closed, or `timeout`
    /// elapses, whichever comes first.
    ///
    /// Returns immediately with `true` if the action is already approved.
    pub async fn wait_for_approval(&self, action: &str, timeout: Duration) -> bool {
        let (id, deadline, mut rx) = {
            let now = Instant::now();
            let mut inner = self.lock();
            inner.refresh(now);
            if inner.state.approves(action, now) {
                return true;
            }
            inner.waiters.prune(now);
            let deadline = now.checked_add(timeout).unwrap_or(now);
            let (id, rx) = inner.waiters.push(action, deadline);
            (id, deadline, rx)
        };
        debug!(action, timeout = ?timeout, "waiting for approval");

        match tokio::time::timeout_at(deadline, &mut rx).await {
            Ok(settled) => settled.unwrap_or(false),
            Err(_) => {
                let was_queued = self.lock().waiters.remove(id);
                if was_queued {
                    debug!(action, "approval wait timed out");
                    false
                } else {
                    // Settled under the lock between the deadline and removal.
                    rx.try_recv().unwrap_or(false)
                }
            },
        }
    }

    /// Callers currently waiting for approval.
    pub fn pending_count(&self) -> usize {
        let mut inner = self.lock();
        inner.waiters.prune(Instant::now());
        inner.waiters.len()
    }

    /// Current state, after applying any lapsed expiry.
    pub fn snapshot(&self) -> WindowSnapshot {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.refresh(now);
        inner.waiters.prune(now);
        let pending = inner.waiters.len();
        match inner.state.window() {
            Some(window) => WindowSnapshot {
                active: true,
                remaining: Some(window.expires_at.saturating_duration_since(now)),
                approved_actions: sorted(&window.approved_actions),
                channel: window.channel.clone(),
                account_id: window.account_id.clone(),
                pending,
            },
            None => WindowSnapshot {
                active: false,
                remaining: None,
                approved_actions: Vec::new(),
                channel: None,
                account_id: None,
                pending,
            },
        }
    }

    /// Close the window and deny every waiter, returning to the initial
    /// state.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = WindowState::Closed;
        inner.waiters.deny_all();
    }
}

fn sorted(actions: &HashSet<String>) -> Vec<String> {
    let mut list: Vec<String> = actions.iter().cloned().collect();
    list.sort();
    list
}
