//! Callers blocked in `wait_for_approval`.
//!
//! Each waiter owns a oneshot sender. A waiter is settled by removing it
//! from the queue and sending on its channel, both under the manager's lock,
//! so it can be settled at most once.

use std::collections::HashSet;

use tokio::sync::oneshot;
use tokio::time::Instant;

#[derive(Debug)]
struct Waiter {
    id: u64,
    action: String,
    deadline: Instant,
    tx: oneshot::Sender<bool>,
}

impl Waiter {
    fn settle(self, approved: bool) {
        // The receiver is gone if the caller was cancelled; nothing to do.
        let _ = self.tx.send(approved);
    }
}

#[derive(Debug, Default)]
pub(crate) struct WaiterQueue {
    next_id: u64,
    waiters: Vec<Waiter>,
}

impl WaiterQueue {
    pub(crate) fn push(&mut self, action: &str, deadline: Instant) -> (u64, oneshot::Receiver<bool>) {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.waiters.push(Waiter {
            id,
            action: action.to_owned(),
            deadline,
            tx,
        });
        (id, rx)
    }

    /// Settle `true` every waiter whose action is approved. Returns how many
    /// were released.
    pub(crate) fn release_matching(&mut self, approved: &HashSet<String>) -> usize {
        let (released, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.waiters)
            .into_iter()
            .partition(|w| approved.contains(&w.action));
        self.waiters = kept;
        let count = released.len();
        for waiter in released {
            waiter.settle(true);
        }
        count
    }

    /// Settle `false` every waiter. Returns how many were denied.
    pub(crate) fn deny_all(&mut self) -> usize {
        let denied = std::mem::take(&mut self.waiters);
        let count = denied.len();
        for waiter in denied {
            waiter.settle(false);
        }
        count
    }

    /// Remove a waiter without settling it. Returns `false` if it was
    /// already settled.
    pub(crate) fn remove(&mut self, id: u64) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|w| w.id != id);
        self.waiters.len() != before
    }

    /// Drop waiters whose caller went away or whose deadline passed.
    pub(crate) fn prune(&mut self, now: Instant) {
        self.waiters
            .retain(|w| !w.tx.is_closed() && w.deadline > now);
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }
}
