//! Wipe-on-exit hooks for decrypted secrets.
//!
//! Targets register once; [`ShutdownHooks::install`] spawns a single signal
//! listener (SIGINT, plus SIGTERM and SIGHUP on unix) that wipes every target
//! before the process exits. Normal exits go through [`ShutdownGuard`] or an
//! explicit [`ShutdownHooks::run`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use warden_core::SoftOutcome;

/// Something holding plaintext that must be wiped on exit.
pub trait Wipe: Send + Sync {
    /// Wipe all plaintext. Must be idempotent.
    fn wipe(&self) -> SoftOutcome;
}

/// Registry of wipe targets plus the one-time signal installation.
#[derive(Default)]
pub struct ShutdownHooks {
    targets: Mutex<Vec<Arc<dyn Wipe>>>,
    installed: AtomicBool,
}

impl std::fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHooks")
            .field("targets", &self.lock().len())
            .field("installed", &self.is_installed())
            .finish()
    }
}

impl ShutdownHooks {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Wipe>>> {
        self.targets.lock().unwrap_or_else(|e| {
            warn!("shutdown hook lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Add a target.
    pub fn register(&self, target: Arc<dyn Wipe>) {
        self.lock().push(target);
    }

    /// Remove `target` (compared by pointer). Returns `true` if it was
    /// registered.
    pub fn unregister(&self, target: &Arc<dyn Wipe>) -> bool {
        let mut targets = self.lock();
        let before = targets.len();
        targets.retain(|t| !Arc::ptr_eq(t, target));
        targets.len() < before
    }

    /// Number of registered targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether the signal listener has been installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Wipe every target now. Returns the number of degraded wipes.
    pub fn run(&self) -> usize {
        // Clone out so a target's wipe cannot deadlock on the registry.
        let targets: Vec<_> = self.lock().iter().map(Arc::clone).collect();
        let degraded = targets
            .iter()
            .filter(|t| t.wipe().log().is_degraded())
            .count();
        debug!(targets = targets.len(), degraded, "shutdown wipe complete");
        degraded
    }

    /// Spawn the signal listener on the current tokio runtime.
    ///
    /// Returns `true` only for the call that installed it. Without a runtime
    /// nothing is installed and a later call may try again.
    pub fn install(self: &Arc<Self>) -> bool {
        let Ok(handle) = Handle::try_current() else {
            debug!("no tokio runtime, signal wipe hooks not installed");
            return false;
        };
        if self.installed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let hooks = Arc::clone(self);
        handle.spawn(async move {
            let code = wait_for_signal().await;
            info!(code, "termination signal received, wiping secrets");
            hooks.run();
            std::process::exit(code);
        });
        true
    }

    /// Guard that runs the hooks when dropped.
    #[must_use]
    pub fn guard(self: &Arc<Self>) -> ShutdownGuard {
        ShutdownGuard {
            hooks: Arc::clone(self),
        }
    }
}

/// Runs [`ShutdownHooks::run`] on drop, including during unwinding.
#[derive(Debug)]
pub struct ShutdownGuard {
    hooks: Arc<ShutdownHooks>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.hooks.run();
    }
}

/// Wait for a termination signal and return the conventional exit code.
#[cfg(unix)]
async fn wait_for_signal() -> i32 {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut term, mut hup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(term), Ok(hup)) => (term, hup),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "cannot register SIGTERM/SIGHUP, wiping on SIGINT only");
            return ctrl_c().await;
        },
    };
    tokio::select! {
        code = ctrl_c() => code,
        _ = term.recv() => 143,
        _ = hup.recv() => 129,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> i32 {
    ctrl_c().await
}

async fn ctrl_c() -> i32 {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    130
}
