//! The Warden context object.
//!
//! Owns every piece of process-wide state (approval window, waiters, prompt
//! listeners, rate-limit buckets, audit handle, vault cache) so embedding
//! applications and tests hold it explicitly and can [`reset`](Warden::reset)
//! it between runs.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{Instrument, debug, info, warn};
use warden_approval::{
    ApprovalWindowManager, ExecApprovalClient, GateRequest, PromptListeners, RateLimiter,
    RateLimits, TrustGate, WindowScope,
};
use warden_audit::{AuditLog, AuditLogEntry, BlockReason};
use warden_config::{Config, OverflowPolicy};
use warden_core::WardenHome;
use warden_telemetry::DeliveryContext;
use warden_vault::{
    DocumentVault, Enrollment, ProtectedDocument, ShutdownHooks, TotpSecretStore, Wipe,
};

use crate::config_bridge;
use crate::delivery::{DeliveryOutcome, MessageSender, OutboundMessage, is_denied_command};
use crate::error::{RuntimeError, RuntimeResult};


/// Process-wide outbound-gate state.
pub struct Warden {
    config: Config,
    home: WardenHome,
    windows: Arc<ApprovalWindowManager>,
    listeners: Arc<PromptListeners>,
    audit: Arc<AuditLog>,
    gate: TrustGate,
    limiter: RateLimiter,
    document: Arc<DocumentVault>,
    totp: TotpSecretStore,
    hooks: Arc<ShutdownHooks>,
}

impl std::fmt::Debug for Warden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warden")
            .field("home", &self.home.root())
            .field("trust_level", &self.config.trust_gate.trust_level)
            .field("mode", &self.config.trust_gate.mode)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl Warden {
    /// Build a context from an already-loaded config. Performs no I/O.
    ///
    /// In socket mode the exec-approval client is taken from
    /// `[trust_gate.socket]` when a path is configured.
    #[must_use]
    pub fn new(config: Config, home: WardenHome) -> Self {
        let windows = Arc::new(ApprovalWindowManager::new());
        let listeners = Arc::new(PromptListeners::new());
        let audit = Arc::new(config_bridge::to_audit_log(&config, &home));
        let mut gate = TrustGate::new(
            Arc::clone(&windows),
            Arc::clone(&listeners),
            Arc::clone(&audit),
        );
        if let Some(client) = config_bridge::to_exec_client(&config) {
            gate = gate.with_exec_client(client);
        }

        let document = Arc::new(config_bridge::to_document_vault(&config, &home));
        let totp = config_bridge::to_totp_store(&config, &home);
        let hooks = Arc::new(ShutdownHooks::new());
        hooks.register(Arc::clone(&document) as Arc<dyn Wipe>);

        Self {
            config,
            home,
            windows,
            listeners,
            audit,
            gate,
            limiter: RateLimiter::new(),
            document,
            totp,
            hooks,
        }
    }

    /// Resolve the home directory (`home` or `$WARDEN_HOME` or
    /// `~/.warden`), create it, and load the layered config from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the home cannot be resolved or created, or if the
    /// config fails to load or validate.
    pub fn load(home: Option<&Path>) -> RuntimeResult<Self> {
        let home = match home {
            Some(path) => WardenHome::from_path(path),
            None => WardenHome::resolve()?,
        };
        home.ensure()?;
        let resolved = Config::load(Some(home.root()))?;
        info!(
            home = %home.root().display(),
            files = resolved.loaded_files.len(),
            trust_level = resolved.config.trust_gate.trust_level,
            mode = %resolved.config.trust_gate.mode,
            "warden loaded"
        );
        Ok(Self::new(resolved.config, home))
    }

    /// Use `client` for socket-mode approvals instead of the configured one.
    #[must_use]
    pub fn with_exec_client(mut self, client: Arc<dyn ExecApprovalClient>) -> Self {
        self.gate = TrustGate::new(
            Arc::clone(&self.windows),
            Arc::clone(&self.listeners),
            Arc::clone(&self.audit),
        )
        .with_exec_client(client);
        self
    }

    /// Replace the configured document vault (e.g. one with a passphrase
    /// supplied by the embedding application). The old vault's wipe hook is
    /// swapped for the new one; other registered targets are kept.
    #[must_use]
    pub fn with_document_vault(mut self, vault: DocumentVault) -> Self {
        let old: Arc<dyn Wipe> = Arc::clone(&self.document) as Arc<dyn Wipe>;
        self.hooks.unregister(&old);
        let vault = Arc::new(vault);
        self.hooks.register(Arc::clone(&vault) as Arc<dyn Wipe>);
        self.document = vault;
        self
    }

    /// Replace the configured TOTP secret store.
    #[must_use]
    pub fn with_totp_store(mut self, store: TotpSecretStore) -> Self {
        self.totp = store;
        self
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The state directory.
    #[must_use]
    pub fn home(&self) -> &WardenHome {
        &self.home
    }

    /// The approval window manager.
    #[must_use]
    pub fn windows(&self) -> &Arc<ApprovalWindowManager> {
        &self.windows
    }

    /// Observers told when the owner must enter a code.
    #[must_use]
    pub fn prompt_listeners(&self) -> &Arc<PromptListeners> {
        &self.listeners
    }

    /// The audit trail.
    #[must_use]
    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    /// The trust gate.
    #[must_use]
    pub fn trust_gate(&self) -> &TrustGate {
        &self.gate
    }

    /// The send-rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// The TOTP secret store.
    #[must_use]
    pub fn totp_store(&self) -> &TotpSecretStore {
        &self.totp
    }

    /// Wipe-on-exit hooks. The document vault is registered already.
    #[must_use]
    pub fn shutdown_hooks(&self) -> &Arc<ShutdownHooks> {
        &self.hooks
    }

    /// Run one outbound message through the delivery pipeline.
    ///
    /// Rate limits are evaluated against the clock as read after the trust
    /// gate returns, so time spent waiting for approval counts.
    /// See [`deliver_at`](Self::deliver_at) for the pipeline order.
    ///
    /// # Errors
    ///
    /// As for [`deliver_at`](Self::deliver_at).
    pub async fn deliver(
        &self,
        message: &OutboundMessage,
        sender: &dyn MessageSender,
    ) -> RuntimeResult<DeliveryOutcome> {
        self.deliver_with_clock(message, sender, None).await
    }

    /// Run one outbound message through the delivery pipeline, evaluating
    /// rate limits at `now`.
    ///
    /// Order: watch mode, denied commands, trust gate, rate limit, send.
    /// Every blocked attempt and every successful send is audited.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::RateLimited`] when a limit is hit under the
    /// `queue` overflow policy, and [`RuntimeError::SendFailed`] when the
    /// sender fails. A failed send is not recorded against the rate limit.
    pub async fn deliver_at(
        &self,
        message: &OutboundMessage,
        sender: &dyn MessageSender,
        now: DateTime<Utc>,
    ) -> RuntimeResult<DeliveryOutcome> {
        self.deliver_with_clock(message, sender, Some(now)).await
    }

    /// `fixed_now` pins the rate-limit clock; `None` reads it after the gate.
    async fn deliver_with_clock(
        &self,
        message: &OutboundMessage,
        sender: &dyn MessageSender,
        fixed_now: Option<DateTime<Utc>>,
    ) -> RuntimeResult<DeliveryOutcome> {
        let mut ctx = DeliveryContext::new(&message.channel, &message.recipient);
        if let Some(account) = &message.account_id {
            ctx = ctx.with_account(account);
        }
        if let Some(session) = &message.session_id {
            ctx = ctx.with_session(session);
        }
        let span = ctx.span();
        async move {
            let outcome = self.run_pipeline(message, sender, fixed_now).await;
            debug!(elapsed_ms = ctx.elapsed_ms(), ok = outcome.is_ok(), "delivery finished");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_pipeline(
        &self,
        message: &OutboundMessage,
        sender: &dyn MessageSender,
        fixed_now: Option<DateTime<Utc>>,
    ) -> RuntimeResult<DeliveryOutcome> {
        let delivery = &self.config.delivery;
        if delivery.watch_mode {
            info!("watch mode, not sending");
            return Ok(self.block(message, BlockReason::WatchMode));
        }
        if is_denied_command(message, &delivery.deny_commands) {
            info!(command = message.command(), "denied command, not sending");
            return Ok(self.block(message, BlockReason::DenyCommands));
        }

        let request = GateRequest {
            channel: &message.channel,
            recipient: &message.recipient,
            content: &message.content,
            session_id: message.session_id.as_deref(),
        };
        let gate = self.gate.request_approval(&self.config, &request).await;
        if !gate.allowed {
            // The gate has already audited the denial.
            return Ok(DeliveryOutcome::Blocked {
                reason: BlockReason::TrustGate,
                prompt_message: gate.prompt_message,
            });
        }

        // The gate may have waited for a code; re-read the clock after it.
        let now = fixed_now.unwrap_or_else(Utc::now);
        let account = message.account_id.as_deref();
        let limits = RateLimits::resolve(&self.config.rate_limits, &message.channel, account);
        let decision = self
            .limiter
            .check_limit(&message.channel, account, &limits, now);
        if !decision.allowed {
            let reason = decision.reason.unwrap_or_else(|| "rate limit".to_owned());
            self.audit_blocked(message, BlockReason::RateLimit);
            return match decision.overflow {
                OverflowPolicy::Queue => {
                    warn!(reason = %reason, "rate limited");
                    Err(RuntimeError::RateLimited {
                        channel: message.channel.clone(),
                        reason,
                    })
                },
                OverflowPolicy::Drop => {
                    info!(reason = %reason, "rate limited, dropping");
                    Ok(DeliveryOutcome::Dropped { reason })
                },
            };
        }

        if let Err(reason) = sender.send(message).await {
            warn!(reason = %reason, "channel send failed");
            return Err(RuntimeError::SendFailed {
                channel: message.channel.clone(),
                reason,
            });
        }

        let sent_at = fixed_now.unwrap_or_else(Utc::now);
        self.limiter.record_message(&message.channel, account, sent_at);
        let entry = AuditLogEntry::sent(&message.channel, &message.recipient, &message.content)
            .with_session(message.session_id.as_deref());
        let _ = self.audit.append(&entry);
        debug!("sent");
        Ok(DeliveryOutcome::Sent)
    }

    fn audit_blocked(&self, message: &OutboundMessage, reason: BlockReason) {
        let entry = AuditLogEntry::blocked(
            &message.channel,
            &message.recipient,
            &message.content,
            reason,
        )
        .with_session(message.session_id.as_deref());
        let _ = self.audit.append(&entry);
    }

    fn block(&self, message: &OutboundMessage, reason: BlockReason) -> DeliveryOutcome {
        self.audit_blocked(message, reason);
        DeliveryOutcome::Blocked {
            reason,
            prompt_message: None,
        }
    }

    /// Generate, store and return a new TOTP secret using the configured
    /// issuer and account labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot be stored.
    pub fn enroll_totp(&self) -> RuntimeResult<Enrollment> {
        let totp = &self.config.totp;
        Ok(self.totp.enroll(&totp.issuer, &totp.account_label)?)
    }

    /// Verify `code` against the enrolled secret and open the approval
    /// window. Returns the number of waiting sends released.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotEnrolled`] if no secret is stored, an
    /// approval error wrapping `InvalidCode` if the code does not verify,
    /// or a vault error if the secret cannot be read.
    pub fn submit_totp_code(
        &self,
        code: &str,
        scope: WindowScope,
        now: DateTime<Utc>,
    ) -> RuntimeResult<usize> {
        let secret = self.totp.load()?.ok_or(RuntimeError::NotEnrolled)?;
        Ok(self
            .gate
            .submit_code(&self.config, code, &secret, scope, now)?)
    }

    /// Load the protected document.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::SessionRefused`] if the document fails its
    /// integrity check, or a vault error if it cannot be decrypted.
    pub fn protected_document(&self) -> RuntimeResult<ProtectedDocument> {
        self.document.load().map_err(|e| {
            let e = RuntimeError::from(e);
            warn!(error = %e, "protected document unavailable");
            e
        })
    }

    /// Install the signal wipe hooks on the current tokio runtime. Returns
    /// `true` for the call that installed them.
    pub fn install_shutdown_hooks(&self) -> bool {
        self.hooks.install()
    }

    /// Wipe decrypted secrets now. Returns the number of degraded wipes.
    pub fn shutdown(&self) -> usize {
        info!("wiping decrypted secrets");
        self.hooks.run()
    }

    /// Return every piece of in-memory state to its initial value: close
    /// the window (denying waiters), forget rate history and listeners,
    /// release the audit handle, and drop the decrypted document.
    pub fn reset(&self) {
        self.windows.reset();
        self.listeners.clear();
        self.limiter.reset();
        self.audit.reset();
        let _ = self.document.wipe();
        debug!("warden state reset");
    }
}

/// Initialise logging from `[logging]`.
///
/// # Errors
///
/// Returns an error if the format is unknown or a subscriber is already
/// installed.
pub fn init_logging(config: &Config) -> RuntimeResult<()> {
    warden_telemetry::setup_logging(&config_bridge::to_log_config(config)?)?;
    Ok(())
}
