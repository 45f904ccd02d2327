//! The trust gate: decides whether an outbound send may proceed.
//!
//! # Flow
//!
//! 1. If the trust level is below 1 or `message.send` is not in
//!    `require_approval`, the send is allowed with no side effects.
//! 2. Otherwise the configured [`ApprovalMode`] picks a backend:
//!    - **socket**: ask the exec-approval service, bounded by
//!      `trust_gate.socket.timeout_secs`; errors deny.
//!    - **totp**: allowed if the approval window already covers the send;
//!      otherwise prompt listeners are notified once and the send waits up to
//!      `trust_gate.totp_timeout_secs` for a window to open.
//! 3. Every denial is appended to the audit trail with reason `trust_gate`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use warden_audit::{AuditLog, AuditLogEntry, BlockReason};
use warden_config::{ApprovalMode, Config, ExecSocketSection, MESSAGE_SEND};
use warden_crypto::totp;

use crate::decision::{GateDecision, TrustGateResult};
use crate::error::{ApprovalError, ApprovalResult};
use crate::exec_socket::{ExecApprovalClient, ExecApprovalRequest};
use crate::manager::ApprovalWindowManager;
use crate::prompt::{ApprovalPrompt, PromptListeners, preview};
use crate::window::WindowScope;

/// An outbound send presented to the gate.
#[derive(Debug, Clone, Copy)]
pub struct GateRequest<'a> {
    /// Channel the message is going out on.
    pub channel: &'a str,
    /// Recipient on that channel.
    pub recipient: &'a str,
    /// Message body.
    pub content: &'a str,
    /// Conversation session, if known.
    pub session_id: Option<&'a str>,
}

/// How one gated send obtains its decision.
enum ApprovalBackend<'a> {
    Socket {
        client: Option<&'a dyn ExecApprovalClient>,
        settings: &'a ExecSocketSection,
    },
    Totp {
        windows: &'a ApprovalWindowManager,
        listeners: &'a PromptListeners,
        window_minutes: u32,
        timeout: Duration,
    },
}

impl ApprovalBackend<'_> {
    async fn decide(&self, request: &GateRequest<'_>) -> TrustGateResult {
        match self {
            Self::Socket { client, settings } => {
                let Some(client) = client else {
                    warn!("socket approval mode without an exec-approval client, denying");
                    return TrustGateResult::decided(GateDecision::Deny);
                };
                let argv = vec![
                    MESSAGE_SEND.to_owned(),
                    request.channel.to_owned(),
                    request.recipient.to_owned(),
                    preview(request.content),
                ];
                let exec_request = ExecApprovalRequest::new(argv, settings, request.session_id);
                let timeout = Duration::from_secs(settings.timeout_secs);
                let decision =
                    match tokio::time::timeout(timeout, client.request(&exec_request)).await {
                        Ok(Ok(decision)) => decision,
                        Ok(Err(e)) => {
                            warn!(error = %e, "exec-approval request failed, denying");
                            GateDecision::Deny
                        },
                        Err(_) => {
                            let e = ApprovalError::Timeout {
                                timeout_ms: u64::try_from(timeout.as_millis())
                                    .unwrap_or(u64::MAX),
                            };
                            warn!(error = %e, "exec-approval request timed out, denying");
                            GateDecision::Deny
                        },
                    };
                TrustGateResult::decided(decision)
            },
            Self::Totp {
                windows,
                listeners,
                window_minutes,
                timeout,
            } => {
                if windows.is_action_approved(MESSAGE_SEND) {
                    return TrustGateResult::decided(GateDecision::AllowOnce);
                }
                let prompt = ApprovalPrompt::new(
                    request.channel,
                    request.recipient,
                    request.content,
                    *window_minutes,
                );
                let notified = listeners.notify(&prompt);
                debug!(notified, "approval prompt issued");

                if windows.wait_for_approval(MESSAGE_SEND, *timeout).await {
                    TrustGateResult::decided(GateDecision::AllowOnce)
                } else {
                    TrustGateResult::awaiting_code(prompt.message)
                }
            },
        }
    }
}

/// Decision layer for gated actions.
pub struct TrustGate {
    windows: Arc<ApprovalWindowManager>,
    listeners: Arc<PromptListeners>,
    audit: Arc<AuditLog>,
    exec_client: Option<Arc<dyn ExecApprovalClient>>,
}

impl std::fmt::Debug for TrustGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustGate")
            .field("windows", &self.windows)
            .field("listeners", &self.listeners)
            .field("has_exec_client", &self.exec_client.is_some())
            .finish_non_exhaustive()
    }
}

impl TrustGate {
    /// Gate sharing the given window manager, listeners, and audit trail.
    #[must_use]
    pub fn new(
        windows: Arc<ApprovalWindowManager>,
        listeners: Arc<PromptListeners>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            windows,
            listeners,
            audit,
            exec_client: None,
        }
    }

    /// Use `client` for socket-mode approvals.
    #[must_use]
    pub fn with_exec_client(mut self, client: Arc<dyn ExecApprovalClient>) -> Self {
        self.exec_client = Some(client);
        self
    }

    /// The window manager this gate consults.
    #[must_use]
    pub fn windows(&self) -> &Arc<ApprovalWindowManager> {
        &self.windows
    }

    /// Decide whether `request` may be sent.
    pub async fn request_approval(
        &self,
        config: &Config,
        request: &GateRequest<'_>,
    ) -> TrustGateResult {
        if !config.trust_gate.gates(MESSAGE_SEND) {
            return TrustGateResult::ungated();
        }

        let backend = match config.trust_gate.mode {
            ApprovalMode::Socket => ApprovalBackend::Socket {
                client: self.exec_client.as_deref(),
                settings: &config.trust_gate.socket,
            },
            ApprovalMode::Totp => ApprovalBackend::Totp {
                windows: &self.windows,
                listeners: &self.listeners,
                window_minutes: config.totp.window_minutes,
                timeout: Duration::from_secs(config.trust_gate.totp_timeout_secs),
            },
        };

        let result = backend.decide(request).await;
        if result.allowed {
            debug!(
                channel = request.channel,
                mode = %config.trust_gate.mode,
                "send approved"
            );
        } else {
            info!(
                channel = request.channel,
                mode = %config.trust_gate.mode,
                pending_totp = result.pending_totp,
                "send denied by trust gate"
            );
            let entry = AuditLogEntry::blocked(
                request.channel,
                request.recipient,
                request.content,
                BlockReason::TrustGate,
            )
            .with_session(request.session_id);
            let _ = self.audit.append(&entry);
        }
        result
    }

    /// Verify a TOTP code and, if it is valid, open the approval window for
    /// `totp.window_minutes` covering `trust_gate.require_approval`.
    ///
    /// Returns the number of waiting sends released.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::InvalidCode`] if the code does not verify.
    /// Nothing is changed in that case.
    pub fn submit_code(
        &self,
        config: &Config,
        code: &str,
        secret: &str,
        scope: WindowScope,
        now: DateTime<Utc>,
    ) -> ApprovalResult<usize> {
        if !totp::verify_code(secret, code, totp::DEFAULT_WINDOW, now) {
            debug!("rejected approval code");
            return Err(ApprovalError::InvalidCode);
        }
        let scope = WindowScope {
            actions: scope
                .actions
                .or_else(|| Some(config.trust_gate.require_approval.clone())),
            ..scope
        };
        Ok(self.windows.start_window(config.totp.window_minutes, scope))
    }
}
