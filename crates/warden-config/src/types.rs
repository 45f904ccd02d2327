//! Configuration types for Warden.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal warden crates. Every struct implements [`Default`] with the same
//! values as the embedded `defaults.toml`, so a bare `[section]` header in
//! TOML produces a working configuration.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Action name for outbound message sends.
pub const MESSAGE_SEND: &str = "message.send";

/// Default environment variable holding the vault passphrase.
pub const DEFAULT_PASSPHRASE_ENV: &str = "WARDEN_VAULT_PASSPHRASE";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trust level, gated actions and approval mode.
    pub trust_gate: TrustGateSection,
    /// TOTP enrollment labels and approval window length.
    pub totp: TotpSection,
    /// Per-channel and per-account send ceilings.
    pub rate_limits: RateLimitsSection,
    /// Outbound audit trail.
    pub audit: AuditSection,
    /// At-rest protection for the system-prompt document.
    pub vault: VaultSection,
    /// Delivery-layer blocking rules.
    pub delivery: DeliverySection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// TrustGateSection
// ---------------------------------------------------------------------------

/// How the trust gate obtains approval for a gated action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    /// Delegate to the external exec-approval socket service.
    #[default]
    Socket,
    /// Prompt the owner for a TOTP code and open an approval window.
    Totp,
}

impl std::fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Socket => write!(f, "socket"),
            Self::Totp => write!(f, "totp"),
        }
    }
}

/// Trust gate policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustGateSection {
    /// Trust level. `0` disables gating entirely; `1` and above gate every
    /// action listed in `require_approval`.
    pub trust_level: u8,
    /// Actions that need approval when the trust level is at least 1.
    pub require_approval: Vec<String>,
    /// Approval backend.
    pub mode: ApprovalMode,
    /// Exec-approval socket settings (used in `socket` mode).
    pub socket: ExecSocketSection,
    /// How long a gated send waits for a TOTP approval before it is denied.
    pub totp_timeout_secs: u64,
}

impl Default for TrustGateSection {
    fn default() -> Self {
        Self {
            trust_level: 0,
            require_approval: vec![MESSAGE_SEND.to_owned()],
            mode: ApprovalMode::Socket,
            socket: ExecSocketSection::default(),
            totp_timeout_secs: 120,
        }
    }
}

impl TrustGateSection {
    /// Returns `true` if `action` must be approved under this policy.
    #[must_use]
    pub fn gates(&self, action: &str) -> bool {
        self.trust_level >= 1 && self.require_approval.iter().any(|a| a == action)
    }
}

/// Exec-approval socket client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecSocketSection {
    /// Unix socket path of the approval service.
    pub path: Option<PathBuf>,
    /// Environment variable holding the bearer token, if the service needs one.
    pub token_env: Option<String>,
    /// Upper bound on a single approval round trip.
    pub timeout_secs: u64,
    /// Host tag sent with every request.
    pub host: String,
    /// Security policy tag sent with every request.
    pub security: String,
    /// Ask policy sent with every request.
    pub ask: String,
    /// Agent identifier sent with every request.
    pub agent_id: Option<String>,
}

impl Default for ExecSocketSection {
    fn default() -> Self {
        Self {
            path: None,
            token_env: None,
            timeout_secs: 120,
            host: "gateway".to_owned(),
            security: "allowlist".to_owned(),
            ask: "always".to_owned(),
            agent_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TotpSection
// ---------------------------------------------------------------------------

/// TOTP enrollment and approval window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TotpSection {
    /// Issuer label shown by authenticator apps.
    pub issuer: String,
    /// Account label shown by authenticator apps.
    pub account_label: String,
    /// Minutes an approval window stays open after a valid code.
    pub window_minutes: u32,
    /// Environment variable holding the passphrase for the TOTP secret blob.
    /// Falls back to `vault.passphrase_env` when unset.
    pub passphrase_env: Option<String>,
}

impl Default for TotpSection {
    fn default() -> Self {
        Self {
            issuer: "Warden".to_owned(),
            account_label: "owner".to_owned(),
            window_minutes: 30,
            passphrase_env: None,
        }
    }
}

// ---------------------------------------------------------------------------
// RateLimitsSection
// ---------------------------------------------------------------------------

/// What the delivery layer does when a send exceeds its rate limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Treat the exceedance as an error surfaced to the caller.
    #[default]
    Queue,
    /// Skip the send silently (logged, no error).
    Drop,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queue => write!(f, "queue"),
            Self::Drop => write!(f, "drop"),
        }
    }
}

/// Rate limits keyed by channel name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitsSection {
    /// Per-channel limits (e.g. `[rate_limits.channels.telegram]`).
    pub channels: HashMap<String, ChannelRateLimit>,
}

/// Limits for one channel, with optional per-account overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelRateLimit {
    /// Maximum sends in any rolling 60-second span.
    pub max_per_minute: Option<u32>,
    /// Maximum sends in any rolling hour.
    pub max_per_hour: Option<u32>,
    /// Overflow policy; defaults to `queue`.
    pub overflow: Option<OverflowPolicy>,
    /// Per-account overrides, resolved field by field.
    pub accounts: HashMap<String, AccountRateLimit>,
}

/// Per-account override. Unset fields inherit the channel value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountRateLimit {
    /// Maximum sends in any rolling 60-second span.
    pub max_per_minute: Option<u32>,
    /// Maximum sends in any rolling hour.
    pub max_per_hour: Option<u32>,
    /// Overflow policy.
    pub overflow: Option<OverflowPolicy>,
}

// ---------------------------------------------------------------------------
// AuditSection
// ---------------------------------------------------------------------------

/// Outbound audit trail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    /// Whether outbound attempts are recorded at all.
    pub enabled: bool,
    /// Log file path. `None` uses `<home>/audit/outbound.jsonl`.
    pub path: Option<PathBuf>,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

// ---------------------------------------------------------------------------
// VaultSection
// ---------------------------------------------------------------------------

/// At-rest protection for the system-prompt document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSection {
    /// Environment variable holding the passphrase. Read once per operation.
    pub passphrase_env: String,
    /// Plaintext document to protect (encrypted and wiped on first run).
    pub document_path: Option<PathBuf>,
    /// Mirror the decrypted document into a memory-backed directory for
    /// collaborators that need a file path.
    pub mirror_to_memory: bool,
    /// Memory-backed directory used for the mirror.
    pub memory_dir: PathBuf,
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            passphrase_env: DEFAULT_PASSPHRASE_ENV.to_owned(),
            document_path: None,
            mirror_to_memory: true,
            memory_dir: PathBuf::from("/dev/shm"),
        }
    }
}

// ---------------------------------------------------------------------------
// DeliverySection
// ---------------------------------------------------------------------------

/// Blocking rules applied by the delivery pipeline before the trust gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliverySection {
    /// Record outbound attempts without ever sending them.
    pub watch_mode: bool,
    /// Leading command tokens (e.g. `"/reset"`) that are never sent.
    pub deny_commands: Vec<String>,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["warden_approval=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_gate_defaults() {
        let gate = TrustGateSection::default();
        assert_eq!(gate.trust_level, 0);
        assert_eq!(gate.require_approval, vec![MESSAGE_SEND.to_owned()]);
        assert_eq!(gate.mode, ApprovalMode::Socket);
        assert!(!gate.gates(MESSAGE_SEND));
    }

    #[test]
    fn test_gates_requires_level_and_membership() {
        let gate = TrustGateSection {
            trust_level: 1,
            ..Default::default()
        };
        assert!(gate.gates(MESSAGE_SEND));
        assert!(!gate.gates("file.write"));
    }

    #[test]
    fn test_parse_rate_limits_with_account_override() {
        let toml_str = r#"
            [rate_limits.channels.telegram]
            max_per_minute = 5
            overflow = "drop"

            [rate_limits.channels.telegram.accounts.work]
            max_per_hour = 40
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let telegram = &config.rate_limits.channels["telegram"];
        assert_eq!(telegram.max_per_minute, Some(5));
        assert_eq!(telegram.overflow, Some(OverflowPolicy::Drop));
        assert_eq!(telegram.accounts["work"].max_per_hour, Some(40));
        assert_eq!(telegram.accounts["work"].max_per_minute, None);
    }

    #[test]
    fn test_parse_mode() {
        let config: Config = toml::from_str("[trust_gate]\nmode = \"totp\"\n").unwrap();
        assert_eq!(config.trust_gate.mode, ApprovalMode::Totp);
        assert_eq!(config.trust_gate.totp_timeout_secs, 120);
    }
}
