//! Bridge from `warden_config::Config` to domain types.
//!
//! The config crate has no dependencies on other internal crates. This
//! module translates config sections into the types the approval, audit,
//! vault and telemetry crates expect, in one place.

use std::sync::Arc;

use warden_approval::{ExecApprovalClient, UnixSocketApprovalClient};
use warden_audit::AuditLog;
use warden_config::Config;
use warden_core::WardenHome;
use warden_telemetry::LogConfig;
use warden_vault::{DocumentVault, TotpSecretStore};

use crate::error::RuntimeResult;

/// Convert `[logging]` to a [`LogConfig`].
///
/// # Errors
///
/// Returns an error if the format is unknown.
pub fn to_log_config(cfg: &Config) -> RuntimeResult<LogConfig> {
    Ok(LogConfig::from_section(&cfg.logging)?)
}

/// Build the audit trail for `[audit]`: disabled, the configured path, or
/// `<home>/audit/outbound.jsonl`.
#[must_use]
pub fn to_audit_log(cfg: &Config, home: &WardenHome) -> AuditLog {
    if !cfg.audit.enabled {
        return AuditLog::disabled();
    }
    AuditLog::new(cfg.audit.path.clone().unwrap_or_else(|| home.audit_log_path()))
}

/// Exec-approval client for `[trust_gate.socket]`, if a path is set.
#[must_use]
pub fn to_exec_client(cfg: &Config) -> Option<Arc<dyn ExecApprovalClient>> {
    UnixSocketApprovalClient::from_config(&cfg.trust_gate.socket)
        .map(|c| Arc::new(c) as Arc<dyn ExecApprovalClient>)
}

/// Document vault for `[vault]`.
#[must_use]
pub fn to_document_vault(cfg: &Config, home: &WardenHome) -> DocumentVault {
    DocumentVault::from_config(home, &cfg.vault)
}

/// TOTP secret store for `[totp]` and `[vault]`.
#[must_use]
pub fn to_totp_store(cfg: &Config, home: &WardenHome) -> TotpSecretStore {
    TotpSecretStore::from_config(home, &cfg.totp, &cfg.vault)
}
