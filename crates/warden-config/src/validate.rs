//! Post-merge configuration validation.
//!
//! Checks value ranges and cross-field invariants that serde cannot express.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ApprovalMode, Config};

/// Highest supported trust level.
pub const MAX_TRUST_LEVEL: u8 = 3;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_trust_gate(config)?;
    validate_totp(config)?;
    validate_rate_limits(config)?;
    validate_vault(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_trust_gate(config: &Config) -> ConfigResult<()> {
    let gate = &config.trust_gate;

    if gate.trust_level > MAX_TRUST_LEVEL {
        return Err(invalid(
            "trust_gate.trust_level",
            format!(
                "trust level {} is out of range; must be between 0 and {MAX_TRUST_LEVEL}",
                gate.trust_level
            ),
        ));
    }
    if gate.totp_timeout_secs == 0 {
        return Err(invalid(
            "trust_gate.totp_timeout_secs",
            "totp_timeout_secs must be greater than 0",
        ));
    }
    if gate.socket.timeout_secs == 0 {
        return Err(invalid(
            "trust_gate.socket.timeout_secs",
            "timeout_secs must be greater than 0",
        ));
    }

    if gate.trust_level >= 1 && gate.mode == ApprovalMode::Socket {
        let missing = gate
            .socket
            .path
            .as_ref()
            .is_none_or(|p| p.as_os_str().is_empty());
        if missing {
            return Err(invalid(
                "trust_gate.socket.path",
                "socket mode with trust_level >= 1 requires an exec-approval socket path",
            ));
        }
    }
    Ok(())
}

fn validate_totp(config: &Config) -> ConfigResult<()> {
    if config.totp.window_minutes == 0 {
        return Err(invalid(
            "totp.window_minutes",
            "window_minutes must be greater than 0",
        ));
    }
    if config.totp.issuer.trim().is_empty() {
        return Err(invalid("totp.issuer", "issuer must not be empty"));
    }
    Ok(())
}

fn validate_rate_limits(config: &Config) -> ConfigResult<()> {
    for (channel, limits) in &config.rate_limits.channels {
        let prefix = format!("rate_limits.channels.{channel}");
        check_limit(&format!("{prefix}.max_per_minute"), limits.max_per_minute)?;
        check_limit(&format!("{prefix}.max_per_hour"), limits.max_per_hour)?;
        for (account, over) in &limits.accounts {
            let prefix = format!("{prefix}.accounts.{account}");
            check_limit(&format!("{prefix}.max_per_minute"), over.max_per_minute)?;
            check_limit(&format!("{prefix}.max_per_hour"), over.max_per_hour)?;
        }
    }
    Ok(())
}

fn check_limit(field: &str, limit: Option<u32>) -> ConfigResult<()> {
    if limit == Some(0) {
        return Err(invalid(
            field,
            "limit must be greater than 0; omit the field to disable it",
        ));
    }
    Ok(())
}

fn validate_vault(config: &Config) -> ConfigResult<()> {
    if config.vault.passphrase_env.trim().is_empty() {
        return Err(invalid(
            "vault.passphrase_env",
            "passphrase_env must name an environment variable",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::types::ChannelRateLimit;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_trust_level_out_of_range() {
        let mut config = Config::default();
        config.trust_gate.trust_level = 4;
        config.trust_gate.mode = ApprovalMode::Totp;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "trust_gate.trust_level"
        );
    }

    #[test]
    fn test_socket_mode_requires_path_when_gating() {
        let mut config = Config::default();
        config.trust_gate.trust_level = 1;
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "trust_gate.socket.path"
        );

        config.trust_gate.socket.path = Some(PathBuf::from("/run/warden/approvals.sock"));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_totp_mode_needs_no_socket() {
        let mut config = Config::default();
        config.trust_gate.trust_level = 2;
        config.trust_gate.mode = ApprovalMode::Totp;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut config = Config::default();
        config.rate_limits.channels.insert(
            "sms".to_owned(),
            ChannelRateLimit {
                max_per_minute: Some(0),
                ..Default::default()
            },
        );
        assert_eq!(
            field_of(validate(&config).unwrap_err()),
            "rate_limits.channels.sms.max_per_minute"
        );
    }

    #[test]
    fn test_bad_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config).unwrap_err()), "logging.format");
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = Config::default();
        config.trust_gate.totp_timeout_secs = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.trust_gate.socket.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }
}
