//! Gate decisions and results.

use serde::{Deserialize, Serialize};

/// What an approver decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GateDecision {
    /// Allow this one action.
    AllowOnce,
    /// Allow this action and future ones like it.
    AllowAlways,
    /// Refuse.
    Deny,
}

impl GateDecision {
    /// Map a wire decision string. Anything unrecognised denies.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "allow-once" => Self::AllowOnce,
            "allow-always" => Self::AllowAlways,
            _ => Self::Deny,
        }
    }

    /// Returns `true` for either allow variant.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::AllowOnce | Self::AllowAlways)
    }
}

impl std::fmt::Display for GateDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllowOnce => write!(f, "allow-once"),
            Self::AllowAlways => write!(f, "allow-always"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

/// Result of [`TrustGate::request_approval`](crate::TrustGate::request_approval).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustGateResult {
    /// Whether the action may proceed.
    pub allowed: bool,
    /// The approver's decision. `None` when the action was not gated.
    pub decision: Option<GateDecision>,
    /// The send is waiting on a TOTP code that did not arrive in time.
    pub pending_totp: bool,
    /// Prompt text shown to the owner, when one was issued.
    pub prompt_message: Option<String>,
}

impl TrustGateResult {
    /// Not gated: allowed with no decision.
    #[must_use]
    pub fn ungated() -> Self {
        Self {
            allowed: true,
            decision: None,
            pending_totp: false,
            prompt_message: None,
        }
    }

    /// Outcome of an approver's decision.
    #[must_use]
    pub fn decided(decision: GateDecision) -> Self {
        Self {
            allowed: decision.is_allowed(),
            decision: Some(decision),
            pending_totp: false,
            prompt_message: None,
        }
    }

    /// Denied while waiting for a TOTP code.
    #[must_use]
    pub fn awaiting_code(prompt_message: String) -> Self {
        Self {
            allowed: false,
            decision: Some(GateDecision::Deny),
            pending_totp: true,
            prompt_message: Some(prompt_message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_mapping_fails_closed() {
        assert_eq!(GateDecision::from_wire("allow-once"), GateDecision::AllowOnce);
        assert_eq!(
            GateDecision::from_wire("allow-always"),
            GateDecision::AllowAlways
        );
        assert_eq!(GateDecision::from_wire("deny"), GateDecision::Deny);
        assert_eq!(GateDecision::from_wire("ALLOW-ONCE"), GateDecision::Deny);
        assert_eq!(GateDecision::from_wire(""), GateDecision::Deny);
    }

    #[test]
    fn test_serde_matches_display() {
        for decision in [
            GateDecision::AllowOnce,
            GateDecision::AllowAlways,
            GateDecision::Deny,
        ] {
            let json = serde_json::to_string(&decision).unwrap();
            assert_eq!(json, format!("\"{decision}\""));
        }
    }

    #[test]
    fn test_result_constructors() {
        assert!(TrustGateResult::ungated().allowed);
        assert!(TrustGateResult::decided(GateDecision::AllowAlways).allowed);
        assert!(!TrustGateResult::decided(GateDecision::Deny).allowed);
        let pending = TrustGateResult::awaiting_code("enter code".to_owned());
        assert!(!pending.allowed);
        assert!(pending.pending_totp);
    }
}
