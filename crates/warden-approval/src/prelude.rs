//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_approval::prelude::*;` to import all essential types.

// Errors
pub use crate::{ApprovalError, ApprovalResult};

// Gate
pub use crate::{GateDecision, GateRequest, TrustGate, TrustGateResult};

// Window
pub use crate::{ApprovalWindowManager, WindowScope, WindowSnapshot};

// Prompts
pub use crate::{ApprovalPrompt, PromptListener, PromptListeners};

// Rate limiting
pub use crate::{RateLimitDecision, RateLimiter, RateLimits};

// Exec-approval service
pub use crate::{ExecApprovalClient, UnixSocketApprovalClient};
