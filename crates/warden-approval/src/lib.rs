//! Warden Approval - human-in-the-loop gating for outbound sends.
//!
//! This crate provides:
//! - [`TrustGate`]: decides whether a send needs approval and obtains it,
//!   either from the external exec-approval service or from a TOTP approval
//!   window
//! - [`ApprovalWindowManager`]: the in-memory approval window and the queue
//!   of sends waiting for it
//! - [`PromptListeners`]: observers told when the owner must enter a code
//! - [`RateLimiter`]: sliding-window send limits per channel and account
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use warden_approval::{ApprovalWindowManager, WindowScope};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let windows = ApprovalWindowManager::new();
//! windows.start_window(30, WindowScope::default());
//! assert!(windows.is_action_approved("message.send"));
//! assert!(windows.wait_for_approval("message.send", Duration::from_secs(1)).await);
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod decision;
/// Error types and results for the approval crate.
pub mod error;
pub mod exec_socket;
pub mod gate;
pub mod manager;
pub mod prompt;
pub mod rate_limit;
pub mod window;

mod waiters;

pub use decision::{GateDecision, TrustGateResult};
pub use error::{ApprovalError, ApprovalResult};
pub use exec_socket::{ExecApprovalClient, ExecApprovalRequest, UnixSocketApprovalClient};
pub use gate::{GateRequest, TrustGate};
pub use manager::{ApprovalWindowManager, WindowSnapshot};
pub use prompt::{ApprovalPrompt, ListenerId, PromptListener, PromptListeners};
pub use rate_limit::{RateLimitDecision, RateLimiter, RateLimits};
pub use window::{ApprovalWindow, WindowPhase, WindowScope, WindowState};
