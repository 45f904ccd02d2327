//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_runtime::prelude::*;` to import all essential types.

pub use crate::{RuntimeError, RuntimeResult};

pub use crate::{DeliveryOutcome, MessageSender, OutboundMessage, Warden};

pub use warden_approval::{ApprovalPrompt, PromptListener, WindowScope};
pub use warden_audit::BlockReason;
pub use warden_config::Config;
pub use warden_vault::ProtectedDocument;
