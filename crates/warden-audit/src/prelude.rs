//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_audit::prelude::*;` to import all essential types.

pub use crate::{AuditError, AuditResult};

pub use crate::{AuditLog, AuditLogEntry, BlockReason, read_entries};
