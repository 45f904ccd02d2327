//! Warden Audit - append-only record of every outbound attempt.
//!
//! Each attempt, sent or blocked, becomes one JSON object on its own line:
//!
//! ```text
//! {"timestamp":"2026-03-01T10:00:00Z","channel":"telegram","recipient":"alice","content":"hi","blocked":false,"blockReason":null,"sessionId":null}
//! ```
//!
//! Appending is best effort. A log that cannot be opened or written is
//! reported as a degraded [`SoftOutcome`](warden_core::SoftOutcome) and the
//! delivery it accompanies goes ahead.
//!
//! # Example
//!
//! ```
//! use warden_audit::{AuditLog, AuditLogEntry, BlockReason};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let log = AuditLog::new(dir.path().join("outbound.jsonl"));
//!
//! let _ = log.append(&AuditLogEntry::sent("telegram", "alice", "on my way"));
//! let _ = log.append(&AuditLogEntry::blocked(
//!     "telegram",
//!     "alice",
//!     "/reset",
//!     BlockReason::DenyCommands,
//! ));
//!
//! let entries = warden_audit::read_entries(log.path().unwrap()).unwrap();
//! assert_eq!(entries.len(), 2);
//! assert!(entries[1].blocked);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod entry;
mod error;
mod log;

pub use entry::{AuditLogEntry, BlockReason, MAX_CONTENT_CHARS};
pub use error::{AuditError, AuditResult};
pub use log::{AuditLog, read_entries};
