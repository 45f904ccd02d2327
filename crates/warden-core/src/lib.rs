//! Warden Core - Foundation types shared by every Warden crate.
//!
//! This crate provides:
//! - The [`WardenHome`] state directory layout
//! - Owner-only file helpers used by the audit log and the vault
//! - [`SoftOutcome`] for best-effort operations that must never abort the caller
//! - Character-boundary truncation used for previews and audit content

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod dirs;
pub mod fs;
pub mod outcome;
pub mod utils;

pub use dirs::WardenHome;
pub use outcome::SoftOutcome;
pub use utils::truncate_chars;
