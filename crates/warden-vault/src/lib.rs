//! Warden Vault - at-rest protection for secrets.
//!
//! This crate provides:
//! - [`DocumentVault`]: encrypts the system-prompt document on first run,
//!   decrypts it into memory afterwards, pins it with a SHA-256 hash and
//!   optionally mirrors it into a memory-backed directory
//! - [`TotpSecretStore`]: the TOTP enrollment secret, encrypted when a
//!   passphrase is set and owner-only plaintext otherwise
//! - [`ShutdownHooks`]: wipes mirrors and cached plaintext on every exit path
//!
//! The passphrase comes from a single environment variable and is read once
//! per operation; see [`PassphraseSource`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod document;
pub mod error;
pub mod mirror;
pub mod passphrase;
pub mod shutdown;
pub mod totp_store;

pub use document::{DocumentVault, ProtectedDocument};
pub use error::{VaultError, VaultResult};
pub use mirror::MemoryMirror;
pub use passphrase::PassphraseSource;
pub use shutdown::{ShutdownGuard, ShutdownHooks, Wipe};
pub use totp_store::{Enrollment, StorageKind, TotpSecretStore};
