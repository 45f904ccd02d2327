//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_vault::prelude::*;` to import all essential types.

pub use crate::{VaultError, VaultResult};

pub use crate::{DocumentVault, PassphraseSource, ProtectedDocument};

pub use crate::{Enrollment, StorageKind, TotpSecretStore};

pub use crate::{ShutdownGuard, ShutdownHooks, Wipe};
