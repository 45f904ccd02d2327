//! State directory scaffolding for Warden.
//!
//! All runtime state lives under a single home directory (`~/.warden/` or
//! `$WARDEN_HOME`). Every directory is created owner-only.
//!
//! # Layout
//!
//! ```text
//! ~/.warden/                      (WardenHome)
//! ├── audit/
//! │   └── outbound.jsonl            (append-only audit trail, 0600)
//! ├── vault/
//! │   ├── document.enc              (encrypted protected document)
//! │   ├── document.sha256           (integrity hash recorded on first load)
//! │   ├── totp.enc                  (encrypted TOTP enrollment secret)
//! │   └── totp.secret               (plaintext fallback, 0600)
//! ├── logs/                         (runtime log files)
//! └── config.toml                   (user config)
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "WARDEN_HOME";

/// Global Warden home directory (`~/.warden/` or `$WARDEN_HOME`).
#[derive(Debug, Clone)]
pub struct WardenHome {
    root: PathBuf,
}

impl WardenHome {
    /// Resolve the home directory.
    ///
    /// Checks `$WARDEN_HOME` first, then falls back to `$HOME/.warden/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$WARDEN_HOME` is relative, or if neither
    /// `$WARDEN_HOME` nor `$HOME` is set.
    pub fn resolve() -> io::Result<Self> {
        let root = if let Ok(custom) = std::env::var(HOME_ENV) {
            let p = PathBuf::from(&custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "WARDEN_HOME must be an absolute path",
                ));
            }
            p
        } else {
            let home = std::env::var("HOME").map_err(|_| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "neither WARDEN_HOME nor HOME environment variable is set",
                )
            })?;
            PathBuf::from(home).join(".warden")
        };

        Ok(Self { root })
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the directory structure exists with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or permission setting fails.
    pub fn ensure(&self) -> io::Result<()> {
        for dir in [
            self.root.clone(),
            self.audit_dir(),
            self.vault_dir(),
            self.logs_dir(),
        ] {
            crate::fs::create_private_dir(&dir)?;
        }
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Audit directory (`~/.warden/audit/`).
    #[must_use]
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Default audit log file (`~/.warden/audit/outbound.jsonl`).
    #[must_use]
    pub fn audit_log_path(&self) -> PathBuf {
        self.audit_dir().join("outbound.jsonl")
    }

    /// Vault directory (`~/.warden/vault/`).
    #[must_use]
    pub fn vault_dir(&self) -> PathBuf {
        self.root.join("vault")
    }

    /// Encrypted protected document blob.
    #[must_use]
    pub fn document_blob_path(&self) -> PathBuf {
        self.vault_dir().join("document.enc")
    }

    /// Integrity hash recorded for the protected document.
    #[must_use]
    pub fn document_hash_path(&self) -> PathBuf {
        self.vault_dir().join("document.sha256")
    }

    /// Encrypted TOTP enrollment secret.
    #[must_use]
    pub fn totp_blob_path(&self) -> PathBuf {
        self.vault_dir().join("totp.enc")
    }

    /// Plaintext TOTP secret, used only when no passphrase is configured.
    #[must_use]
    pub fn totp_plaintext_path(&self) -> PathBuf {
        self.vault_dir().join("totp.secret")
    }

    /// Logs directory (`~/.warden/logs/`).
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// User config file (`~/.warden/config.toml`).
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}
