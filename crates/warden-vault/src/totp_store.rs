//! Storage for the TOTP enrollment secret.
//!
//! With a passphrase the secret is encrypted into `totp.enc` and any
//! plaintext copy is erased. Without one it falls back to an owner-only
//! plaintext file and logs a warning.

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use warden_config::{TotpSection, VaultSection};
use warden_core::WardenHome;
use warden_core::fs::{create_private_dir, read_regular, write_private};
use warden_crypto::{base32, decrypt_to_string, encrypt, secure_erase, totp};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};
use crate::passphrase::PassphraseSource;

/// How a secret ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Encrypted under the vault passphrase.
    Encrypted,
    /// Plaintext fallback (no passphrase configured).
    Plaintext,
}

/// A freshly enrolled secret.
#[derive(Debug)]
pub struct Enrollment {
    /// Base32 secret for manual entry.
    pub secret: Zeroizing<String>,
    /// `otpauth://` URI for QR codes.
    pub uri: Zeroizing<String>,
    /// Where the secret was stored.
    pub storage: StorageKind,
}

/// Encrypted-or-plaintext store for one TOTP secret.
#[derive(Debug)]
pub struct TotpSecretStore {
    blob_path: PathBuf,
    plaintext_path: PathBuf,
    passphrase: PassphraseSource,
}

impl TotpSecretStore {
    /// Store at explicit paths.
    #[must_use]
    pub fn new(
        blob_path: impl Into<PathBuf>,
        plaintext_path: impl Into<PathBuf>,
        passphrase: PassphraseSource,
    ) -> Self {
        Self {
            blob_path: blob_path.into(),
            plaintext_path: plaintext_path.into(),
            passphrase,
        }
    }

    /// Store under `home`. The passphrase variable is `totp.passphrase_env`
    /// if set, otherwise `vault.passphrase_env`.
    #[must_use]
    pub fn from_config(home: &WardenHome, totp: &TotpSection, vault: &VaultSection) -> Self {
        let var = totp
            .passphrase_env
            .clone()
            .unwrap_or_else(|| vault.passphrase_env.clone());
        Self::new(
            home.totp_blob_path(),
            home.totp_plaintext_path(),
            PassphraseSource::env(var),
        )
    }

    fn ensure_parent(path: &Path) -> VaultResult<()> {
        if let Some(parent) = path.parent()
            && !parent.exists()
        {
            create_private_dir(parent)?;
        }
        Ok(())
    }

    /// Persist `secret`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::CorruptSecret`] if `secret` is not base32, or an
    /// I/O or crypto error if it cannot be written.
    pub fn save(&self, secret: &str) -> VaultResult<StorageKind> {
        if !base32::decode(secret).is_ok_and(|key| !key.is_empty()) {
            return Err(VaultError::CorruptSecret);
        }
        match self.passphrase.read() {
            Some(passphrase) => {
                Self::ensure_parent(&self.blob_path)?;
                let blob = encrypt(secret.as_bytes(), &passphrase)?;
                write_private(&self.blob_path, &blob)?;
                secure_erase(&self.plaintext_path)?;
                info!(path = %self.blob_path.display(), "TOTP secret stored encrypted");
                Ok(StorageKind::Encrypted)
            },
            None => {
                Self::ensure_parent(&self.plaintext_path)?;
                write_private(&self.plaintext_path, secret.as_bytes())?;
                if self.blob_path.exists() {
                    std::fs::remove_file(&self.blob_path)?;
                }
                warn!(
                    path = %self.plaintext_path.display(),
                    "no vault passphrase set, TOTP secret stored in plaintext"
                );
                Ok(StorageKind::Plaintext)
            },
        }
    }

    /// Load the stored secret, if any.
    ///
    /// The encrypted blob wins when both copies exist.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::PassphraseMissing`] if only the blob exists and
    /// no passphrase is set, [`VaultError::Crypto`] if it does not decrypt,
    /// and [`VaultError::CorruptSecret`] if the stored value is not base32.
    pub fn load(&self) -> VaultResult<Option<Zeroizing<String>>> {
        let secret = if let Some(blob) = read_regular(&self.blob_path)? {
            let Some(passphrase) = self.passphrase.read() else {
                return Err(VaultError::PassphraseMissing {
                    path: self.blob_path.clone(),
                });
            };
            decrypt_to_string(&blob, &passphrase)?
        } else if let Some(raw) = read_regular(&self.plaintext_path)? {
            let raw = Zeroizing::new(raw);
            let text = std::str::from_utf8(&raw).map_err(|_| VaultError::CorruptSecret)?;
            Zeroizing::new(text.trim().to_owned())
        } else {
            return Ok(None);
        };

        if base32::decode(&secret).is_err() {
            return Err(VaultError::CorruptSecret);
        }
        Ok(Some(secret))
    }

    /// Generate and store a new secret.
    ///
    /// # Errors
    ///
    /// Returns an error if the secret cannot be stored.
    pub fn enroll(&self, issuer: &str, account: &str) -> VaultResult<Enrollment> {
        let secret = Zeroizing::new(totp::generate_secret(totp::DEFAULT_SECRET_BYTES));
        let storage = self.save(&secret)?;
        let uri = Zeroizing::new(totp::enrollment_uri(&secret, account, issuer));
        info!(issuer, account, ?storage, "TOTP enrolled");
        Ok(Enrollment {
            secret,
            uri,
            storage,
        })
    }

    /// Whether any secret is stored.
    #[must_use]
    pub fn is_enrolled(&self) -> bool {
        self.blob_path.exists() || self.plaintext_path.exists()
    }

    /// Erase both copies.
    ///
    /// # Errors
    ///
    /// Returns an error if either copy cannot be erased.
    pub fn remove(&self) -> VaultResult<()> {
        secure_erase(&self.blob_path)?;
        secure_erase(&self.plaintext_path)?;
        Ok(())
    }
}
