//! Vault error types.

use std::path::PathBuf;

use thiserror::Error;
use warden_crypto::CryptoError;

/// Errors that can occur while protecting or loading secrets.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Encryption, decryption, or encoding failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A vault file could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An encrypted blob exists but no passphrase is available.
    #[error("{} is encrypted and no passphrase is set", path.display())]
    PassphraseMissing {
        /// The encrypted blob.
        path: PathBuf,
    },

    /// The decrypted document does not match its recorded hash.
    #[error("document integrity check failed: expected {expected}, found {actual}")]
    IntegrityMismatch {
        /// Hash recorded on first load.
        expected: String,
        /// Hash of the document just decrypted.
        actual: String,
    },

    /// The stored TOTP secret is not valid base32.
    #[error("stored TOTP secret is corrupt")]
    CorruptSecret,
}

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
