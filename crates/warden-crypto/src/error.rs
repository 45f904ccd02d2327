//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The blob is shorter than the fixed `salt ‖ iv ‖ tag` header.
    #[error("encrypted blob too short: expected at least {expected} bytes, got {actual}")]
    TruncatedBlob {
        /// Minimum length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Authentication failed: wrong passphrase, tampered or corrupt blob.
    #[error("decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// Encryption failed inside the AEAD implementation.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Decrypted bytes are not valid UTF-8.
    #[error("decrypted content is not valid UTF-8")]
    InvalidUtf8,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid base32 encoding.
    #[error("invalid base32 encoding: {0}")]
    InvalidBase32(String),

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// I/O error (e.g. wiping a file).
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
