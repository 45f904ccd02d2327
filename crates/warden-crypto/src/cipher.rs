//! Passphrase-based authenticated encryption for secrets at rest.
//!
//! Blob layout (all fields fixed width except the ciphertext):
//!
//! ```text
//! salt (16) ‖ iv (12) ‖ auth tag (16) ‖ ciphertext (n)
//! ```
//!
//! The key is derived with PBKDF2-HMAC-SHA512 from the passphrase and the
//! per-blob salt. Every call to [`encrypt`] draws a fresh salt and IV from
//! the OS RNG; nothing is ever reused across blobs.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;
/// PBKDF2 iteration count.
pub const KDF_ITERATIONS: u32 = 100_000;

const HEADER_LEN: usize = SALT_LEN + IV_LEN + TAG_LEN;

/// Derive a 256-bit key from a passphrase and salt.
#[must_use]
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha512>(passphrase.as_bytes(), salt, KDF_ITERATIONS, &mut *key);
    key
}

/// A parsed encrypted blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    /// KDF salt.
    pub salt: [u8; SALT_LEN],
    /// AES-GCM nonce.
    pub iv: [u8; IV_LEN],
    /// AES-GCM authentication tag.
    pub tag: [u8; TAG_LEN],
    /// Encrypted payload.
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Split raw bytes into their fields.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::TruncatedBlob`] if the input is shorter than the
    /// fixed header.
    pub fn parse(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CryptoError::TruncatedBlob {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (iv, rest) = rest.split_at(IV_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut blob = Self {
            salt: [0u8; SALT_LEN],
            iv: [0u8; IV_LEN],
            tag: [0u8; TAG_LEN],
            ciphertext: ciphertext.to_vec(),
        };
        blob.salt.copy_from_slice(salt);
        blob.iv.copy_from_slice(iv);
        blob.tag.copy_from_slice(tag);
        Ok(blob)
    }

    /// Serialize to the on-disk layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN.saturating_add(self.ciphertext.len()));
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

fn cipher_for(key: &[u8; KEY_LEN]) -> CryptoResult<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_LEN,
        actual: key.len(),
    })
}

/// Encrypt `plaintext` under a key derived from `passphrase`.
///
/// # Errors
///
/// Returns [`CryptoError::EncryptionFailed`] if the AEAD rejects the input.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> CryptoResult<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let key = derive_key(passphrase, &salt);
    let cipher = cipher_for(&key)?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut blob = EncryptedBlob {
        salt,
        iv,
        tag: [0u8; TAG_LEN],
        ciphertext: buffer,
    };
    blob.tag.copy_from_slice(&tag);
    Ok(blob.to_bytes())
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Fails closed: any authentication failure is an error, never partial
/// output.
///
/// # Errors
///
/// Returns [`CryptoError::TruncatedBlob`] for short input and
/// [`CryptoError::DecryptionFailed`] for a wrong passphrase or a tampered
/// blob.
pub fn decrypt(blob: &[u8], passphrase: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let parsed = EncryptedBlob::parse(blob)?;
    let key = derive_key(passphrase, &parsed.salt);
    let cipher = cipher_for(&key)?;

    let mut buffer = Zeroizing::new(parsed.ciphertext);
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(&parsed.iv),
            b"",
            buffer.as_mut_slice(),
            Tag::from_slice(&parsed.tag),
        )
        .map_err(|_| CryptoError::DecryptionFailed)?;
    Ok(buffer)
}

/// Decrypt a blob whose plaintext is UTF-8 text.
///
/// # Errors
///
/// Same as [`decrypt`], plus [`CryptoError::InvalidUtf8`].
pub fn decrypt_to_string(blob: &[u8], passphrase: &str) -> CryptoResult<Zeroizing<String>> {
    let bytes = decrypt(blob, passphrase)?;
    let text = std::str::from_utf8(&bytes).map_err(|_| CryptoError::InvalidUtf8)?;
    Ok(Zeroizing::new(text.to_owned()))
}
