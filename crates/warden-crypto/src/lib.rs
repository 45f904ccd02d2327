//! Warden Crypto - Cryptographic primitives for the outbound gate.
//!
//! This crate provides:
//! - Passphrase-based authenticated encryption for secrets at rest
//!   (PBKDF2-HMAC-SHA512 key derivation, AES-256-GCM)
//! - RFC 6238 time-based one-time passwords and enrollment URIs
//! - SHA-256 content hashing for document integrity checks
//! - Secure erase (zero overwrite, then unlink) of plaintext files
//!
//! # Example
//!
//! ```
//! use warden_crypto::{decrypt, encrypt};
//!
//! let blob = encrypt(b"system prompt", "correct horse").unwrap();
//! let plain = decrypt(&blob, "correct horse").unwrap();
//! assert_eq!(plain.as_slice(), b"system prompt");
//! assert!(decrypt(&blob, "wrong").is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod base32;
mod cipher;
mod error;
mod hash;
pub mod totp;
mod wipe;

pub use cipher::{
    EncryptedBlob, IV_LEN, KDF_ITERATIONS, KEY_LEN, SALT_LEN, TAG_LEN, decrypt, decrypt_to_string,
    derive_key, encrypt,
};
pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use wipe::secure_erase;
