//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_crypto::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use warden_crypto::prelude::*;
//!
//! let secret = totp::generate_secret(totp::DEFAULT_SECRET_BYTES);
//! let now = chrono::Utc::now();
//! let code = totp::generate_code(&secret, now).unwrap();
//! assert!(totp::verify_code(&secret, &code, 1, now));
//! ```

// Errors
pub use crate::{CryptoError, CryptoResult};

// At-rest encryption
pub use crate::{EncryptedBlob, decrypt, decrypt_to_string, encrypt};

// Hashing
pub use crate::ContentHash;

// One-time passwords
pub use crate::totp;

// Secure erase
pub use crate::secure_erase;
