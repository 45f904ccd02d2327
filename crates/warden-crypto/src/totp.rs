//! Time-based one-time passwords (RFC 6238, HMAC-SHA1, 6 digits, 30 s).
//!
//! Stateless: callers own the shared secret (see the vault crate) and pass
//! the evaluation time explicitly, which keeps verification testable.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha1::Sha1;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::base32;
use crate::error::{CryptoError, CryptoResult};

type HmacSha1 = Hmac<Sha1>;

/// Default secret size in bytes (160 bits, as recommended by RFC 4226).
pub const DEFAULT_SECRET_BYTES: usize = 20;
/// Time step in seconds.
pub const STEP_SECONDS: i64 = 30;
/// Number of digits in a code.
pub const DIGITS: usize = 6;
/// Default verification window in steps on either side of `now`.
pub const DEFAULT_WINDOW: u32 = 1;

const MODULUS: u32 = 1_000_000;

/// Generate a random secret of `byte_len` bytes, base32 encoded.
#[must_use]
pub fn generate_secret(byte_len: usize) -> String {
    let mut bytes = Zeroizing::new(vec![0u8; byte_len]);
    OsRng.fill_bytes(&mut bytes);
    base32::encode(&bytes)
}

/// Time-step counter for `at`; times before the epoch clamp to step 0.
fn counter_at(at: DateTime<Utc>) -> u64 {
    let steps = at
        .timestamp_millis()
        .div_euclid(1000)
        .div_euclid(STEP_SECONDS);
    u64::try_from(steps).unwrap_or(0)
}

/// RFC 4226 HOTP value for a raw key and counter.
#[allow(clippy::arithmetic_side_effects)] // offset <= 15, digest is 20 bytes
fn hotp(key: &[u8], counter: u64) -> CryptoResult<u32> {
    let mut mac = <HmacSha1 as Mac>::new_from_slice(key).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: DEFAULT_SECRET_BYTES,
            actual: key.len(),
        }
    })?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = usize::from(digest[digest.len() - 1] & 0x0f);
    let binary = u32::from_be_bytes([
        digest[offset],
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]) & 0x7fff_ffff;
    Ok(binary % MODULUS)
}

fn format_code(value: u32) -> String {
    format!("{value:0width$}", width = DIGITS)
}

/// Generate the code for `secret` at time `at`.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidBase32`] if the secret is not base32.
pub fn generate_code(secret: &str, at: DateTime<Utc>) -> CryptoResult<String> {
    let key = Zeroizing::new(base32::decode(secret)?);
    hotp(&key, counter_at(at)).map(format_code)
}

/// Returns `true` if `code` is exactly six ASCII digits after trimming.
#[must_use]
pub fn is_well_formed(code: &str) -> bool {
    let trimmed = code.trim();
    trimmed.len() == DIGITS && trimmed.bytes().all(|b| b.is_ascii_digit())
}

/// Verify `code` against `secret` at time `at`, accepting codes from
/// `window` steps before and after.
///
/// Every candidate in the window is compared in constant time. Malformed
/// codes and undecodable secrets never verify.
#[must_use]
pub fn verify_code(secret: &str, code: &str, window: u32, at: DateTime<Utc>) -> bool {
    if !is_well_formed(code) {
        return false;
    }
    let Ok(key) = base32::decode(secret).map(Zeroizing::new) else {
        return false;
    };
    let submitted = code.trim().as_bytes();
    let base = counter_at(at);

    let mut matched = false;
    for delta in 0..=u64::from(window) {
        let candidates = [base.checked_sub(delta), base.checked_add(delta)];
        for counter in candidates.into_iter().flatten() {
            let Ok(value) = hotp(&key, counter) else {
                return false;
            };
            let expected = format_code(value);
            matched |= bool::from(expected.as_bytes().ct_eq(submitted));
        }
    }
    matched
}

/// Percent-encode a URI component the way authenticator apps expect
/// (spaces become `%20`, not `+`).
fn encode_component(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Build an `otpauth://` enrollment URI for QR codes and manual entry.
#[must_use]
pub fn enrollment_uri(secret: &str, account: &str, issuer: &str) -> String {
    let issuer = encode_component(issuer);
    let account = encode_component(account);
    format!(
        "otpauth://totp/{issuer}:{account}?secret={secret}&issuer={issuer}\
         &algorithm=SHA1&digits={DIGITS}&period={STEP_SECONDS}"
    )
}
