//! RFC 4648 base32 (uppercase alphabet) used for TOTP secrets.
//!
//! Authenticator apps expect unpadded uppercase base32 in enrollment URIs.
//! Decoding is lenient about case, padding and embedded spaces because users
//! copy secrets by hand.

use crate::error::{CryptoError, CryptoResult};

const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Encode bytes as unpadded uppercase base32.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // shifts stay below 16 bits of the u32 buffer
pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().saturating_mul(8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits = bits.saturating_add(8);
        while bits >= 5 {
            bits = bits.saturating_sub(5);
            let index = (buffer >> bits) & 0x1f;
            out.push(char::from(ALPHABET[index as usize]));
        }
        buffer &= (1_u32 << bits).wrapping_sub(1);
    }

    if bits > 0 {
        let index = (buffer << (5_u32.saturating_sub(bits))) & 0x1f;
        out.push(char::from(ALPHABET[index as usize]));
    }
    out
}

fn decode_symbol(symbol: u8) -> Option<u32> {
    match symbol {
        b'A'..=b'Z' => Some(u32::from(symbol.saturating_sub(b'A'))),
        b'a'..=b'z' => Some(u32::from(symbol.saturating_sub(b'a'))),
        b'2'..=b'7' => Some(u32::from(symbol.saturating_sub(b'2')).saturating_add(26)),
        _ => None,
    }
}

/// Decode base32, ignoring case, `=` padding and whitespace.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidBase32`] on any character outside the
/// alphabet.
#[allow(clippy::arithmetic_side_effects)] // shifts stay below 16 bits of the u32 buffer
pub fn decode(input: &str) -> CryptoResult<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len().saturating_mul(5) / 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;

    for symbol in input.bytes() {
        if symbol == b'=' || symbol.is_ascii_whitespace() {
            continue;
        }
        let value = decode_symbol(symbol).ok_or_else(|| {
            CryptoError::InvalidBase32(format!("unexpected character {:?}", char::from(symbol)))
        })?;
        buffer = (buffer << 5) | value;
        bits = bits.saturating_add(5);
        if bits >= 8 {
            bits = bits.saturating_sub(8);
            out.push(((buffer >> bits) & 0xff) as u8);
        }
        buffer &= (1_u32 << bits).wrapping_sub(1);
    }
    Ok(out)
}
