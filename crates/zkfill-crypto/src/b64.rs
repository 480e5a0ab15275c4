//! Tolerant base64url codec.
//!
//! All binary fields on the wire (sealed keys, IVs, bundle payloads, DER
//! key material) are emitted as base64url without padding. Peers have
//! historically produced both alphabets, with and without padding and with
//! embedded whitespace, so decoding normalizes before handing the input to
//! the engine.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

/// Encode bytes as base64url without padding.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode a base64 string in either alphabet, tolerating missing padding
/// and embedded whitespace.
pub fn decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let mut padded = normalized.trim_end_matches('=').to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }

    STANDARD.decode(padded)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
