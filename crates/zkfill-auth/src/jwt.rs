//! Unverified JWT payload decoding.
//!
//! Only the `exp` claim is read, to schedule proactive refreshes.
//! Signatures are deliberately NOT verified here: token authenticity rests
//! on transport security and server issuance, not on local validation.
//! Anything that does not look like a JWT simply yields `None`.

use serde_json::Value;

use zkfill_crypto::b64;

/// Decode the payload segment of a compact JWT as JSON.
pub fn decode_payload(token: &str) -> Option<Value> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload = parts.next()?;

    let bytes = b64::decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// The token's expiry instant in epoch milliseconds, from the unverified
/// `exp` claim (seconds).
pub fn expires_at_ms(token: &str) -> Option<i64> {
    let payload = decode_payload(token)?;
    let exp = payload.get("exp")?.as_f64()?;
    Some((exp * 1000.0) as i64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
