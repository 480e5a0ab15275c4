//! Hybrid entry encryption.
//!
//! Each vault entry's secret payload is protected with envelope encryption:
//! a fresh random 256-bit AES-GCM key encrypts the JSON payload under a
//! random 96-bit IV, and that symmetric key is sealed with the user's
//! RSA-OAEP (SHA-256) public key. The stored envelope is
//! `{key, iv, data, salt}` — `key` being the sealed symmetric key and
//! `salt` a legacy field the decryption path ignores.

use rsa::Oaep;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::error::{CryptoError, Result};
use crate::gcm;
use crate::keypair::{KeyCache, KeyPair};
use crate::b64;

/// The encrypted envelope of a single vault entry, as stored remotely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryCiphertext {
    /// The AES key, sealed with RSA-OAEP (base64).
    pub key: String,

    /// 96-bit AES-GCM IV (base64).
    pub iv: String,

    /// AES-GCM ciphertext of the JSON payload, tag appended (base64).
    pub data: String,

    /// Legacy random salt carried on the wire; not used by decryption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// Decrypt an entry envelope into its JSON payload.
///
/// Unseals the symmetric key with the private half of `pair` (memoized via
/// `cache`), AES-GCM-decrypts the payload and parses it as UTF-8 JSON.
///
/// # Errors
///
/// Any failure — undecodable base64, wrong IV length, OAEP rejection, GCM
/// authentication mismatch, non-JSON plaintext — is a [`CryptoError`]. The
/// GCM tag guarantees corruption can never decrypt silently.
pub fn decrypt_ciphertext(
    ciphertext: &EntryCiphertext,
    pair: &KeyPair,
    cache: &KeyCache,
) -> Result<Value> {
    let sealed_key = decode_field(&ciphertext.key, "key")?;
    let iv_bytes = decode_field(&ciphertext.iv, "iv")?;
    let data = decode_field(&ciphertext.data, "data")?;

    let iv: [u8; gcm::NONCE_LEN_BYTES] =
        iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::MalformedEnvelope {
                reason: format!("iv must be {} bytes, got {}", gcm::NONCE_LEN_BYTES, iv_bytes.len()),
            })?;

    let private_key = cache.private_key(pair)?;
    let symmetric_key = private_key
        .decrypt(Oaep::new::<Sha256>(), &sealed_key)
        .map_err(|e| CryptoError::UnsealFailed {
            reason: e.to_string(),
        })?;

    if symmetric_key.len() != gcm::KEY_LEN {
        return Err(CryptoError::UnsealFailed {
            reason: format!(
                "unsealed key must be {} bytes, got {}",
                gcm::KEY_LEN,
                symmetric_key.len()
            ),
        });
    }

    let plaintext = gcm::open(&symmetric_key, iv, &data).map_err(|_| CryptoError::DecryptFailed {
        reason: "authentication failed — wrong key or corrupted data".into(),
    })?;

    let payload: Value = serde_json::from_slice(&plaintext)?;
    Ok(payload)
}

/// Encrypt a JSON payload into an entry envelope.
///
/// Generates a fresh random symmetric key and IV for every call and seals
/// the key with the public half of `pair`. Emits the legacy `salt` field so
/// the output matches what the vault UI produces.
pub fn encrypt_payload(payload: &Value, pair: &KeyPair) -> Result<EntryCiphertext> {
    let plaintext = serde_json::to_vec(payload)?;

    let symmetric_key = gcm::random_bytes(gcm::KEY_LEN)?;
    let iv = gcm::random_nonce()?;
    let salt = gcm::random_bytes(16)?;

    let data = gcm::seal(&symmetric_key, iv, &plaintext).map_err(|_| CryptoError::EncryptFailed {
        reason: "AES-GCM seal failed".into(),
    })?;

    let mut rng = rand::rngs::OsRng;
    let sealed_key = pair
        .public_key()?
        .encrypt(&mut rng, Oaep::new::<Sha256>(), &symmetric_key)
        .map_err(|e| CryptoError::EncryptFailed {
            reason: format!("RSA-OAEP seal failed: {e}"),
        })?;

    Ok(EntryCiphertext {
        key: b64::encode(&sealed_key),
        iv: b64::encode(&iv),
        data: b64::encode(&data),
        salt: Some(b64::encode(&salt)),
    })
}

fn decode_field(value: &str, field: &str) -> Result<Vec<u8>> {
    b64::decode(value).map_err(|e| CryptoError::MalformedEnvelope {
        reason: format!("bad base64 in {field}: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
