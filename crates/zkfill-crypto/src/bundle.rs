//! Passphrase-protected key backup bundles.
//!
//! A bundle is a portable JSON artifact wrapping the PKCS#8 private key
//! under a passphrase: PBKDF2-HMAC-SHA256 derives a 256-bit AES key from
//! the passphrase and a random salt, AES-GCM encrypts the private key, and
//! the SPKI public key rides alongside in the clear. The format is shared
//! with the vault UI — a bundle produced by either side must import in the
//! other.

use std::num::NonZeroU32;

use ring::pbkdf2;
use serde::{Deserialize, Serialize};

use crate::b64;
use crate::error::BundleError;
use crate::gcm;
use crate::keypair::KeyPair;

/// The only supported bundle format tag.
pub const BUNDLE_FORMAT: &str = "zk-keybundle-v1";

/// Default PBKDF2 iteration count when the bundle does not carry one.
pub const DEFAULT_KDF_ITERATIONS: u32 = 200_000;

/// Salt length for newly exported bundles.
const EXPORT_SALT_LEN: usize = 16;

/// PBKDF2 algorithm: HMAC-SHA256.
static PBKDF2_ALG: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Key-derivation parameters of a bundle.
///
/// Imports are tolerant: only `salt` is required, `iterations` defaults to
/// [`DEFAULT_KDF_ITERATIONS`]. Exports fill in every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KdfParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// Symmetric-encryption parameters of a bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
}

/// A passphrase-protected, portable export of the key pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBundle {
    /// Format tag. Absent in some historical exports; when present it must
    /// equal [`BUNDLE_FORMAT`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Key-derivation parameters.
    #[serde(default)]
    pub kdf: KdfParams,

    /// Symmetric-encryption parameters.
    #[serde(default)]
    pub enc: EncParams,

    /// AES-GCM ciphertext of the PKCS#8 private key (base64).
    pub data: String,

    /// SPKI public key in the clear (base64).
    #[serde(rename = "pub")]
    pub public_key: String,

    /// RFC 3339 creation timestamp.
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Import / export
// ---------------------------------------------------------------------------

/// Decrypt a key bundle with `passphrase` and return the restored pair.
///
/// # Errors
///
/// - [`BundleError::UnsupportedFormat`] for an unknown format tag.
/// - [`BundleError::Malformed`] for missing or undecodable fields.
/// - [`BundleError::AuthenticationFailed`] when the passphrase is wrong or
///   the payload was tampered with — AEAD authentication makes it
///   impossible to return a plausible-looking wrong key.
/// - [`BundleError::InvalidKey`] when the decrypted bytes are not a valid
///   PKCS#8 key or the embedded public key is not valid SPKI.
pub fn import_key_bundle(bundle: &KeyBundle, passphrase: &str) -> Result<KeyPair, BundleError> {
    if let Some(format) = bundle.format.as_deref() {
        if format != BUNDLE_FORMAT {
            return Err(BundleError::UnsupportedFormat {
                format: format.to_string(),
            });
        }
    }
    if passphrase.is_empty() {
        return Err(BundleError::Malformed {
            reason: "passphrase required".into(),
        });
    }

    let salt = decode_required(bundle.kdf.salt.as_deref(), "kdf.salt")?;
    let iv_bytes = decode_required(bundle.enc.iv.as_deref(), "enc.iv")?;
    let encrypted = decode_required(Some(bundle.data.as_str()), "data")?;

    let iv: [u8; gcm::NONCE_LEN_BYTES] =
        iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| BundleError::Malformed {
                reason: format!(
                    "enc.iv must be {} bytes, got {}",
                    gcm::NONCE_LEN_BYTES,
                    iv_bytes.len()
                ),
            })?;

    let iterations = bundle.kdf.iterations.unwrap_or(DEFAULT_KDF_ITERATIONS);
    let key = derive_wrapping_key(passphrase, &salt, iterations)?;

    let pkcs8 = gcm::open(&key, iv, &encrypted).map_err(|_| BundleError::AuthenticationFailed)?;

    let public_key_der = decode_required(Some(bundle.public_key.as_str()), "pub")?;
    let pair =
        KeyPair::from_der(pkcs8, public_key_der).map_err(|e| BundleError::InvalidKey {
            reason: e.to_string(),
        })?;

    tracing::info!("key bundle imported");
    Ok(pair)
}

/// Wrap `pair` into a passphrase-protected bundle.
///
/// Uses a fresh 128-bit salt, a fresh 96-bit IV and
/// [`DEFAULT_KDF_ITERATIONS`] PBKDF2 rounds, matching the vault UI's
/// exporter so either side can import the other's bundles.
pub fn export_key_bundle(pair: &KeyPair, passphrase: &str) -> Result<KeyBundle, BundleError> {
    if passphrase.is_empty() {
        return Err(BundleError::Malformed {
            reason: "passphrase required".into(),
        });
    }

    let salt = gcm::random_bytes(EXPORT_SALT_LEN).map_err(|e| BundleError::EncodeFailed {
        reason: e.to_string(),
    })?;
    let iv = gcm::random_nonce().map_err(|e| BundleError::EncodeFailed {
        reason: e.to_string(),
    })?;

    let key = derive_wrapping_key(passphrase, &salt, DEFAULT_KDF_ITERATIONS)?;
    let data =
        gcm::seal(&key, iv, &pair.private_key_der).map_err(|_| BundleError::EncodeFailed {
            reason: "AES-GCM seal failed".into(),
        })?;

    Ok(KeyBundle {
        format: Some(BUNDLE_FORMAT.to_string()),
        kdf: KdfParams {
            name: Some("PBKDF2".to_string()),
            hash: Some("SHA-256".to_string()),
            iterations: Some(DEFAULT_KDF_ITERATIONS),
            salt: Some(b64::encode(&salt)),
        },
        enc: EncParams {
            name: Some("AES-GCM".to_string()),
            iv: Some(b64::encode(&iv)),
        },
        data: b64::encode(&data),
        public_key: b64::encode(&pair.public_key_der),
        created_at: Some(chrono::Utc::now().to_rfc3339()),
    })
}

/// Derive the 256-bit AES wrapping key from a passphrase and salt.
fn derive_wrapping_key(
    passphrase: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<[u8; gcm::KEY_LEN], BundleError> {
    let iterations = NonZeroU32::new(iterations).ok_or_else(|| BundleError::Malformed {
        reason: "kdf.iterations must be positive".into(),
    })?;

    let mut key = [0u8; gcm::KEY_LEN];
    pbkdf2::derive(PBKDF2_ALG, iterations, salt, passphrase.as_bytes(), &mut key);
    Ok(key)
}

fn decode_required(value: Option<&str>, field: &str) -> Result<Vec<u8>, BundleError> {
    let raw = value.ok_or_else(|| BundleError::Malformed {
        reason: format!("missing {field}"),
    })?;
    b64::decode(raw).map_err(|e| BundleError::Malformed {
        reason: format!("bad base64 in {field}: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
