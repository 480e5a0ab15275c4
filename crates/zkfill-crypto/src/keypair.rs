//! The user's RSA-OAEP key pair and the imported-key-handle cache.
//!
//! Key material is held as DER bytes (PKCS#8 for the private key, SPKI for
//! the public key) and serialized as base64url strings, the same encoding
//! the key bundle uses. Exactly one key pair is active at a time; replacing
//! it must clear the [`KeyCache`] and any derived plaintext.
//!
//! Parsing DER into an [`RsaPrivateKey`] is expensive (prime validation and
//! precomputation), so parsed handles are memoized in a bounded cache keyed
//! by a digest of the key material.

use std::fmt;
use std::sync::Arc;

use moka::sync::Cache;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::b64;
use crate::error::{CryptoError, Result};

/// Default RSA modulus size in bits for locally generated key pairs.
pub const DEFAULT_MODULUS_BITS: usize = 4096;

/// Maximum number of parsed private-key handles kept in the cache. One
/// active pair plus headroom for a pair being replaced mid-flight.
const KEY_CACHE_CAPACITY: u64 = 4;

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// An asymmetric key pair used to unseal entry secrets.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// PKCS#8 DER encoding of the RSA private key.
    #[serde(with = "der_b64")]
    pub private_key_der: Vec<u8>,

    /// SPKI DER encoding of the RSA public key.
    #[serde(with = "der_b64")]
    pub public_key_der: Vec<u8>,
}

impl KeyPair {
    /// Build a key pair from raw DER material, validating that both halves
    /// parse.
    pub fn from_der(private_key_der: Vec<u8>, public_key_der: Vec<u8>) -> Result<Self> {
        let pair = Self {
            private_key_der,
            public_key_der,
        };
        pair.private_key()?;
        pair.public_key()?;
        Ok(pair)
    }

    /// Generate a fresh RSA key pair with the given modulus size.
    ///
    /// Use [`DEFAULT_MODULUS_BITS`] for production keys; tests pass a
    /// smaller modulus because key generation time grows steeply with size.
    pub fn generate(bits: usize) -> Result<Self> {
        let mut rng = rand::rngs::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits).map_err(|e| CryptoError::InvalidKey {
            reason: format!("key generation failed: {e}"),
        })?;
        let public = RsaPublicKey::from(&private);

        let private_key_der = private
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidKey {
                reason: format!("pkcs8 encoding failed: {e}"),
            })?
            .as_bytes()
            .to_vec();
        let public_key_der = public
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKey {
                reason: format!("spki encoding failed: {e}"),
            })?
            .as_bytes()
            .to_vec();

        tracing::debug!(bits, "generated RSA key pair");

        Ok(Self {
            private_key_der,
            public_key_der,
        })
    }

    /// Parse the private half. Prefer [`KeyCache::private_key`] in hot
    /// paths.
    pub fn private_key(&self) -> Result<RsaPrivateKey> {
        RsaPrivateKey::from_pkcs8_der(&self.private_key_der).map_err(|e| CryptoError::InvalidKey {
            reason: format!("invalid pkcs8 private key: {e}"),
        })
    }

    /// Parse the public half.
    pub fn public_key(&self) -> Result<RsaPublicKey> {
        RsaPublicKey::from_public_key_der(&self.public_key_der).map_err(|e| {
            CryptoError::InvalidKey {
                reason: format!("invalid spki public key: {e}"),
            }
        })
    }

    /// Stable identity of the private key material, used as the cache key.
    pub fn fingerprint(&self) -> String {
        let digest = ring::digest::digest(&ring::digest::SHA256, &self.private_key_der);
        b64::encode(digest.as_ref())
    }
}

// Key material must never end up in logs via `{:?}`.
impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("fingerprint", &self.fingerprint())
            .field("private_key_der_len", &self.private_key_der.len())
            .field("public_key_der_len", &self.public_key_der.len())
            .finish()
    }
}

mod der_b64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&crate::b64::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::b64::decode(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// KeyCache
// ---------------------------------------------------------------------------

/// Bounded cache of parsed private-key handles, keyed by key-material
/// identity.
///
/// Cleared whenever the active key pair changes (bundle import, forget,
/// external keypair storage change) so a stale handle can never outlive its
/// material.
pub struct KeyCache {
    inner: Cache<String, Arc<RsaPrivateKey>>,
}

impl KeyCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            inner: Cache::builder().max_capacity(KEY_CACHE_CAPACITY).build(),
        }
    }

    /// Return the parsed private key for `pair`, importing and memoizing it
    /// on first use.
    pub fn private_key(&self, pair: &KeyPair) -> Result<Arc<RsaPrivateKey>> {
        let fingerprint = pair.fingerprint();
        if let Some(handle) = self.inner.get(&fingerprint) {
            return Ok(handle);
        }

        let handle = Arc::new(pair.private_key()?);
        self.inner.insert(fingerprint, Arc::clone(&handle));
        tracing::debug!("imported private key handle into cache");
        Ok(handle)
    }

    /// Drop all memoized handles.
    pub fn clear(&self) {
        self.inner.invalidate_all();
        tracing::debug!("key handle cache cleared");
    }

    /// Number of handles currently cached.
    pub fn len(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }

    /// Whether the cache holds no handles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
