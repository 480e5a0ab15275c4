//! Crypto engine error types.
//!
//! Entry decryption failures surface through [`CryptoError`]; key backup
//! import/export failures surface through [`BundleError`]. The two are kept
//! separate because callers treat them differently: a per-entry
//! [`CryptoError`] during a vault fetch is logged and the entry skipped,
//! while a [`BundleError`] is always surfaced to the user.

/// Error type for envelope encryption/decryption and key handling.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The ciphertext envelope is structurally invalid (bad base64, wrong
    /// IV length, missing fields).
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    /// RSA-OAEP unsealing of the per-entry symmetric key failed (wrong
    /// private key or corrupted sealed key).
    #[error("failed to unseal entry key: {reason}")]
    UnsealFailed { reason: String },

    /// AES-GCM decryption failed — wrong key or authentication tag
    /// mismatch. GCM guarantees no silent corruption.
    #[error("entry decryption failed: {reason}")]
    DecryptFailed { reason: String },

    /// AES-GCM or RSA-OAEP encryption failed.
    #[error("entry encryption failed: {reason}")]
    EncryptFailed { reason: String },

    /// The key material could not be parsed (invalid PKCS#8 / SPKI DER) or
    /// key generation failed.
    #[error("invalid key material: {reason}")]
    InvalidKey { reason: String },

    /// The decrypted payload is not valid JSON.
    #[error("payload parse error: {0}")]
    PayloadParse(#[from] serde_json::Error),

    /// The system CSPRNG failed.
    #[error("random generation failed")]
    RandomFailed,
}

/// Error type for passphrase-protected key backup bundles.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// The bundle declares a format tag this implementation does not know.
    #[error("unsupported bundle format: {format}")]
    UnsupportedFormat { format: String },

    /// The bundle is structurally invalid (missing or undecodable fields).
    #[error("invalid bundle: {reason}")]
    Malformed { reason: String },

    /// AES-GCM authentication of the wrapped private key failed — wrong
    /// passphrase or corrupted bundle. The AEAD tag makes it impossible to
    /// produce a plausible-looking wrong key.
    #[error("bundle authentication failed: wrong passphrase or corrupted data")]
    AuthenticationFailed,

    /// The decrypted key material is not a valid PKCS#8 private key or the
    /// embedded public key is not valid SPKI.
    #[error("invalid key material in bundle: {reason}")]
    InvalidKey { reason: String },

    /// Building a bundle failed (key encoding or CSPRNG failure).
    #[error("bundle encoding failed: {reason}")]
    EncodeFailed { reason: String },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, CryptoError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
