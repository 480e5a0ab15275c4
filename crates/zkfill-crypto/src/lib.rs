//! Envelope cryptography for zkfill.
//!
//! This crate implements the zero-knowledge side of the vault protocol: the
//! server only ever sees sealed envelopes, and everything needed to open
//! them lives here.
//!
//! - [`envelope`] — hybrid entry encryption: a fresh AES-256-GCM key per
//!   entry, sealed with the user's RSA-OAEP (SHA-256) public key.
//! - [`bundle`] — passphrase-protected key backup: PBKDF2-HMAC-SHA256 +
//!   AES-GCM wrapping of the PKCS#8 private key, interoperable with the
//!   vault UI's exporter.
//! - [`keypair`] — key material, generation, and the bounded cache of
//!   parsed private-key handles.
//! - [`b64`] — the tolerant base64url codec shared by all wire fields.
//! - [`error`] — [`CryptoError`] and [`BundleError`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use zkfill_crypto::{KeyPair, export_key_bundle};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pair = KeyPair::generate(2048)?;
//! let bundle = export_key_bundle(&pair, "correct horse battery staple")?;
//! println!("backup created at {:?}", bundle.created_at);
//! # Ok(())
//! # }
//! ```

pub mod b64;
pub mod bundle;
pub mod envelope;
pub mod error;
pub mod keypair;

mod gcm;

// Re-export the most commonly used items at the crate root.
pub use bundle::{BUNDLE_FORMAT, DEFAULT_KDF_ITERATIONS, KeyBundle, export_key_bundle, import_key_bundle};
pub use envelope::{EntryCiphertext, decrypt_ciphertext, encrypt_payload};
pub use error::{BundleError, CryptoError, Result};
pub use gcm::random_bytes;
pub use keypair::{DEFAULT_MODULUS_BITS, KeyCache, KeyPair};
