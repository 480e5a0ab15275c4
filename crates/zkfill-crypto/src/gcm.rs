//! AES-256-GCM primitives using the `ring` crate.
//!
//! Both the entry envelope and the key-bundle wrapping use AES-256-GCM with
//! a caller-supplied 96-bit nonce. `ring` appends/verifies the 128-bit
//! authentication tag, so any tampering or wrong-key decryption fails
//! loudly instead of yielding garbage plaintext.

use ring::aead::{self, Aad, BoundKey, NONCE_LEN, Nonce, NonceSequence, SealingKey, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{CryptoError, Result};

/// Length of the AES-256-GCM key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the AES-256-GCM nonce in bytes (96 bits).
pub const NONCE_LEN_BYTES: usize = NONCE_LEN;

/// AES-256-GCM algorithm from `ring`.
static AEAD_ALG: &aead::Algorithm = &aead::AES_256_GCM;

/// A single-use nonce sequence that yields exactly one nonce and then
/// errors.
///
/// `ring` requires a [`NonceSequence`] for bound keys. Every seal/open call
/// here uses a fresh key binding with exactly one nonce, so this wrapper
/// enforces single use.
struct SingleNonce(Option<[u8; NONCE_LEN_BYTES]>);

impl SingleNonce {
    fn new(bytes: [u8; NONCE_LEN_BYTES]) -> Self {
        Self(Some(bytes))
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.0
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

/// Encrypt `plaintext` with the given 256-bit key and 96-bit nonce.
///
/// The returned ciphertext includes the appended authentication tag.
pub fn seal(
    key: &[u8],
    nonce: [u8; NONCE_LEN_BYTES],
    plaintext: &[u8],
) -> std::result::Result<Vec<u8>, ring::error::Unspecified> {
    let unbound = UnboundKey::new(AEAD_ALG, key)?;
    let mut sealing_key = SealingKey::new(unbound, SingleNonce::new(nonce));

    let mut in_out = plaintext.to_vec();
    sealing_key.seal_in_place_append_tag(Aad::empty(), &mut in_out)?;
    Ok(in_out)
}

/// Decrypt `ciphertext` (which includes the GCM tag) with the given key and
/// nonce.
pub fn open(
    key: &[u8],
    nonce: [u8; NONCE_LEN_BYTES],
    ciphertext: &[u8],
) -> std::result::Result<Vec<u8>, ring::error::Unspecified> {
    let unbound = UnboundKey::new(AEAD_ALG, key)?;
    let mut opening_key = aead::OpeningKey::new(unbound, SingleNonce::new(nonce));

    let mut in_out = ciphertext.to_vec();
    let plaintext = opening_key.open_in_place(Aad::empty(), &mut in_out)?;
    Ok(plaintext.to_vec())
}

/// Generate `len` cryptographically secure random bytes.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let mut buf = vec![0u8; len];
    rng.fill(&mut buf).map_err(|_| CryptoError::RandomFailed)?;
    Ok(buf)
}

/// Generate a random 96-bit nonce.
pub fn random_nonce() -> Result<[u8; NONCE_LEN_BYTES]> {
    let rng = SystemRandom::new();
    let mut nonce = [0u8; NONCE_LEN_BYTES];
    rng.fill(&mut nonce).map_err(|_| CryptoError::RandomFailed)?;
    Ok(nonce)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
