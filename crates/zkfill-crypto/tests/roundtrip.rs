//! Round-trip and interoperability tests for the crypto engine.
//!
//! RSA key generation dominates the runtime of this suite, so a single
//! 2048-bit test pair is generated once and shared across tests.

use std::sync::OnceLock;

use serde_json::json;

use zkfill_crypto::{
    BundleError, CryptoError, EntryCiphertext, KeyCache, KeyPair, decrypt_ciphertext,
    encrypt_payload, export_key_bundle, import_key_bundle,
};

fn test_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| KeyPair::generate(2048).expect("generate test key pair"))
}

fn other_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| KeyPair::generate(2048).expect("generate second test key pair"))
}

// ── envelope ────────────────────────────────────────────────────────────────

#[test]
fn envelope_roundtrip() {
    let pair = test_pair();
    let cache = KeyCache::new();
    let payload = json!({
        "login": "marie",
        "password": "s3cret!",
        "notes": "bank account"
    });

    let envelope = encrypt_payload(&payload, pair).unwrap();
    let decrypted = decrypt_ciphertext(&envelope, pair, &cache).unwrap();

    assert_eq!(decrypted, payload);
}

#[test]
fn envelope_uses_fresh_key_and_iv_per_call() {
    let pair = test_pair();
    let payload = json!({"login": "a", "password": "b"});

    let first = encrypt_payload(&payload, pair).unwrap();
    let second = encrypt_payload(&payload, pair).unwrap();

    assert_ne!(first.key, second.key);
    assert_ne!(first.iv, second.iv);
    assert_ne!(first.data, second.data);
}

#[test]
fn envelope_decrypt_with_wrong_key_fails() {
    let cache = KeyCache::new();
    let payload = json!({"login": "a", "password": "b"});

    let envelope = encrypt_payload(&payload, test_pair()).unwrap();
    let result = decrypt_ciphertext(&envelope, other_pair(), &cache);

    assert!(matches!(
        result,
        Err(CryptoError::UnsealFailed { .. }) | Err(CryptoError::DecryptFailed { .. })
    ));
}

#[test]
fn envelope_detects_tampered_data() {
    let pair = test_pair();
    let cache = KeyCache::new();
    let payload = json!({"login": "a", "password": "b"});

    let mut envelope = encrypt_payload(&payload, pair).unwrap();
    // Re-encode the data field with one flipped bit.
    let mut data = zkfill_crypto::b64::decode(&envelope.data).unwrap();
    data[0] ^= 0x01;
    envelope.data = zkfill_crypto::b64::encode(&data);

    let result = decrypt_ciphertext(&envelope, pair, &cache);
    assert!(matches!(result, Err(CryptoError::DecryptFailed { .. })));
}

#[test]
fn envelope_roundtrips_non_object_payloads() {
    let pair = test_pair();
    let cache = KeyCache::new();
    let envelope = encrypt_payload(&json!("just a string"), pair).unwrap();
    let value = decrypt_ciphertext(&envelope, pair, &cache).unwrap();
    assert_eq!(value, json!("just a string"));
}

#[test]
fn key_cache_memoizes_across_decrypts() {
    let pair = test_pair();
    let cache = KeyCache::new();
    let payload = json!({"login": "a", "password": "b"});

    let envelope = encrypt_payload(&payload, pair).unwrap();
    decrypt_ciphertext(&envelope, pair, &cache).unwrap();
    assert_eq!(cache.len(), 1);

    decrypt_ciphertext(&envelope, pair, &cache).unwrap();
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
}

// ── key bundle ──────────────────────────────────────────────────────────────

#[test]
fn bundle_roundtrip_restores_identical_material() {
    let pair = test_pair();
    let bundle = export_key_bundle(pair, "open sesame").unwrap();

    assert_eq!(bundle.format.as_deref(), Some("zk-keybundle-v1"));
    assert_eq!(bundle.kdf.iterations, Some(200_000));
    assert!(bundle.created_at.is_some());

    let restored = import_key_bundle(&bundle, "open sesame").unwrap();
    assert_eq!(&restored, pair);
}

#[test]
fn bundle_roundtrips_through_json() {
    let pair = test_pair();
    let bundle = export_key_bundle(pair, "open sesame").unwrap();

    let text = serde_json::to_string(&bundle).unwrap();
    let parsed: zkfill_crypto::KeyBundle = serde_json::from_str(&text).unwrap();
    let restored = import_key_bundle(&parsed, "open sesame").unwrap();

    assert_eq!(&restored, pair);
}

#[test]
fn bundle_wrong_passphrase_always_fails_authentication() {
    let pair = test_pair();
    let bundle = export_key_bundle(pair, "right").unwrap();

    let result = import_key_bundle(&bundle, "wrong");
    assert!(matches!(result, Err(BundleError::AuthenticationFailed)));
}

#[test]
fn bundle_accepts_standard_base64_fields() {
    // The vault UI historically emitted standard base64 with padding; the
    // importer must accept both alphabets.
    use base64::Engine;
    let std_b64 = base64::engine::general_purpose::STANDARD;

    let pair = test_pair();
    let mut bundle = export_key_bundle(pair, "open sesame").unwrap();

    bundle.kdf.salt = Some(std_b64.encode(zkfill_crypto::b64::decode(bundle.kdf.salt.as_deref().unwrap()).unwrap()));
    bundle.enc.iv = Some(std_b64.encode(zkfill_crypto::b64::decode(bundle.enc.iv.as_deref().unwrap()).unwrap()));
    bundle.data = std_b64.encode(zkfill_crypto::b64::decode(&bundle.data).unwrap());
    bundle.public_key = std_b64.encode(zkfill_crypto::b64::decode(&bundle.public_key).unwrap());

    let restored = import_key_bundle(&bundle, "open sesame").unwrap();
    assert_eq!(&restored, pair);
}

#[test]
fn bundle_restored_pair_decrypts_existing_envelopes() {
    let pair = test_pair();
    let cache = KeyCache::new();
    let payload = json!({"login": "marie", "password": "s3cret!"});

    let envelope = encrypt_payload(&payload, pair).unwrap();

    let bundle = export_key_bundle(pair, "open sesame").unwrap();
    let restored = import_key_bundle(&bundle, "open sesame").unwrap();

    let decrypted = decrypt_ciphertext(&envelope, &restored, &cache).unwrap();
    assert_eq!(decrypted, payload);
}
