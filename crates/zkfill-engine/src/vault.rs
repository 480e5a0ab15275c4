//! Remote entry model and secret-field normalization.
//!
//! The entries endpoint returns sealed envelopes plus plaintext metadata.
//! After decryption, the secret object is normalized into a [`VaultLogin`]:
//! usernames and passwords are accepted under several historical field
//! names, and entries whose secret lacks either are dropped rather than
//! surfaced half-usable.

use serde::Deserialize;
use serde_json::Value;

use zkfill_crypto::EntryCiphertext;
use zkfill_match::{VaultLogin, normalize_origin};

/// Field names accepted as the username of a secret.
pub const USERNAME_FIELDS: &[&str] = &["login", "username", "user", "identifiant", "email"];

/// Field names accepted as the password of a secret.
pub const PASSWORD_FIELDS: &[&str] = &["password", "pass", "mdp", "secret"];

/// One encrypted entry as stored remotely.
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptedEntry {
    pub id: i64,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub category: Option<Value>,

    pub ciphertext: EntryCiphertext,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Combine an entry's metadata with its decrypted secret.
///
/// Returns `None` when the secret is not an object or lacks a usable
/// username/password pair — such entries are omitted from the vault, never
/// propagated as errors.
pub fn normalize_login_entry(entry: &EncryptedEntry, secret: &Value) -> Option<VaultLogin> {
    let raw = secret.as_object()?;

    let username = first_text_field(raw, USERNAME_FIELDS)?;
    let password = first_text_field(raw, PASSWORD_FIELDS)?;

    let origin = normalize_origin(&entry.url);
    let notes = raw
        .get("notes")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(VaultLogin {
        id: entry.id,
        title: entry.title.clone(),
        url: entry.url.clone(),
        origin,
        username,
        password,
        notes,
        raw: raw.clone(),
    })
}

/// The first non-empty string among the given fields.
fn first_text_field(raw: &serde_json::Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| raw.get(*field))
        .filter_map(Value::as_str)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
