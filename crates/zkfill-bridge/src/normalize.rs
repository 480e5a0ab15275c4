//! Normalization of heterogeneous native-host responses.
//!
//! The external host's wire format is fixed by a third party and has grown
//! several shapes over time: `{ok:true, …}`, `{status:"ok", …}`, and bare
//! `{username, password}` objects. A prioritized chain of decoders reduces
//! all of them to one canonical [`NativeCredentials`] or a tagged error.
//! Only structural validation happens here; no trust is extended beyond
//! that.

use serde::Serialize;
use serde_json::Value;

use crate::error::{NativeError, Result};

/// One credential as reported by the native host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeLogin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub origin: String,
    pub score: i64,
}

/// The canonical result of a successful native lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeCredentials {
    pub username: String,
    pub password: String,
    pub remember: bool,
    pub autosubmit: bool,
    pub logins: Vec<NativeLogin>,
}

/// Run the decoder chain over a raw native response.
///
/// Decoders are tried in priority order: explicit `ok:true`, then
/// `status:"ok"` (case-insensitive), then a bare username/password pair.
/// Anything else is rejected with the host's own error reason when one is
/// present (`error`, `reason` or `status`), or `native_invalid_response`.
pub fn normalize_response(response: &Value) -> Result<NativeCredentials> {
    if response.is_null() {
        return Err(NativeError::NoResponse);
    }

    if !is_accepted_shape(response) {
        let reason = response
            .get("error")
            .or_else(|| response.get("reason"))
            .or_else(|| response.get("status"))
            .map(value_to_reason)
            .unwrap_or_else(|| "native_invalid_response".to_string());
        return Err(NativeError::Rejected { reason });
    }

    let logins = collect_logins(response);

    let best = match logins.first() {
        Some(login) => login.clone(),
        None => top_level_login(response).ok_or(NativeError::NoCredentials)?,
    };

    let remember = flag_for(response, "remember");
    let autosubmit = flag_for(response, "autosubmit");

    let payload_logins = if logins.is_empty() {
        vec![best.clone()]
    } else {
        logins
    };

    tracing::debug!(
        logins = payload_logins.len(),
        "normalized native host response"
    );

    Ok(NativeCredentials {
        username: best.username,
        password: best.password,
        remember,
        autosubmit,
        logins: payload_logins,
    })
}

/// Interpret a boolean-ish wire value: booleans, non-zero numbers, and the
/// strings `1`/`true`/`yes`/`on` (any case) are truthy.
pub fn coerce_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
        }
        _ => false,
    }
}

// -- Decoder chain ----------------------------------------------------------

fn is_accepted_shape(response: &Value) -> bool {
    // 1. Explicit success flag.
    if response.get("ok").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    // 2. Status string "ok", any case.
    if response
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| s.eq_ignore_ascii_case("ok"))
    {
        return true;
    }
    // 3. Bare credential pair.
    response.get("username").and_then(Value::as_str).is_some()
        && response.get("password").and_then(Value::as_str).is_some()
}

/// Entries in the `logins` array with a usable string username/password.
fn collect_logins(response: &Value) -> Vec<NativeLogin> {
    let Some(raw_logins) = response.get("logins").and_then(Value::as_array) else {
        return Vec::new();
    };

    raw_logins
        .iter()
        .filter_map(|entry| {
            let username = entry.get("username").and_then(Value::as_str)?;
            let password = entry.get("password").and_then(Value::as_str)?;
            Some(NativeLogin {
                id: entry.get("id").cloned(),
                title: str_field(entry, "title"),
                username: username.to_string(),
                password: password.to_string(),
                url: str_field(entry, "url"),
                origin: str_field(entry, "origin"),
                score: entry.get("score").and_then(Value::as_i64).unwrap_or(0),
            })
        })
        .collect()
}

/// A credential assembled from top-level `username`/`password` fields.
fn top_level_login(response: &Value) -> Option<NativeLogin> {
    let username = response.get("username").and_then(Value::as_str)?;
    let password = response.get("password").and_then(Value::as_str)?;
    Some(NativeLogin {
        id: response.get("id").cloned(),
        title: str_field(response, "title"),
        username: username.to_string(),
        password: password.to_string(),
        url: str_field(response, "url"),
        origin: str_field(response, "origin"),
        score: response.get("score").and_then(Value::as_i64).unwrap_or(0),
    })
}

/// A flag from the top-level response, falling back to the first raw login
/// entry.
fn flag_for(response: &Value, field: &str) -> bool {
    if let Some(value) = response.get(field) {
        return coerce_flag(value);
    }
    response
        .get("logins")
        .and_then(Value::as_array)
        .and_then(|entries| entries.first())
        .and_then(|entry| entry.get(field))
        .is_some_and(coerce_flag)
}

fn str_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn value_to_reason(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
