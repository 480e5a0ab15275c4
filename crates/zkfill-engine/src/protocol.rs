//! Wire protocol of the engine.
//!
//! Requests are flat JSON objects tagged by `op`; responses always carry an
//! `ok` discriminant, with `{ok:false, error}` as the only failure shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use zkfill_auth::Config;
use zkfill_bridge::NativeCredentials;
use zkfill_match::ScoredLogin;

/// An inbound operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
    /// Resolve the best credential for a web origin.
    GetCredentials {
        #[serde(default)]
        origin: Option<String>,
        #[serde(default)]
        url: Option<String>,
        /// URL of the requesting page, used as an origin fallback and a
        /// scoring signal.
        #[serde(default, rename = "senderUrl")]
        sender_url: Option<String>,
    },

    /// Status snapshot: config presence, token expiry, key presence,
    /// cache size/age.
    GetState,

    /// Exchange credentials for a session.
    Login {
        #[serde(default, rename = "baseUrl")]
        base_url: Option<String>,
        #[serde(default)]
        username: String,
        #[serde(default)]
        password: String,
    },

    /// Clear the session.
    Logout,

    /// Persist configuration changes.
    SaveConfig {
        #[serde(default, rename = "apiBase")]
        api_base: Option<String>,
        #[serde(default)]
        username: Option<String>,
    },

    /// Import a passphrase-protected key bundle.
    ImportKeyBundle {
        #[serde(default)]
        bundle: Option<Value>,
        #[serde(default)]
        passphrase: Option<String>,
    },

    /// Drop the active key pair.
    ForgetKeyPair,

    /// Force a vault refetch.
    RefreshVault,
}

/// Status snapshot returned by `getState`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub ok: bool,
    pub config: Config,
    pub has_config: bool,
    pub has_tokens: bool,
    pub has_refresh: bool,
    pub token_expires_at: Option<i64>,
    pub has_key_pair: bool,
    pub cached_entries: usize,
    pub cache_age_ms: Option<i64>,
}

/// An outbound result. Serializes untagged: every variant carries `ok`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// Best match from the vault path, plus the full ranked list.
    Credentials {
        ok: bool,
        username: String,
        password: String,
        remember: bool,
        autosubmit: bool,
        logins: Vec<ScoredLogin>,
    },

    /// Credentials resolved through the native bridge.
    Native {
        ok: bool,
        #[serde(flatten)]
        credentials: NativeCredentials,
    },

    /// A completed lookup with zero matches — explicitly not an error.
    Logins { ok: bool, logins: Vec<ScoredLogin> },

    /// Status snapshot.
    State(Box<StateSnapshot>),

    /// Successful login, echoing the derived expiry.
    LoginOk {
        ok: bool,
        #[serde(rename = "expiresAt", skip_serializing_if = "Option::is_none")]
        expires_at: Option<i64>,
    },

    /// Plain acknowledgement.
    Ack { ok: bool },

    /// Tagged failure. The only error shape on the wire.
    Error { ok: bool, error: String },
}

impl Response {
    /// A plain `{ok:true}` acknowledgement.
    pub fn ack() -> Self {
        Self::Ack { ok: true }
    }

    /// A `{ok:false, error}` failure.
    pub fn error(tag: impl Into<String>) -> Self {
        Self::Error {
            ok: false,
            error: tag.into(),
        }
    }

    /// An empty-but-successful logins list.
    pub fn empty_logins() -> Self {
        Self::Logins {
            ok: true,
            logins: Vec::new(),
        }
    }

    /// Whether this response reports success.
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_parse_from_flat_tagged_objects() {
        let request: Request = serde_json::from_value(json!({
            "op": "getCredentials",
            "origin": "https://acme.test",
            "url": "https://acme.test/login"
        }))
        .unwrap();
        assert!(matches!(
            request,
            Request::GetCredentials { origin: Some(_), url: Some(_), sender_url: None }
        ));

        let request: Request = serde_json::from_value(json!({"op": "getState"})).unwrap();
        assert!(matches!(request, Request::GetState));

        let request: Request = serde_json::from_value(json!({
            "op": "login",
            "baseUrl": "https://vault.test",
            "username": "marie",
            "password": "pw"
        }))
        .unwrap();
        assert!(matches!(request, Request::Login { .. }));

        let request: Request = serde_json::from_value(json!({"op": "refreshVault"})).unwrap();
        assert!(matches!(request, Request::RefreshVault));
    }

    #[test]
    fn get_credentials_payload_fields_are_optional() {
        let request: Request =
            serde_json::from_value(json!({"op": "getCredentials"})).unwrap();
        assert!(matches!(
            request,
            Request::GetCredentials { origin: None, url: None, sender_url: None }
        ));
    }

    #[test]
    fn unknown_op_fails_to_parse() {
        let result: Result<Request, _> =
            serde_json::from_value(json!({"op": "dropVault"}));
        assert!(result.is_err());
    }

    #[test]
    fn error_response_wire_shape() {
        let value = serde_json::to_value(Response::error("config_missing")).unwrap();
        assert_eq!(value, json!({"ok": false, "error": "config_missing"}));
    }

    #[test]
    fn ack_and_empty_logins_wire_shapes() {
        assert_eq!(
            serde_json::to_value(Response::ack()).unwrap(),
            json!({"ok": true})
        );
        assert_eq!(
            serde_json::to_value(Response::empty_logins()).unwrap(),
            json!({"ok": true, "logins": []})
        );
    }

    #[test]
    fn native_response_flattens_credentials() {
        let response = Response::Native {
            ok: true,
            credentials: NativeCredentials {
                username: "marie".to_string(),
                password: "pw".to_string(),
                remember: true,
                autosubmit: false,
                logins: Vec::new(),
            },
        };
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["username"], "marie");
        assert_eq!(value["remember"], true);
        assert!(value["logins"].is_array());
    }

    #[test]
    fn login_ok_omits_unknown_expiry() {
        let value = serde_json::to_value(Response::LoginOk {
            ok: true,
            expires_at: None,
        })
        .unwrap();
        assert_eq!(value, json!({"ok": true}));
    }
}
