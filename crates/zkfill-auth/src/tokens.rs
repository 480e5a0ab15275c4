//! Access/refresh token state.

use serde::{Deserialize, Serialize};

use crate::jwt;

/// Tokens are treated as expired this long before their actual expiry, so
/// a token is never used mid-flight into its expiration.
pub const EXPIRY_MARGIN_MS: i64 = 30_000;

/// The persisted token state of the session.
///
/// Created on login, replaced on refresh, cleared on logout or refresh
/// failure. `expires_at` is derived from the unverified `exp` claim of the
/// access token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,

    /// Epoch milliseconds; `None` when the access token carries no `exp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl TokenState {
    /// Build token state from a grant, deriving the expiry from the access
    /// token.
    pub fn from_grant(access: String, refresh: Option<String>) -> Self {
        let expires_at = jwt::expires_at_ms(&access);
        Self {
            access: Some(access),
            refresh,
            expires_at,
        }
    }

    /// Whether the access token is present and not within
    /// [`EXPIRY_MARGIN_MS`] of expiry. A token with no known expiry counts
    /// as valid.
    pub fn is_access_valid(&self, now_ms: i64) -> bool {
        match (&self.access, self.expires_at) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(_), Some(expires_at)) => now_ms < expires_at - EXPIRY_MARGIN_MS,
        }
    }

    /// Whether any token material is present at all.
    pub fn has_any(&self) -> bool {
        self.access.is_some() || self.refresh.is_some()
    }

    /// Fill in a missing `expires_at` from the stored access token, for
    /// state hydrated from older persisted shapes.
    pub fn recompute_expiry(&mut self) {
        if self.expires_at.is_none() {
            if let Some(access) = &self.access {
                self.expires_at = jwt::expires_at_ms(access);
            }
        }
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
