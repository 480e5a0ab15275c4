//! HTTP client for the vault API's token endpoints.
//!
//! Two fixed endpoints: `auth/jwt/create/` exchanges credentials for an
//! access/refresh pair, `auth/jwt/refresh/` trades the refresh token for a
//! new access token. Both speak JSON; failures carry the HTTP status so
//! callers can distinguish rejection (clear state) from transient trouble.

use serde::Deserialize;
use serde_json::json;

use crate::config::build_api_url;
use crate::error::{AuthError, LoginError};
use crate::tokens::TokenState;

/// Path of the credential exchange endpoint, relative to the API base.
const LOGIN_PATH: &str = "auth/jwt/create/";

/// Path of the token refresh endpoint, relative to the API base.
const REFRESH_PATH: &str = "auth/jwt/refresh/";

/// The JSON shape both token endpoints return.
#[derive(Debug, Deserialize)]
struct TokenGrantResponse {
    access: Option<String>,
    refresh: Option<String>,
}

/// Client for the token endpoints of the vault API.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
}

impl AuthClient {
    /// Wrap an HTTP client. `reqwest::Client` is cheap to clone and shares
    /// its connection pool.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// The underlying HTTP client, for callers issuing other API requests.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Exchange credentials for a token pair.
    ///
    /// # Errors
    ///
    /// [`LoginError::CredentialsRequired`] for empty inputs,
    /// [`LoginError::Rejected`] with the HTTP status on non-2xx, and
    /// [`LoginError::InvalidResponse`] when the body lacks either token.
    pub async fn login(
        &self,
        base: &str,
        username: &str,
        password: &str,
    ) -> Result<TokenState, LoginError> {
        if username.is_empty() || password.is_empty() {
            return Err(LoginError::CredentialsRequired);
        }

        let url = build_api_url(base, LOGIN_PATH)?;
        tracing::debug!(url = %url, username, "logging in");

        let response = self
            .http
            .post(url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LoginError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let grant: TokenGrantResponse = response.json().await?;
        let (Some(access), Some(refresh)) = (grant.access, grant.refresh) else {
            return Err(LoginError::InvalidResponse);
        };

        tracing::info!(username, "login succeeded");
        Ok(TokenState::from_grant(access, Some(refresh)))
    }

    /// Trade a refresh token for a fresh access token.
    ///
    /// The refresh token is only replaced when the server returns a new
    /// one; otherwise the old token is retained.
    ///
    /// # Errors
    ///
    /// [`AuthError::RefreshRejected`] with the HTTP status on non-2xx (a
    /// 400/401 obliges the caller to clear token state), and
    /// [`AuthError::InvalidRefreshResponse`] when the body lacks an access
    /// token.
    pub async fn refresh(&self, base: &str, refresh_token: &str) -> Result<TokenState, AuthError> {
        let url = build_api_url(base, REFRESH_PATH)?;
        tracing::debug!(url = %url, "refreshing access token");

        let response = self
            .http
            .post(url)
            .json(&json!({ "refresh": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
            });
        }

        let grant: TokenGrantResponse = response.json().await?;
        let Some(access) = grant.access else {
            return Err(AuthError::InvalidRefreshResponse);
        };

        let refresh = grant.refresh.unwrap_or_else(|| refresh_token.to_string());
        tracing::debug!("access token refreshed");
        Ok(TokenState::from_grant(access, Some(refresh)))
    }
}

impl Default for AuthClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
