//! Session and API error types.
//!
//! The taxonomy mirrors how callers react: [`ConfigError`] means setup is
//! incomplete, [`AuthError`] means the token lifecycle failed (and may
//! require clearing state), [`LoginError`] covers the interactive login
//! exchange, and [`ApiError`] wraps authenticated requests.

/// Setup is missing a required piece of configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No API base URL has been configured.
    #[error("api base not configured")]
    MissingApiBase,
}

/// Token lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A refresh was needed but no refresh token exists.
    #[error("no refresh token available")]
    RefreshMissing,

    /// The server rejected the refresh grant. On 400/401 the caller must
    /// clear token state and invalidate derived caches.
    #[error("token refresh rejected with HTTP {status}")]
    RefreshRejected { status: u16 },

    /// The refresh response did not contain an access token.
    #[error("refresh response missing access token")]
    InvalidRefreshResponse,

    /// The refresh endpoint URL could not be built.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Transport failure talking to the token endpoint.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Interactive login failures.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// Username or password was empty.
    #[error("username and password are required")]
    CredentialsRequired,

    /// No API base was supplied and none is configured.
    #[error("api base url is required")]
    BaseRequired,

    /// The server rejected the credentials.
    #[error("login rejected with HTTP {status}: {detail}")]
    Rejected { status: u16, detail: String },

    /// The login response did not contain both tokens.
    #[error("login response missing tokens")]
    InvalidResponse,

    /// The login endpoint URL could not be built.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Transport failure talking to the login endpoint.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Authenticated API request failures.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status after the single
    /// forced-refresh retry.
    #[error("api error: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request URL could not be built.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Transport failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Obtaining a usable access token failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Configuration was incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
