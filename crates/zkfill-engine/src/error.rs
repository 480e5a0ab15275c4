//! Engine error aggregation and wire tags.
//!
//! Every failure in the engine reduces to one [`EngineError`], and every
//! [`EngineError`] reduces to a stable snake_case tag surfaced in the
//! `{ok:false, error}` wire response. Nothing is ever thrown across the
//! message boundary.

use zkfill_auth::{ApiError, AuthError, ConfigError, LoginError};
use zkfill_bridge::NativeError;
use zkfill_crypto::{BundleError, CryptoError};

use crate::store::StoreError;

/// Unified error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No API base is configured.
    #[error("api base not configured")]
    ConfigMissing,

    /// An operation requiring an API base received none.
    #[error("api base url is required")]
    BaseRequired,

    /// The active key pair is missing.
    #[error("no key pair imported")]
    KeyPairMissing,

    /// A bundle import was requested without a bundle or passphrase.
    #[error("bundle or passphrase missing")]
    BundleOrPassphraseMissing,

    /// The entries endpoint did not return a JSON array.
    #[error("entries endpoint returned a non-array response")]
    InvalidEntriesResponse,

    /// The state store failed.
    #[error("state store failure: {0}")]
    Store(#[from] StoreError),

    /// Internal serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Native(#[from] NativeError),
}

impl EngineError {
    /// The tag this failure carries at the message boundary.
    pub fn wire_tag(&self) -> String {
        match self {
            Self::ConfigMissing | Self::Config(ConfigError::MissingApiBase) => {
                "config_missing".to_string()
            }
            Self::BaseRequired => "base_required".to_string(),
            Self::KeyPairMissing => "keypair_missing".to_string(),
            Self::BundleOrPassphraseMissing => "bundle_or_passphrase_missing".to_string(),
            Self::InvalidEntriesResponse => "passwords_invalid_response".to_string(),
            Self::Store(_) => "storage_error".to_string(),
            Self::Serialization(_) => "internal_error".to_string(),
            Self::Auth(err) => auth_tag(err),
            Self::Login(err) => login_tag(err),
            Self::Api(err) => api_tag(err),
            Self::Crypto(_) => "crypto_error".to_string(),
            Self::Bundle(err) => bundle_tag(err),
            Self::Native(err) => err.wire_tag(),
        }
    }
}

fn auth_tag(err: &AuthError) -> String {
    match err {
        AuthError::RefreshMissing => "refresh_missing".to_string(),
        AuthError::RefreshRejected { status } => format!("refresh_failed:{status}"),
        AuthError::InvalidRefreshResponse => "refresh_invalid_response".to_string(),
        AuthError::Url(_) => "invalid_url".to_string(),
        AuthError::Network(_) => "network_error".to_string(),
    }
}

fn login_tag(err: &LoginError) -> String {
    match err {
        LoginError::CredentialsRequired => "credentials_required".to_string(),
        LoginError::BaseRequired => "base_required".to_string(),
        LoginError::Rejected { status, detail } => format!("login_failed:{status}:{detail}"),
        LoginError::InvalidResponse => "login_invalid_response".to_string(),
        LoginError::Url(_) => "invalid_url".to_string(),
        LoginError::Network(_) => "network_error".to_string(),
    }
}

fn api_tag(err: &ApiError) -> String {
    match err {
        ApiError::Status { status, body } => format!("api_error:{status}:{body}"),
        ApiError::Url(_) => "invalid_url".to_string(),
        ApiError::Network(_) => "network_error".to_string(),
        ApiError::Auth(inner) => auth_tag(inner),
        ApiError::Config(ConfigError::MissingApiBase) => "config_missing".to_string(),
    }
}

fn bundle_tag(err: &BundleError) -> String {
    match err {
        BundleError::UnsupportedFormat { format } => {
            format!("bundle_unsupported_format:{format}")
        }
        BundleError::Malformed { .. } => "bundle_invalid".to_string(),
        BundleError::AuthenticationFailed => "bundle_auth_failed".to_string(),
        BundleError::InvalidKey { .. } => "bundle_invalid_key".to_string(),
        BundleError::EncodeFailed { .. } => "bundle_encode_failed".to_string(),
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, EngineError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
