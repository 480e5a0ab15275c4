//! User-supplied configuration and API URL building.

use serde::{Deserialize, Serialize};
use url::Url;

/// Persisted user configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Normalized base URL of the vault API (always with a trailing slash).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// The account username, kept for display and prefill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Config {
    /// Whether an API base is configured.
    pub fn has_api_base(&self) -> bool {
        self.api_base.as_deref().is_some_and(|base| !base.is_empty())
    }
}

/// Normalize a user-typed base URL: trim, default the scheme to `https`,
/// guarantee a trailing slash. Empty input yields `None`.
pub fn normalize_base_url(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lowered = trimmed.to_lowercase();
    let mut value = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    if !value.ends_with('/') {
        value.push('/');
    }
    Some(value)
}

/// Join an API path onto a normalized base URL, trimming leading slashes
/// from the path so it can never escape the base.
pub fn build_api_url(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let base_url = Url::parse(base)?;
    base_url.join(path.trim_start_matches('/'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
