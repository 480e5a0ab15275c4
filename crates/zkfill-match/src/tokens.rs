//! Distinctive-token extraction from hostnames.
//!
//! A hostname like `secure-login.mabanque.example.com` carries exactly one
//! signal worth matching on (`mabanque`); the rest is infrastructure noise.
//! The extraction pipeline splits the host into alphanumeric segments,
//! drops short and purely numeric ones, strips a fixed vocabulary of
//! generic prefixes/suffixes from the joined form, and discards anything in
//! the generic stop-word set.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::origin::hostname_from_url;

/// Tokens that carry no matching signal on their own.
static GENERIC_TOKEN_PARTS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "www", "web", "login", "logins", "signin", "sign", "auth", "secure", "sso",
        "account", "accounts", "client", "clients", "customer", "customers",
        "portal", "portail", "portals", "portails", "service", "services",
        "app", "apps", "prod", "stage", "staging", "test", "uat", "beta",
        "mobile", "online", "secure2", "connect", "connexion", "identity",
        "default", "home", "my", "mon", "the", "id", "ids",
        "fr", "en", "ca", "us", "qc", "uk", "br", "mx", "cn",
        "com", "net", "org", "gov", "edu", "info", "biz", "io",
        "bank", "banks", "banque", "banques", "compte", "comptes",
        "group", "groupe", "cloud", "api", "apis", "static", "cdn",
        // Placeholder hosts from documentation and test fixtures.
        "example", "examples", "demo", "sample", "localhost",
    ]
    .into_iter()
    .collect()
});

/// Generic prefixes stripped from the joined segment form. Order matters:
/// stripping proceeds in declaration order, repeatedly, while at least
/// three characters remain.
const GENERIC_TOKEN_PREFIXES: &[&str] = &[
    "secure", "login", "signin", "auth", "sso", "www", "portal", "portail",
    "service", "services", "client", "customer", "app", "apps", "prod", "stage",
    "staging", "test", "uat", "beta", "dev", "mobile", "my", "mon", "the",
    "api", "cdn",
];

/// Generic suffixes stripped from the joined segment form.
const GENERIC_TOKEN_SUFFIXES: &[&str] = &[
    "secure", "login", "signin", "auth", "sso", "portal", "portail", "service",
    "services", "client", "clients", "customer", "customers", "app", "apps",
    "prod", "stage", "staging", "test", "uat", "beta", "dev", "mobile",
    "online", "connect", "connexion", "account", "accounts", "compte", "comptes",
    "bank", "banks", "banque", "banques", "group", "groupe",
];

static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[a-z0-9]+").expect("segment regex is valid"));

/// Minimum length for a token (and for what remains after stripping).
const MIN_TOKEN_LEN: usize = 3;

/// Extract the distinctive tokens of an origin's hostname, deduplicated and
/// sorted. Invalid origins yield an empty list.
pub fn origin_tokens(origin: &str) -> Vec<String> {
    let Some(host) = hostname_from_url(origin) else {
        return Vec::new();
    };

    let mut collected = BTreeSet::new();
    for part in host.split(['.', '-', '_', '/']) {
        collected.extend(expand_token(part));
    }
    collected.into_iter().collect()
}

/// Expand one raw hostname part into candidate tokens: its alphanumeric
/// segments plus the generic-stripped concatenation of all segments.
fn expand_token(raw: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let cleaned = raw.trim().to_lowercase();
    if cleaned.is_empty() {
        return out;
    }

    let segments: Vec<&str> = SEGMENT_RE.find_iter(&cleaned).map(|m| m.as_str()).collect();
    for segment in &segments {
        if segment.len() >= MIN_TOKEN_LEN && !is_purely_numeric(segment) {
            out.insert((*segment).to_string());
        }
    }

    let joined: String = segments.concat();
    let stripped = strip_generic(&joined);
    if stripped.len() >= MIN_TOKEN_LEN && !is_purely_numeric(&stripped) {
        out.insert(stripped);
    }

    out.retain(|token| {
        token.len() >= MIN_TOKEN_LEN
            && !is_purely_numeric(token)
            && !GENERIC_TOKEN_PARTS.contains(token.as_str())
    });
    out
}

/// Iteratively strip generic prefixes and suffixes, keeping at least
/// [`MIN_TOKEN_LEN`] characters.
fn strip_generic(value: &str) -> String {
    let mut result = value.to_string();
    let mut changed = true;
    while changed && !result.is_empty() {
        changed = false;
        for prefix in GENERIC_TOKEN_PREFIXES {
            if result.starts_with(prefix) && result.len() - prefix.len() >= MIN_TOKEN_LEN {
                result = result[prefix.len()..].to_string();
                changed = true;
            }
        }
        for suffix in GENERIC_TOKEN_SUFFIXES {
            if result.ends_with(suffix) && result.len() - suffix.len() >= MIN_TOKEN_LEN {
                result.truncate(result.len() - suffix.len());
                changed = true;
            }
        }
    }
    result
}

fn is_purely_numeric(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_the_distinctive_token_drops_the_noise() {
        let tokens = origin_tokens("https://secure-login.mabanque.example.com");
        assert!(tokens.contains(&"mabanque".to_string()));
        assert!(!tokens.contains(&"secure".to_string()));
        assert!(!tokens.contains(&"login".to_string()));
        assert!(!tokens.contains(&"example".to_string()));
        assert!(!tokens.contains(&"com".to_string()));
    }

    #[test]
    fn strips_generic_prefix_from_joined_form() {
        // "securebanking" survives as a segment but also yields "banking"
        // once the generic "secure" prefix is stripped.
        let tokens = origin_tokens("https://securebanking.test");
        assert!(tokens.contains(&"banking".to_string()));
        assert!(tokens.contains(&"securebanking".to_string()));
    }

    #[test]
    fn drops_short_and_numeric_segments() {
        let tokens = origin_tokens("https://v2.10.ab.acme.net");
        assert_eq!(tokens, vec!["acme".to_string()]);
    }

    #[test]
    fn invalid_origin_yields_no_tokens() {
        assert!(origin_tokens("").is_empty());
        assert!(origin_tokens(":::").is_empty());
    }

    #[test]
    fn tokens_are_sorted_and_deduplicated() {
        let tokens = origin_tokens("https://zebra.alpha.zebra.test");
        assert_eq!(tokens, vec!["alpha".to_string(), "zebra".to_string()]);
    }

    #[test]
    fn stripping_is_iterative_but_keeps_a_minimum_stem() {
        // "my" strips off ("app" remains, exactly three chars), then "app"
        // refuses both strips because nothing usable would remain.
        assert_eq!(strip_generic("myapp"), "app");
        // "apple" refuses the "app" prefix strip: only two chars would
        // remain.
        assert_eq!(strip_generic("apple"), "apple");
    }

    #[test]
    fn purely_numeric_detection() {
        assert!(is_purely_numeric("12345"));
        assert!(!is_purely_numeric("12a45"));
        assert!(!is_purely_numeric(""));
    }
}
