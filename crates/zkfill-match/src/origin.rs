//! Canonical origins, hostnames and registrable domains.
//!
//! Inputs arrive as full URLs, bare hosts, or junk typed by users. Every
//! function here is total: invalid input yields `None`, never an error.

use std::collections::HashSet;
use std::sync::LazyLock;

use url::Url;

/// Known multi-label public suffixes.
///
/// A small static allow-list covering the common cases (`co.uk`,
/// `com.au`, …). This is a documented heuristic — not a complete
/// public-suffix-list implementation — so unknown multi-label suffixes fall
/// back to the last two labels.
static MULTI_LABEL_SUFFIXES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "co.uk", "org.uk", "gov.uk", "ac.uk",
        "co.jp", "ne.jp", "or.jp", "go.jp",
        "com.au", "net.au", "org.au", "edu.au",
        "com.br", "com.ar", "com.mx", "com.cn",
        "com.hk", "com.sg", "com.tr", "com.sa",
        "com.pl", "com.ru", "com.za", "co.za",
    ]
    .into_iter()
    .collect()
});

/// Parse a URL or bare host into its canonical lowercase origin
/// (`scheme://host[:port]`).
///
/// Inputs without a scheme are assumed to be `https`. Returns `None` for
/// anything that does not parse to a URL with a host.
pub fn normalize_origin(value: &str) -> Option<String> {
    let url = parse_lenient(value)?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    Some(origin.ascii_serialization().to_lowercase())
}

/// Extract the canonical lowercase hostname from a URL or bare host.
pub fn hostname_from_url(value: &str) -> Option<String> {
    let url = parse_lenient(value)?;
    let host = url.host_str()?.to_lowercase();
    if host.is_empty() { None } else { Some(host) }
}

/// Reduce a hostname to its registrable domain — the heuristic "same site"
/// boundary of public-suffix-like label + 1.
///
/// `shop.app.example.co.uk` → `example.co.uk`; `example.com` →
/// `example.com`; a single label is returned as-is.
pub fn registrable_domain(hostname: &str) -> Option<String> {
    if hostname.is_empty() {
        return None;
    }
    let pure = hostname.split(':').next().unwrap_or_default();
    if pure.is_empty() {
        return None;
    }

    let labels: Vec<&str> = pure.split('.').collect();
    if labels.len() < 2 {
        return Some(pure.to_string());
    }

    let last_two = format!("{}.{}", labels[labels.len() - 2], labels[labels.len() - 1]);
    if MULTI_LABEL_SUFFIXES.contains(last_two.as_str()) && labels.len() >= 3 {
        return Some(format!("{}.{}", labels[labels.len() - 3], last_two));
    }
    Some(last_two)
}

fn parse_lenient(value: &str) -> Option<Url> {
    let candidate = value.trim();
    if candidate.is_empty() {
        return None;
    }
    let with_scheme;
    let candidate = if candidate.contains("://") {
        candidate
    } else {
        with_scheme = format!("https://{candidate}");
        &with_scheme
    };
    Url::parse(candidate).ok().filter(|url| url.has_host())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
