//! Credential scoring and ranking.
//!
//! Each candidate accumulates points from independent signals (origin,
//! host, registrable domain, distinctive tokens, auxiliary fields) and the
//! results are sorted descending. When the query carries an origin, a
//! priority cascade then narrows the set to the strongest relationship
//! class before the ranking is returned: an exact-origin entry must always
//! beat a merely token-similar one, whatever their raw scores.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::origin::{hostname_from_url, registrable_domain};
use crate::tokens::origin_tokens;

/// Score contributions per signal.
const SCORE_SAME_ORIGIN: i64 = 50;
const SCORE_ORIGIN_CONTAINMENT: i64 = 15;
const SCORE_SAME_HOST: i64 = 40;
const SCORE_HOST_OVERLAP: i64 = 20;
const SCORE_SAME_DOMAIN: i64 = 35;
const SCORE_TOKEN_HIT: i64 = 8;
const SCORE_AUX_ORIGIN_HIT: i64 = 2;
const SCORE_PLACEHOLDER_USERNAME: i64 = -5;

/// Usernames that are placeholders rather than real accounts.
const PLACEHOLDER_USERNAMES: &[&str] = &["user", "username", "utilisateur", "default", "admin"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A decrypted vault entry, memory-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultLogin {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Canonical origin derived from the entry's URL, when one parses.
    #[serde(default)]
    pub origin: Option<String>,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub notes: String,
    /// The full decrypted secret object; auxiliary fields participate in
    /// token and origin-substring matching.
    #[serde(default)]
    pub raw: serde_json::Map<String, Value>,
}

/// The query context a ranking runs against.
#[derive(Debug, Clone, Default)]
pub struct MatchContext {
    /// Canonical origin of the requesting page, if one was resolved.
    pub origin: Option<String>,
    pub origin_host: Option<String>,
    pub origin_domain: Option<String>,
    pub origin_tokens: Vec<String>,
    /// The full URL the request came from, if known.
    pub sender_url: Option<String>,
}

impl MatchContext {
    /// Derive host, registrable domain and tokens from an already
    /// canonicalized origin.
    pub fn for_origin(origin: Option<String>, sender_url: Option<String>) -> Self {
        let origin_host = origin.as_deref().and_then(hostname_from_url);
        let origin_domain = origin_host.as_deref().and_then(registrable_domain);
        let origin_tokens = origin
            .as_deref()
            .map(origin_tokens)
            .unwrap_or_default();
        Self {
            origin,
            origin_host,
            origin_domain,
            origin_tokens,
            sender_url,
        }
    }
}

/// Relationship classes an entry can hold with the query origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchFlags {
    pub same_origin: bool,
    pub same_host: bool,
    pub host_overlap: bool,
    pub same_domain: bool,
    pub token_match: bool,
}

/// A ranked credential. `flags` drive the priority cascade and are not part
/// of the wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredLogin {
    pub id: i64,
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: String,
    pub origin: Option<String>,
    pub notes: String,
    pub score: i64,
    #[serde(skip)]
    pub flags: MatchFlags,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score and rank `entries` against `context`.
///
/// Returns the entries sorted descending by score (stable on ties). When
/// the context carries an origin, the result is narrowed to the first
/// non-empty priority bucket: same-origin, then same-host, same-domain,
/// token-match, host-overlap; entries outside every bucket only surface
/// when no bucket matched at all.
pub fn score_entries(entries: &[VaultLogin], context: &MatchContext) -> Vec<ScoredLogin> {
    let mut results: Vec<ScoredLogin> = entries
        .iter()
        .map(|entry| score_entry(entry, context))
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score));

    tracing::trace!(
        candidates = results.len(),
        origin = context.origin.as_deref().unwrap_or(""),
        "scored vault entries"
    );

    if context.origin.is_none() {
        return results;
    }

    let buckets: [fn(&MatchFlags) -> bool; 5] = [
        |f| f.same_origin,
        |f| f.same_host,
        |f| f.same_domain,
        |f| f.token_match,
        |f| f.host_overlap,
    ];
    for bucket in buckets {
        let subset: Vec<ScoredLogin> = results
            .iter()
            .filter(|entry| bucket(&entry.flags))
            .cloned()
            .collect();
        if !subset.is_empty() {
            return subset;
        }
    }
    results
}

fn score_entry(entry: &VaultLogin, context: &MatchContext) -> ScoredLogin {
    let entry_location = entry
        .origin
        .as_deref()
        .filter(|origin| !origin.is_empty())
        .unwrap_or(entry.url.as_str());
    let entry_host = hostname_from_url(entry_location);
    let entry_domain = entry_host.as_deref().and_then(registrable_domain);

    let mut score = 0i64;
    let mut flags = MatchFlags::default();

    if let Some(origin) = context.origin.as_deref() {
        let query_origin = origin.to_lowercase();

        if let Some(entry_origin) = entry.origin.as_deref() {
            let entry_origin = entry_origin.to_lowercase();
            if entry_origin == query_origin {
                score += SCORE_SAME_ORIGIN;
                flags.same_origin = true;
            } else if entry_origin.contains(&query_origin) || query_origin.contains(&entry_origin)
            {
                score += SCORE_ORIGIN_CONTAINMENT;
            }
        }

        if let (Some(query_host), Some(host)) = (context.origin_host.as_deref(), entry_host.as_deref())
        {
            if query_host == host {
                score += SCORE_SAME_HOST;
                flags.same_host = true;
            } else if query_host.ends_with(&format!(".{host}"))
                || host.ends_with(&format!(".{query_host}"))
            {
                score += SCORE_HOST_OVERLAP;
                flags.host_overlap = true;
            }
        }

        if let (Some(query_domain), Some(domain)) =
            (context.origin_domain.as_deref(), entry_domain.as_deref())
        {
            if query_domain == domain {
                score += SCORE_SAME_DOMAIN;
                flags.same_domain = true;
            }
        }

        if !context.origin_tokens.is_empty() {
            let candidate_strings = auxiliary_strings(entry, context);
            for token in &context.origin_tokens {
                let hit = entry_host
                    .as_deref()
                    .is_some_and(|host| host.contains(token))
                    || entry_domain
                        .as_deref()
                        .is_some_and(|domain| domain.contains(token))
                    || candidate_strings.iter().any(|s| s.contains(token));
                if hit {
                    score += SCORE_TOKEN_HIT;
                    flags.token_match = true;
                }
            }
        }

        for value in entry.raw.values() {
            if let Some(text) = value.as_str() {
                if text.to_lowercase().contains(&query_origin) {
                    score += SCORE_AUX_ORIGIN_HIT;
                }
            }
        }
    }

    let username = entry.username.trim().to_lowercase();
    if PLACEHOLDER_USERNAMES.contains(&username.as_str()) {
        score += SCORE_PLACEHOLDER_USERNAME;
    }

    ScoredLogin {
        id: entry.id,
        title: entry.title.clone(),
        username: entry.username.clone(),
        password: entry.password.clone(),
        url: entry.url.clone(),
        origin: entry.origin.clone(),
        notes: entry.notes.clone(),
        score,
        flags,
    }
}

/// Lowercased free-text fields a token may match against, checked after the
/// entry host and domain.
fn auxiliary_strings(entry: &VaultLogin, context: &MatchContext) -> Vec<String> {
    let mut candidates = vec![entry.title.to_lowercase(), entry.url.to_lowercase()];
    if let Some(sender_url) = context.sender_url.as_deref() {
        candidates.push(sender_url.to_lowercase());
    }
    for value in entry.raw.values() {
        if let Some(text) = value.as_str() {
            candidates.push(text.to_lowercase());
        }
    }
    candidates
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
