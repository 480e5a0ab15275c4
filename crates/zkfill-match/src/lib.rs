//! Origin matching for zkfill.
//!
//! Given a requesting web origin and a set of decrypted vault entries, this
//! crate picks the credentials worth offering:
//!
//! - [`origin`] — canonical origins, hostnames, registrable domains.
//! - [`tokens`] — distinctive-token extraction from hostnames.
//! - [`score`] — multi-signal scoring with a priority cascade.
//!
//! Everything here is pure and total: invalid input produces `None` or an
//! empty result, never an error, so a malformed URL in one stored entry can
//! never break a lookup.
//!
//! ```rust
//! use zkfill_match::{MatchContext, origin_tokens, registrable_domain};
//!
//! assert_eq!(
//!     registrable_domain("shop.app.example.co.uk").as_deref(),
//!     Some("example.co.uk")
//! );
//! assert!(origin_tokens("https://secure-login.mabanque.example.com")
//!     .contains(&"mabanque".to_string()));
//!
//! let ctx = MatchContext::for_origin(
//!     Some("https://mabanque.example.com".to_string()),
//!     None,
//! );
//! assert_eq!(ctx.origin_host.as_deref(), Some("mabanque.example.com"));
//! ```

pub mod origin;
pub mod score;
pub mod tokens;

// Re-export the full public surface at the crate root.
pub use origin::{hostname_from_url, normalize_origin, registrable_domain};
pub use score::{MatchContext, MatchFlags, ScoredLogin, VaultLogin, score_entries};
pub use tokens::origin_tokens;
