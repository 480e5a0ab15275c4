//! Session primitives for zkfill.
//!
//! This crate owns the JWT session against the vault API:
//!
//! - [`tokens`] — access/refresh token state with the 30-second
//!   early-expiry margin.
//! - [`jwt`] — unverified `exp` claim decoding (a documented trust
//!   assumption: authenticity rests on transport security and server
//!   issuance, not local signature checks).
//! - [`config`] — user configuration, base-URL normalization, API URL
//!   building.
//! - [`client`] — the login and refresh exchanges.
//! - [`error`] — [`ConfigError`], [`AuthError`], [`LoginError`],
//!   [`ApiError`].
//!
//! State ownership lives one layer up: the engine holds the session state
//! and persists token changes; this crate performs the pure exchanges and
//! validity checks.

pub mod client;
pub mod config;
pub mod error;
pub mod jwt;
pub mod tokens;

// Re-export the most commonly used types at the crate root.
pub use client::AuthClient;
pub use config::{Config, build_api_url, normalize_base_url};
pub use error::{ApiError, AuthError, ConfigError, LoginError};
pub use tokens::{EXPIRY_MARGIN_MS, TokenState, now_ms};
