//! Native-messaging bridge for zkfill.
//!
//! When the primary vault path is missing a resource (config, tokens, key)
//! or finds nothing, credential queries fall back to an external
//! native-messaging host whose wire format is fixed by a third party. This
//! crate owns that seam:
//!
//! - [`framing`] — the u32-LE length-prefixed JSON framing, shared with
//!   the host binary.
//! - [`client`] — spawns the host, performs one request/response round
//!   trip.
//! - [`normalize`] — the prioritized decoder chain reducing the host's
//!   heterogeneous response shapes to one canonical type.
//! - [`error`] — [`NativeError`] and its wire tags.

pub mod client;
pub mod error;
pub mod framing;
pub mod normalize;

// Re-export the most commonly used types at the crate root.
pub use client::{NativeBridge, NativeHostConfig};
pub use error::{NativeError, Result};
pub use normalize::{NativeCredentials, NativeLogin, coerce_flag, normalize_response};
