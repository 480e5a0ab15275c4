//! Background credential-resolution engine for zkfill.
//!
//! The engine coordinates the whole pipeline behind a credential query:
//! keep the JWT session alive, fetch and envelope-decrypt the vault into a
//! short-lived cache, rank entries against the requesting origin, and fall
//! back to an external native-messaging host when local resources are
//! missing.
//!
//! - [`engine`] — the [`Engine`]: request dispatch, token lifecycle,
//!   vault client and fallback logic.
//! - [`state`] — the single session-state object and the 5-second vault
//!   cache.
//! - [`store`] — the key-value persistence seam (`config` / `tokens` /
//!   `keypair`).
//! - [`protocol`] — wire request/response types.
//! - [`vault`] — remote entry model and secret normalization.
//! - [`error`] — [`EngineError`] and the wire-tag mapping.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zkfill_engine::{Engine, EngineConfig, JsonFileStore, Request};
//!
//! # async fn example() {
//! let store = Arc::new(JsonFileStore::new("zkfill-state.json"));
//! let engine = Engine::new(store, EngineConfig::default()).await;
//!
//! let response = engine
//!     .handle(Request::GetCredentials {
//!         origin: Some("https://mabanque.example.com".to_string()),
//!         url: None,
//!         sender_url: None,
//!     })
//!     .await;
//! assert!(serde_json::to_string(&response).is_ok());
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod protocol;
pub mod state;
pub mod store;
pub mod vault;

// Re-export the most commonly used types at the crate root.
pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, Result};
pub use protocol::{Request, Response, StateSnapshot};
pub use store::{JsonFileStore, MemoryStore, StateStore, StoreError};
