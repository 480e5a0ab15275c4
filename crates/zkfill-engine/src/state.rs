//! The process-wide session state.
//!
//! One [`SessionState`] instance holds everything mutable — configuration,
//! tokens, the active key pair and the decrypted-entry cache. It is owned
//! by the engine behind a single `RwLock`, hydrated from the state store at
//! startup, mutated only through engine methods and cleared on logout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use zkfill_auth::{Config, TokenState};
use zkfill_crypto::KeyPair;
use zkfill_match::VaultLogin;

/// How long a decrypted snapshot may serve reads before a refetch.
pub const CACHE_TTL: Duration = Duration::from_millis(5000);

/// Short-lived cache of the decrypted vault.
///
/// The snapshot is immutable once stored; concurrent fetches racing past a
/// stale TTL check overwrite each other last-write-wins, which costs at
/// most one redundant network call. Ranking never happens here — entries
/// are scored at query time only.
#[derive(Debug, Default)]
pub struct VaultCache {
    entries: Option<Arc<Vec<VaultLogin>>>,
    fetched_at: Option<Instant>,
}

impl VaultCache {
    /// The cached snapshot, when one exists and is younger than
    /// [`CACHE_TTL`].
    pub fn fresh_snapshot(&self) -> Option<Arc<Vec<VaultLogin>>> {
        let fetched_at = self.fetched_at?;
        if fetched_at.elapsed() < CACHE_TTL {
            self.entries.clone()
        } else {
            None
        }
    }

    /// Replace the snapshot.
    pub fn store(&mut self, entries: Arc<Vec<VaultLogin>>) {
        self.entries = Some(entries);
        self.fetched_at = Some(Instant::now());
    }

    /// Drop the snapshot. Called on every config, token or key change.
    pub fn clear(&mut self) {
        self.entries = None;
        self.fetched_at = None;
    }

    /// Number of cached entries (0 when empty).
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.len())
    }

    /// Whether no snapshot is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_none()
    }

    /// Age of the snapshot in milliseconds, `None` when nothing is cached.
    pub fn age_ms(&self) -> Option<i64> {
        self.fetched_at
            .map(|fetched_at| i64::try_from(fetched_at.elapsed().as_millis()).unwrap_or(i64::MAX))
    }
}

/// Everything mutable the engine owns.
#[derive(Debug, Default)]
pub struct SessionState {
    pub config: Config,
    pub tokens: TokenState,
    pub keypair: Option<KeyPair>,
    pub cache: VaultCache,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
