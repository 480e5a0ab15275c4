//! The credential-resolution engine.
//!
//! One [`Engine`] owns the session state, the state store, the crypto key
//! cache and the collaborators (auth client, native bridge), and dispatches
//! every inbound [`Request`]. Execution is cooperative: state is guarded by
//! a single `RwLock`, held only between suspension points; the benign races
//! this allows (double refresh, double fetch) are idempotent by
//! construction.

use std::sync::Arc;

use serde_json::Value;

use zkfill_auth::{
    AuthClient, AuthError, Config, LoginError, TokenState, build_api_url, normalize_base_url,
    now_ms,
};
use zkfill_bridge::{NativeBridge, NativeError, NativeHostConfig};
use zkfill_crypto::{BundleError, KeyCache, decrypt_ciphertext, import_key_bundle};
use zkfill_match::{MatchContext, normalize_origin, score_entries};

use crate::error::{EngineError, Result};
use crate::protocol::{Request, Response, StateSnapshot};
use crate::state::SessionState;
use crate::store::{KEY_CONFIG, KEY_KEYPAIR, KEY_TOKENS, StateStore};
use crate::vault::{EncryptedEntry, normalize_login_entry};

/// Path of the entries endpoint, relative to the API base.
const ENTRIES_PATH: &str = "passwords/";

/// Collaborator wiring for an [`Engine`].
#[derive(Debug, Default)]
pub struct EngineConfig {
    /// External native-messaging host used as the fallback lookup path.
    pub native_host: Option<NativeHostConfig>,
}

/// The background credential-resolution engine.
pub struct Engine {
    store: Arc<dyn StateStore>,
    auth: AuthClient,
    key_cache: KeyCache,
    bridge: Option<NativeBridge>,
    state: tokio::sync::RwLock<SessionState>,
}

impl Engine {
    /// Construct an engine, hydrating session state from the store.
    ///
    /// Hydration is forgiving: unreadable or unparsable persisted slices
    /// are logged and treated as absent, never fatal.
    pub async fn new(store: Arc<dyn StateStore>, config: EngineConfig) -> Self {
        let mut state = SessionState::default();

        state.config = hydrate(&*store, KEY_CONFIG).await.unwrap_or_default();
        state.tokens = hydrate::<TokenState>(&*store, KEY_TOKENS)
            .await
            .unwrap_or_default();
        state.tokens.recompute_expiry();
        state.keypair = hydrate(&*store, KEY_KEYPAIR).await;

        tracing::info!(
            has_config = state.config.has_api_base(),
            has_tokens = state.tokens.has_any(),
            has_keypair = state.keypair.is_some(),
            "engine state hydrated"
        );

        Self {
            store,
            auth: AuthClient::default(),
            key_cache: KeyCache::new(),
            bridge: config.native_host.map(NativeBridge::new),
            state: tokio::sync::RwLock::new(state),
        }
    }

    /// Dispatch one request. Every failure becomes a tagged
    /// `{ok:false, error}` response; nothing escapes as an error value.
    pub async fn handle(&self, request: Request) -> Response {
        let result = match request {
            Request::GetCredentials {
                origin,
                url,
                sender_url,
            } => return self.get_credentials(origin, url, sender_url).await,
            Request::GetState => Ok(self.get_state().await),
            Request::Login {
                base_url,
                username,
                password,
            } => self.login(base_url, username, password).await,
            Request::Logout => self.logout().await,
            Request::SaveConfig { api_base, username } => {
                self.save_config(api_base, username).await
            }
            Request::ImportKeyBundle { bundle, passphrase } => {
                self.import_key_bundle(bundle, passphrase).await
            }
            Request::ForgetKeyPair => self.forget_key_pair().await,
            Request::RefreshVault => self.refresh_vault().await,
        };

        match result {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, tag = %err.wire_tag(), "operation failed");
                Response::error(err.wire_tag())
            }
        }
    }

    // -- Credential resolution ----------------------------------------------

    /// Resolve the best credential for an origin.
    ///
    /// Runs the vault path when config, tokens and key are all present;
    /// otherwise (or when the vault turns up empty) attempts the native
    /// bridge; finally surfaces the most specific failure. A vault lookup
    /// that completed with zero matches resolves to `{ok:true, logins:[]}`
    /// — an empty vault is not an error.
    async fn get_credentials(
        &self,
        origin: Option<String>,
        url: Option<String>,
        sender_url: Option<String>,
    ) -> Response {
        let origin = origin
            .as_deref()
            .and_then(normalize_origin)
            .or_else(|| sender_url.as_deref().and_then(normalize_origin));
        let query_url = url.or(sender_url);

        let (has_config, has_tokens, has_key) = {
            let state = self.state.read().await;
            (
                state.config.has_api_base(),
                state.tokens.has_any(),
                state.keypair.is_some(),
            )
        };

        let mut lookup_completed_empty = false;
        let mut api_error: Option<EngineError> = None;

        if has_config && has_tokens && has_key {
            match self.fetch_entries(false).await {
                Ok(entries) => {
                    let context =
                        MatchContext::for_origin(origin.clone(), query_url.clone());
                    let matches = score_entries(&entries, &context);
                    if !matches.is_empty() {
                        let best = &matches[0];
                        tracing::debug!(
                            origin = origin.as_deref().unwrap_or(""),
                            candidates = matches.len(),
                            best_id = best.id,
                            "resolved credentials from vault"
                        );
                        let (username, password) =
                            (best.username.clone(), best.password.clone());
                        return Response::Credentials {
                            ok: true,
                            username,
                            password,
                            remember: false,
                            autosubmit: false,
                            logins: matches,
                        };
                    }
                    lookup_completed_empty = true;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "vault lookup failed, trying native bridge");
                    api_error = Some(err);
                }
            }
        }

        let native_result = match &self.bridge {
            Some(bridge) => {
                bridge
                    .get_logins(origin.as_deref(), query_url.as_deref())
                    .await
            }
            None => Err(NativeError::Unavailable),
        };

        let native_error = match native_result {
            Ok(credentials) => {
                tracing::debug!("resolved credentials via native bridge");
                return Response::Native {
                    ok: true,
                    credentials,
                };
            }
            Err(err) => err,
        };

        if lookup_completed_empty {
            return Response::empty_logins();
        }
        if !has_config {
            return Response::error("config_missing");
        }
        if !has_tokens {
            return Response::error("not_authenticated");
        }
        if !has_key {
            return Response::error("key_missing");
        }
        if let Some(err) = api_error {
            return Response::error(err.wire_tag());
        }
        Response::error(native_error.wire_tag())
    }

    // -- Session lifecycle ---------------------------------------------------

    async fn login(
        &self,
        base_url: Option<String>,
        username: String,
        password: String,
    ) -> Result<Response> {
        if username.is_empty() || password.is_empty() {
            return Err(LoginError::CredentialsRequired.into());
        }

        let existing_base = { self.state.read().await.config.api_base.clone() };
        let base = base_url
            .filter(|base| !base.trim().is_empty())
            .or(existing_base)
            .as_deref()
            .and_then(normalize_base_url)
            .ok_or(EngineError::BaseRequired)?;

        let tokens = self.auth.login(&base, &username, &password).await?;
        let expires_at = tokens.expires_at;

        let config = {
            let mut state = self.state.write().await;
            state.config.api_base = Some(base);
            state.config.username = Some(username);
            state.tokens = tokens.clone();
            state.cache.clear();
            state.config.clone()
        };

        self.store
            .set(KEY_CONFIG, serde_json::to_value(&config)?)
            .await?;
        self.store
            .set(KEY_TOKENS, serde_json::to_value(&tokens)?)
            .await?;

        Ok(Response::LoginOk {
            ok: true,
            expires_at,
        })
    }

    async fn logout(&self) -> Result<Response> {
        self.clear_tokens().await?;
        tracing::info!("logged out");
        Ok(Response::ack())
    }

    async fn save_config(
        &self,
        api_base: Option<String>,
        username: Option<String>,
    ) -> Result<Response> {
        let current = { self.state.read().await.config.clone() };

        let base = api_base
            .filter(|base| !base.trim().is_empty())
            .or(current.api_base)
            .as_deref()
            .and_then(normalize_base_url)
            .ok_or(EngineError::BaseRequired)?;
        let config = Config {
            api_base: Some(base),
            username: username
                .filter(|name| !name.is_empty())
                .or(current.username),
        };

        {
            let mut state = self.state.write().await;
            state.config = config.clone();
            state.cache.clear();
        }
        self.store
            .set(KEY_CONFIG, serde_json::to_value(&config)?)
            .await?;

        Ok(Response::ack())
    }

    // -- Key management ------------------------------------------------------

    async fn import_key_bundle(
        &self,
        bundle: Option<Value>,
        passphrase: Option<String>,
    ) -> Result<Response> {
        let (Some(bundle), Some(passphrase)) = (
            bundle.filter(|value| !value.is_null()),
            passphrase.filter(|phrase| !phrase.is_empty()),
        ) else {
            return Err(EngineError::BundleOrPassphraseMissing);
        };

        let bundle = serde_json::from_value(bundle).map_err(|e| BundleError::Malformed {
            reason: e.to_string(),
        })?;
        let pair = import_key_bundle(&bundle, &passphrase)?;

        {
            let mut state = self.state.write().await;
            state.keypair = Some(pair.clone());
            state.cache.clear();
        }
        self.key_cache.clear();
        self.store
            .set(KEY_KEYPAIR, serde_json::to_value(&pair)?)
            .await?;

        tracing::info!("key pair imported from bundle");
        Ok(Response::ack())
    }

    async fn forget_key_pair(&self) -> Result<Response> {
        {
            let mut state = self.state.write().await;
            state.keypair = None;
            state.cache.clear();
        }
        self.key_cache.clear();
        self.store.remove(KEY_KEYPAIR).await?;

        tracing::info!("key pair forgotten");
        Ok(Response::ack())
    }

    // -- Vault ---------------------------------------------------------------

    async fn refresh_vault(&self) -> Result<Response> {
        self.fetch_entries(true).await?;
        Ok(Response::ack())
    }

    /// Return decrypted entries, from cache when fresh.
    ///
    /// Entries that fail to parse or decrypt are logged and omitted — one
    /// corrupt or foreign-key entry never blocks the rest of the vault.
    /// The rebuilt snapshot is written last-write-wins.
    async fn fetch_entries(&self, force: bool) -> Result<Arc<Vec<zkfill_match::VaultLogin>>> {
        let keypair = {
            let state = self.state.read().await;
            let Some(pair) = state.keypair.clone() else {
                return Err(EngineError::KeyPairMissing);
            };
            if !force {
                if let Some(snapshot) = state.cache.fresh_snapshot() {
                    tracing::trace!(entries = snapshot.len(), "vault cache hit");
                    return Ok(snapshot);
                }
            }
            pair
        };

        let response = self.api_get(ENTRIES_PATH).await?;
        let data: Value = response.json().await.map_err(zkfill_auth::ApiError::from)?;
        let Some(items) = data.as_array() else {
            return Err(EngineError::InvalidEntriesResponse);
        };

        let mut entries = Vec::new();
        for item in items {
            let encrypted: EncryptedEntry = match serde_json::from_value(item.clone()) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping structurally invalid entry");
                    continue;
                }
            };
            match decrypt_ciphertext(&encrypted.ciphertext, &keypair, &self.key_cache) {
                Ok(secret) => {
                    if let Some(login) = normalize_login_entry(&encrypted, &secret) {
                        entries.push(login);
                    } else {
                        tracing::debug!(entry_id = encrypted.id, "entry has no usable credentials");
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        entry_id = encrypted.id,
                        error = %err,
                        "failed to decrypt entry, omitting"
                    );
                }
            }
        }

        tracing::debug!(entries = entries.len(), total = items.len(), "vault fetched");

        let snapshot = Arc::new(entries);
        {
            let mut state = self.state.write().await;
            state.cache.store(Arc::clone(&snapshot));
        }
        Ok(snapshot)
    }

    // -- Token lifecycle -----------------------------------------------------

    /// A usable access token, refreshing proactively within the expiry
    /// margin.
    async fn ensure_access_token(&self) -> Result<String> {
        {
            let state = self.state.read().await;
            if state.tokens.is_access_valid(now_ms()) {
                if let Some(access) = state.tokens.access.clone() {
                    return Ok(access);
                }
            }
        }
        self.refresh_access_token(true).await
    }

    /// Refresh the access token.
    ///
    /// In forced mode a missing refresh token clears token state (and the
    /// cache) before failing. A 400/401 rejection from the server does the
    /// same — the session is gone, not merely stale.
    async fn refresh_access_token(&self, forced: bool) -> Result<String> {
        let (base, refresh) = {
            let state = self.state.read().await;
            (
                state.config.api_base.clone(),
                state.tokens.refresh.clone(),
            )
        };

        let Some(refresh) = refresh else {
            if forced {
                self.clear_tokens().await?;
            }
            return Err(AuthError::RefreshMissing.into());
        };
        let base = base.ok_or(EngineError::ConfigMissing)?;

        match self.auth.refresh(&base, &refresh).await {
            Ok(tokens) => {
                let access = tokens
                    .access
                    .clone()
                    .ok_or(AuthError::InvalidRefreshResponse)?;
                {
                    let mut state = self.state.write().await;
                    state.tokens = tokens.clone();
                    state.cache.clear();
                }
                self.store
                    .set(KEY_TOKENS, serde_json::to_value(&tokens)?)
                    .await?;
                Ok(access)
            }
            Err(AuthError::RefreshRejected { status }) if status == 400 || status == 401 => {
                tracing::info!(status, "refresh rejected, clearing session");
                self.clear_tokens().await?;
                Err(AuthError::RefreshRejected { status }.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Authenticated GET with exactly one forced-refresh retry on 401.
    async fn api_get(&self, path: &str) -> Result<reqwest::Response> {
        let response = self.attempt_get(path).await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            tracing::debug!(path, "401 from api, forcing one refresh and retrying");
            self.refresh_access_token(true).await?;
            let retried = self.attempt_get(path).await?;
            return require_success(retried).await;
        }
        require_success(response).await
    }

    async fn attempt_get(&self, path: &str) -> Result<reqwest::Response> {
        let access = self.ensure_access_token().await?;
        let base = {
            self.state.read().await.config.api_base.clone()
        }
        .ok_or(EngineError::ConfigMissing)?;

        let url = build_api_url(&base, path).map_err(zkfill_auth::ApiError::from)?;
        let response = self
            .auth
            .http()
            .get(url)
            .bearer_auth(access)
            .send()
            .await
            .map_err(zkfill_auth::ApiError::from)?;
        Ok(response)
    }

    async fn clear_tokens(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.tokens = TokenState::default();
            state.cache.clear();
        }
        self.store.remove(KEY_TOKENS).await?;
        Ok(())
    }

    // -- Introspection -------------------------------------------------------

    async fn get_state(&self) -> Response {
        let state = self.state.read().await;
        Response::State(Box::new(StateSnapshot {
            ok: true,
            config: state.config.clone(),
            has_config: state.config.has_api_base(),
            has_tokens: state.tokens.access.is_some(),
            has_refresh: state.tokens.refresh.is_some(),
            token_expires_at: state.tokens.expires_at,
            has_key_pair: state.keypair.is_some(),
            cached_entries: state.cache.len(),
            cache_age_ms: state.cache.age_ms(),
        }))
    }

    /// React to an external change of a persisted key (the storage
    /// substrate is shared with companion surfaces that may write directly).
    pub async fn apply_storage_change(&self, key: &str, new_value: Option<Value>) {
        let mut state = self.state.write().await;
        match key {
            KEY_CONFIG => {
                state.config = new_value
                    .and_then(|value| serde_json::from_value(value).ok())
                    .unwrap_or_default();
                state.cache.clear();
            }
            KEY_TOKENS => {
                state.tokens = new_value
                    .and_then(|value| serde_json::from_value(value).ok())
                    .unwrap_or_default();
                state.tokens.recompute_expiry();
                state.cache.clear();
            }
            KEY_KEYPAIR => {
                state.keypair = new_value.and_then(|value| serde_json::from_value(value).ok());
                self.key_cache.clear();
                state.cache.clear();
            }
            other => {
                tracing::debug!(key = other, "ignoring storage change for unknown key");
            }
        }
    }
}

/// Hydrate one state slice, treating unreadable data as absent.
async fn hydrate<T: serde::de::DeserializeOwned>(store: &dyn StateStore, key: &str) -> Option<T> {
    match store.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(key, error = %err, "ignoring unparsable persisted state");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            tracing::warn!(key, error = %err, "state store read failed during hydration");
            None
        }
    }
}

async fn require_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(zkfill_auth::ApiError::Status {
        status: status.as_u16(),
        body,
    }
    .into())
}
