//! End-to-end tests for the engine against a mock vault API.
//!
//! Each test runs a real Axum server on an ephemeral port playing the
//! remote API, seeds a `MemoryStore` with session state, and drives the
//! engine through its public `handle` entry point. Entries served by the
//! mock are genuinely envelope-encrypted with the test key pair.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use zkfill_bridge::NativeHostConfig;
use zkfill_crypto::{KeyPair, b64, encrypt_payload, export_key_bundle};
use zkfill_engine::store::{KEY_CONFIG, KEY_KEYPAIR, KEY_TOKENS};
use zkfill_engine::{Engine, EngineConfig, MemoryStore, Request, StateStore};

// ── fixtures ────────────────────────────────────────────────────────────────

fn test_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| KeyPair::generate(2048).expect("generate test key pair"))
}

fn other_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| KeyPair::generate(2048).expect("generate second key pair"))
}

/// A syntactically valid JWT expiring `in_secs` from now.
fn fake_jwt(in_secs: i64, marker: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + in_secs;
    let header = b64::encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = b64::encode(
        json!({ "exp": exp, "sub": "marie", "jti": marker })
            .to_string()
            .as_bytes(),
    );
    format!("{header}.{payload}.test-signature")
}

/// A remote entry sealed for `pair`.
fn sealed_entry(id: i64, title: &str, url: &str, username: &str, pair: &KeyPair) -> Value {
    let secret = json!({ "login": username, "password": "pw", "notes": "" });
    let ciphertext = encrypt_payload(&secret, pair).expect("encrypt entry");
    json!({
        "id": id,
        "title": title,
        "url": url,
        "category": null,
        "ciphertext": serde_json::to_value(&ciphertext).unwrap(),
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-06-01T00:00:00Z"
    })
}

async fn start_api(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind port 0");
    let addr: SocketAddr = listener.local_addr().expect("local addr");
    let base = format!("http://127.0.0.1:{}/", addr.port());

    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    base
}

/// An API that serves `entries` to any bearer and counts hits.
fn entries_api(entries: Vec<Value>, hits: Arc<AtomicUsize>) -> Router {
    Router::new().route(
        "/passwords/",
        get(move || {
            let entries = entries.clone();
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(Value::Array(entries))
            }
        }),
    )
}

async fn seeded_store(base: &str, pair: Option<&KeyPair>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .set(KEY_CONFIG, json!({ "apiBase": base, "username": "marie" }))
        .await
        .unwrap();
    store
        .set(
            KEY_TOKENS,
            json!({ "access": fake_jwt(3600, "seed"), "refresh": "refresh-seed" }),
        )
        .await
        .unwrap();
    if let Some(pair) = pair {
        store
            .set(KEY_KEYPAIR, serde_json::to_value(pair).unwrap())
            .await
            .unwrap();
    }
    store
}

fn get_credentials(origin: &str) -> Request {
    Request::GetCredentials {
        origin: Some(origin.to_string()),
        url: None,
        sender_url: None,
    }
}

async fn respond(engine: &Engine, request: Request) -> Value {
    serde_json::to_value(engine.handle(request).await).unwrap()
}

// ── credential resolution ───────────────────────────────────────────────────

#[tokio::test]
async fn resolves_the_matching_entry_for_an_origin() {
    let pair = test_pair();
    let entries = vec![
        sealed_entry(1, "Bank", "https://mabanque.example.com", "marie", pair),
        sealed_entry(2, "Other", "https://unrelated.test", "bob", pair),
    ];
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_api(entries_api(entries, Arc::clone(&hits))).await;

    let store = seeded_store(&base, Some(pair)).await;
    let engine = Engine::new(store, EngineConfig::default()).await;

    let value = respond(&engine, get_credentials("https://mabanque.example.com")).await;

    assert_eq!(value["ok"], true);
    assert_eq!(value["username"], "marie");
    assert_eq!(value["password"], "pw");
    assert_eq!(value["remember"], false);
    assert_eq!(value["autosubmit"], false);
    // The cascade narrowed to the same-origin entry.
    assert_eq!(value["logins"].as_array().unwrap().len(), 1);
    assert_eq!(value["logins"][0]["id"], 1);
}

#[tokio::test]
async fn empty_vault_resolves_to_ok_with_no_logins() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_api(entries_api(Vec::new(), hits)).await;

    let store = seeded_store(&base, Some(test_pair())).await;
    let engine = Engine::new(store, EngineConfig::default()).await;

    let value = respond(&engine, get_credentials("https://anything.test")).await;
    assert_eq!(value, json!({ "ok": true, "logins": [] }));
}

#[tokio::test]
async fn missing_keypair_falls_back_to_bridge_then_reports_key_missing() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_api(entries_api(Vec::new(), Arc::clone(&hits))).await;

    let store = seeded_store(&base, None).await;
    let engine = Engine::new(
        store,
        EngineConfig {
            native_host: Some(NativeHostConfig::new("/nonexistent/zkfill-native-host")),
        },
    )
    .await;

    let value = respond(&engine, get_credentials("https://acme.test")).await;
    assert_eq!(value, json!({ "ok": false, "error": "key_missing" }));
    // The vault was never touched.
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_config_reports_config_missing() {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store, EngineConfig::default()).await;

    let value = respond(&engine, get_credentials("https://acme.test")).await;
    assert_eq!(value, json!({ "ok": false, "error": "config_missing" }));
}

#[tokio::test]
async fn corrupt_entry_is_omitted_not_fatal() {
    let pair = test_pair();
    let entries = vec![
        // Sealed for a different key: decryption must fail and be skipped.
        sealed_entry(1, "Foreign", "https://acme.test", "intruder", other_pair()),
        sealed_entry(2, "Mine", "https://acme.test", "marie", pair),
    ];
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_api(entries_api(entries, hits)).await;

    let store = seeded_store(&base, Some(pair)).await;
    let engine = Engine::new(store, EngineConfig::default()).await;

    let value = respond(&engine, get_credentials("https://acme.test")).await;
    assert_eq!(value["ok"], true);
    assert_eq!(value["username"], "marie");
    assert_eq!(value["logins"].as_array().unwrap().len(), 1);
}

// ── cache behavior ──────────────────────────────────────────────────────────

#[tokio::test]
async fn second_lookup_within_ttl_hits_the_cache() {
    let pair = test_pair();
    let entries = vec![sealed_entry(1, "Bank", "https://acme.test", "marie", pair)];
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_api(entries_api(entries, Arc::clone(&hits))).await;

    let store = seeded_store(&base, Some(pair)).await;
    let engine = Engine::new(store, EngineConfig::default()).await;

    let first = respond(&engine, get_credentials("https://acme.test")).await;
    let second = respond(&engine, get_credentials("https://acme.test")).await;

    assert_eq!(first["ok"], true);
    assert_eq!(second["ok"], true);
    assert_eq!(hits.load(Ordering::SeqCst), 1, "cache must absorb the second lookup");
}

#[tokio::test]
async fn refresh_vault_always_refetches() {
    let pair = test_pair();
    let entries = vec![sealed_entry(1, "Bank", "https://acme.test", "marie", pair)];
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_api(entries_api(entries, Arc::clone(&hits))).await;

    let store = seeded_store(&base, Some(pair)).await;
    let engine = Engine::new(store, EngineConfig::default()).await;

    assert_eq!(respond(&engine, Request::RefreshVault).await["ok"], true);
    assert_eq!(respond(&engine, Request::RefreshVault).await["ok"], true);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let state = respond(&engine, Request::GetState).await;
    assert_eq!(state["cachedEntries"], 1);
    assert!(state["cacheAgeMs"].as_i64().is_some());
}

// ── token lifecycle ─────────────────────────────────────────────────────────

#[tokio::test]
async fn a_401_triggers_exactly_one_refresh_and_retry() {
    let pair = test_pair();
    let fresh_access = fake_jwt(3600, "fresh");
    let entries = vec![sealed_entry(1, "Bank", "https://acme.test", "marie", pair)];

    let passwords_hits = Arc::new(AtomicUsize::new(0));
    let refresh_hits = Arc::new(AtomicUsize::new(0));

    let expected_auth = format!("Bearer {fresh_access}");
    let fresh_for_refresh = fresh_access.clone();
    let passwords_hits_handler = Arc::clone(&passwords_hits);
    let refresh_hits_handler = Arc::clone(&refresh_hits);

    let app = Router::new()
        .route(
            "/passwords/",
            get(move |headers: HeaderMap| {
                let entries = entries.clone();
                let expected = expected_auth.clone();
                let hits = Arc::clone(&passwords_hits_handler);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let authorized = headers
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        .is_some_and(|value| value == expected);
                    if authorized {
                        (StatusCode::OK, Json(Value::Array(entries)))
                    } else {
                        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "stale"})))
                    }
                }
            }),
        )
        .route(
            "/auth/jwt/refresh/",
            post(move |Json(body): Json<Value>| {
                let fresh = fresh_for_refresh.clone();
                let hits = Arc::clone(&refresh_hits_handler);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(body["refresh"], "refresh-seed");
                    Json(json!({ "access": fresh }))
                }
            }),
        );
    let base = start_api(app).await;

    // Seeded access token is not expired, just unknown to the API.
    let store = seeded_store(&base, Some(pair)).await;
    let engine = Engine::new(store, EngineConfig::default()).await;

    let value = respond(&engine, get_credentials("https://acme.test")).await;

    assert_eq!(value["ok"], true);
    assert_eq!(value["username"], "marie");
    assert_eq!(refresh_hits.load(Ordering::SeqCst), 1);
    assert_eq!(passwords_hits.load(Ordering::SeqCst), 2, "one 401, one retry");
}

#[tokio::test]
async fn rejected_refresh_clears_the_session() {
    let pair = test_pair();
    let app = Router::new().route(
        "/auth/jwt/refresh/",
        post(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"detail": "expired"}))) }),
    );
    let base = start_api(app).await;

    let store = Arc::new(MemoryStore::new());
    store
        .set(KEY_CONFIG, json!({ "apiBase": base, "username": "marie" }))
        .await
        .unwrap();
    // Already-expired access token forces the refresh path immediately.
    store
        .set(
            KEY_TOKENS,
            json!({ "access": fake_jwt(-60, "expired"), "refresh": "stale" }),
        )
        .await
        .unwrap();
    store
        .set(KEY_KEYPAIR, serde_json::to_value(pair).unwrap())
        .await
        .unwrap();

    let engine = Engine::new(Arc::clone(&store) as Arc<dyn StateStore>, EngineConfig::default())
        .await;

    let value = respond(&engine, get_credentials("https://acme.test")).await;
    assert_eq!(value, json!({ "ok": false, "error": "refresh_failed:401" }));

    // Token state was cleared in memory and in the store.
    let state = respond(&engine, Request::GetState).await;
    assert_eq!(state["hasTokens"], false);
    assert_eq!(state["hasRefresh"], false);
    assert_eq!(store.get(KEY_TOKENS).await.unwrap(), None);
}

// ── session & key operations ────────────────────────────────────────────────

#[tokio::test]
async fn login_persists_config_and_tokens() {
    let access = fake_jwt(3600, "login");
    let access_for_handler = access.clone();
    let app = Router::new().route(
        "/auth/jwt/create/",
        post(move |Json(body): Json<Value>| {
            let access = access_for_handler.clone();
            async move {
                assert_eq!(body["username"], "marie");
                Json(json!({ "access": access, "refresh": "refresh-1" }))
            }
        }),
    );
    let base = start_api(app).await;

    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(Arc::clone(&store) as Arc<dyn StateStore>, EngineConfig::default())
        .await;

    let value = respond(
        &engine,
        Request::Login {
            base_url: Some(base.trim_end_matches('/').to_string()),
            username: "marie".to_string(),
            password: "pw".to_string(),
        },
    )
    .await;

    assert_eq!(value["ok"], true);
    assert!(value["expiresAt"].as_i64().is_some());

    let state = respond(&engine, Request::GetState).await;
    assert_eq!(state["hasConfig"], true);
    assert_eq!(state["hasTokens"], true);
    assert_eq!(state["hasRefresh"], true);
    assert_eq!(state["config"]["username"], "marie");

    // Both slices were persisted, with the base normalized.
    let persisted_config = store.get(KEY_CONFIG).await.unwrap().unwrap();
    assert_eq!(persisted_config["apiBase"].as_str().unwrap(), base);
    let persisted_tokens = store.get(KEY_TOKENS).await.unwrap().unwrap();
    assert_eq!(persisted_tokens["refresh"], "refresh-1");
}

#[tokio::test]
async fn login_without_credentials_is_rejected() {
    let engine = Engine::new(
        Arc::new(MemoryStore::new()) as Arc<dyn StateStore>,
        EngineConfig::default(),
    )
    .await;

    let value = respond(
        &engine,
        Request::Login {
            base_url: Some("https://vault.test".to_string()),
            username: String::new(),
            password: "pw".to_string(),
        },
    )
    .await;
    assert_eq!(value, json!({ "ok": false, "error": "credentials_required" }));
}

#[tokio::test]
async fn logout_clears_tokens_and_cache() {
    let pair = test_pair();
    let entries = vec![sealed_entry(1, "Bank", "https://acme.test", "marie", pair)];
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_api(entries_api(entries, hits)).await;

    let store = seeded_store(&base, Some(pair)).await;
    let engine = Engine::new(Arc::clone(&store) as Arc<dyn StateStore>, EngineConfig::default())
        .await;

    assert_eq!(respond(&engine, Request::RefreshVault).await["ok"], true);
    assert_eq!(respond(&engine, Request::GetState).await["cachedEntries"], 1);

    assert_eq!(respond(&engine, Request::Logout).await, json!({ "ok": true }));

    let state = respond(&engine, Request::GetState).await;
    assert_eq!(state["hasTokens"], false);
    assert_eq!(state["cachedEntries"], 0);
    assert_eq!(store.get(KEY_TOKENS).await.unwrap(), None);
}

#[tokio::test]
async fn save_config_requires_a_base() {
    let engine = Engine::new(
        Arc::new(MemoryStore::new()) as Arc<dyn StateStore>,
        EngineConfig::default(),
    )
    .await;

    let value = respond(
        &engine,
        Request::SaveConfig {
            api_base: None,
            username: Some("marie".to_string()),
        },
    )
    .await;
    assert_eq!(value, json!({ "ok": false, "error": "base_required" }));

    let value = respond(
        &engine,
        Request::SaveConfig {
            api_base: Some("vault.example.com".to_string()),
            username: None,
        },
    )
    .await;
    assert_eq!(value, json!({ "ok": true }));

    let state = respond(&engine, Request::GetState).await;
    assert_eq!(state["config"]["apiBase"], "https://vault.example.com/");
}

#[tokio::test]
async fn key_bundle_import_and_forget_roundtrip() {
    let pair = test_pair();
    let bundle = export_key_bundle(pair, "open sesame").unwrap();

    let engine = Engine::new(
        Arc::new(MemoryStore::new()) as Arc<dyn StateStore>,
        EngineConfig::default(),
    )
    .await;

    // Wrong passphrase must fail loudly.
    let value = respond(
        &engine,
        Request::ImportKeyBundle {
            bundle: Some(serde_json::to_value(&bundle).unwrap()),
            passphrase: Some("wrong".to_string()),
        },
    )
    .await;
    assert_eq!(value, json!({ "ok": false, "error": "bundle_auth_failed" }));

    // Missing pieces are their own error.
    let value = respond(
        &engine,
        Request::ImportKeyBundle {
            bundle: None,
            passphrase: Some("open sesame".to_string()),
        },
    )
    .await;
    assert_eq!(
        value,
        json!({ "ok": false, "error": "bundle_or_passphrase_missing" })
    );

    // Correct import.
    let value = respond(
        &engine,
        Request::ImportKeyBundle {
            bundle: Some(serde_json::to_value(&bundle).unwrap()),
            passphrase: Some("open sesame".to_string()),
        },
    )
    .await;
    assert_eq!(value, json!({ "ok": true }));
    assert_eq!(respond(&engine, Request::GetState).await["hasKeyPair"], true);

    // Forget.
    let value = respond(&engine, Request::ForgetKeyPair).await;
    assert_eq!(value, json!({ "ok": true }));
    assert_eq!(respond(&engine, Request::GetState).await["hasKeyPair"], false);
}

// ── external storage changes ────────────────────────────────────────────────

#[tokio::test]
async fn external_keypair_change_invalidates_the_cache() {
    let pair = test_pair();
    let entries = vec![sealed_entry(1, "Bank", "https://acme.test", "marie", pair)];
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_api(entries_api(entries, Arc::clone(&hits))).await;

    let store = seeded_store(&base, Some(pair)).await;
    let engine = Engine::new(store, EngineConfig::default()).await;

    assert_eq!(respond(&engine, Request::RefreshVault).await["ok"], true);
    assert_eq!(respond(&engine, Request::GetState).await["cachedEntries"], 1);

    engine
        .apply_storage_change(KEY_KEYPAIR, Some(serde_json::to_value(other_pair()).unwrap()))
        .await;

    let state = respond(&engine, Request::GetState).await;
    assert_eq!(state["cachedEntries"], 0);
    assert_eq!(state["hasKeyPair"], true);
}
