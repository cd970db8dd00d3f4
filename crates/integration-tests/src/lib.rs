//! Integration tests for the account SDK.
//!
//! The tests drive `Identity` and `Monetization` through their public API
//! against [`FakeProvider`], an in-process HTTP server that plays the session
//! service, the legacy identity service and the entitlement service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p account-sdk-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use account_sdk::SdkConfig;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

#[derive(Default)]
struct Script {
    primary_session: Option<Value>,
    legacy_session: Option<Value>,
    primary_logout_fails: bool,
    legacy_logout_fails: bool,
    access: HashMap<String, Value>,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<Script>>;

fn lock(script: &Shared) -> std::sync::MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-process identity provider.
pub struct FakeProvider {
    base_url: String,
    script: Shared,
    server: JoinHandle<()>,
}

impl FakeProvider {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake provider");
        let addr = listener.local_addr().expect("Failed to read local address");
        let script: Shared = Arc::default();

        let app = Router::new()
            .route("/rpc/hasSession.js", get(primary_has_session))
            .route("/ajax/hasSession.js", get(legacy_has_session))
            .route("/rpc/logout.js", get(primary_logout))
            .route("/ajax/logout.js", get(legacy_logout))
            .route("/hasAccess/{ids}", get(has_access))
            .with_state(Arc::clone(&script));

        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            script,
            server,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configuration pointing every service at this provider.
    ///
    /// # Panics
    ///
    /// Panics if the provider URL is rejected.
    #[must_use]
    pub fn config(&self) -> SdkConfig {
        SdkConfig::new("client-1", "http://news.example.com/callback")
            .and_then(|c| c.with_env(&self.base_url))
            .and_then(|c| c.with_session_domain(&self.base_url))
            .expect("Fake provider config is valid")
    }

    /// Answer the session service's `hasSession` with `value`.
    pub fn set_session(&self, value: Value) {
        lock(&self.script).primary_session = Some(value);
    }

    /// Answer the legacy `hasSession` with `value`.
    pub fn set_legacy_session(&self, value: Value) {
        lock(&self.script).legacy_session = Some(value);
    }

    /// Make the session service report a `LoginException`.
    pub fn require_legacy_login(&self) {
        self.set_session(json!({
            "error": { "code": 401, "type": "LoginException", "description": "Autologin required" }
        }));
    }

    pub fn fail_logout(&self, primary: bool, legacy: bool) {
        let mut script = lock(&self.script);
        script.primary_logout_fails = primary;
        script.legacy_logout_fails = legacy;
    }

    /// Answer `hasAccess/{ids}` with `record`.
    pub fn set_access(&self, ids: &str, record: Value) {
        lock(&self.script).access.insert(ids.to_string(), record);
    }

    /// Number of requests received for `path`.
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        lock(&self.script)
            .requests
            .iter()
            .filter(|p| *p == path)
            .count()
    }
}

impl Drop for FakeProvider {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn record(script: &Shared, uri: &Uri) {
    lock(script).requests.push(uri.path().to_string());
}

fn jsonp(params: &HashMap<String, String>, body: &Value) -> Response {
    let callback = params.get("callback").map_or("callback", String::as_str);
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        format!("/**/ typeof {callback} === 'function' && {callback}({body});"),
    )
        .into_response()
}

async fn primary_has_session(State(script): State<Shared>, uri: Uri) -> Response {
    record(&script, &uri);
    let reply = lock(&script).primary_session.clone();
    match reply {
        Some(body) if body.get("error").is_some() => {
            (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
        }
        Some(body) => axum::Json(body).into_response(),
        None => axum::Json(json!({ "result": false })).into_response(),
    }
}

async fn legacy_has_session(
    State(script): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    record(&script, &uri);
    let reply = lock(&script)
        .legacy_session
        .clone()
        .unwrap_or_else(|| json!({ "result": false }));
    jsonp(&params, &reply)
}

async fn primary_logout(State(script): State<Shared>, uri: Uri) -> Response {
    record(&script, &uri);
    if lock(&script).primary_logout_fails {
        return (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response();
    }
    axum::Json(json!({ "result": true })).into_response()
}

async fn legacy_logout(
    State(script): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    uri: Uri,
) -> Response {
    record(&script, &uri);
    if lock(&script).legacy_logout_fails {
        return (StatusCode::BAD_GATEWAY, "bad gateway").into_response();
    }
    jsonp(&params, &json!({ "result": true }))
}

async fn has_access(State(script): State<Shared>, Path(ids): Path<String>, uri: Uri) -> Response {
    record(&script, &uri);
    let reply = lock(&script).access.get(&ids).cloned();
    match reply {
        Some(body) => axum::Json(body).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown products").into_response(),
    }
}
