//! Session retry protocol tests against an in-process mock server.
//!
//! The mock speaks just enough of the auth API to exercise the client: a
//! login that sets the refresh cookie, a refresh endpoint that demands it,
//! and one protected route that only honors the post-refresh token.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Method;

use ob_client::Session;

const STALE_TOKEN: &str = "stale-token";
const FRESH_TOKEN: &str = "fresh-token";
const REFRESH_COOKIE: &str = "rt=refresh-1";

struct MockState {
    refresh_calls: AtomicUsize,
    me_calls: AtomicUsize,
    refresh_ok: bool,
    refresh_delay_ms: u64,
}

impl MockState {
    fn new(refresh_ok: bool, refresh_delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            refresh_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            refresh_ok,
            refresh_delay_ms,
        })
    }
}

fn token_envelope(token: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "data": { "accessToken": token } }))
}

async fn login() -> impl IntoResponse {
    (
        [(
            header::SET_COOKIE,
            format!("{REFRESH_COOKIE}; HttpOnly; Path=/api/auth/refresh"),
        )],
        token_envelope(STALE_TOKEN),
    )
}

async fn refresh(State(state): State<Arc<MockState>>, headers: HeaderMap) -> impl IntoResponse {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);

    if state.refresh_delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(state.refresh_delay_ms)).await;
    }

    let has_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(REFRESH_COOKIE));

    if state.refresh_ok && has_cookie {
        token_envelope(FRESH_TOKEN).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "status": "error", "message": "Invalid token" })),
        )
            .into_response()
    }
}

async fn me(State(state): State<Arc<MockState>>, headers: HeaderMap) -> impl IntoResponse {
    state.me_calls.fetch_add(1, Ordering::SeqCst);

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {FRESH_TOKEN}"));

    if authorized {
        Json(serde_json::json!({ "status": "ok", "data": { "username": "demo" } }))
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "status": "error", "message": "Unauthorized" })),
        )
            .into_response()
    }
}

async fn spawn_mock(state: Arc<MockState>) -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/users/me", get(me))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn expired_token_refreshes_and_retries_exactly_once() {
    let state = MockState::new(true, 0);
    let base = spawn_mock(state.clone()).await;

    let session = Session::new(&base).unwrap();
    session.login("demo@example.com", "password123").await.unwrap();
    assert_eq!(session.access_token().await.as_deref(), Some(STALE_TOKEN));

    let response = session
        .request(Method::GET, "/api/users/me", None)
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.me_calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.access_token().await.as_deref(), Some(FRESH_TOKEN));
}

#[tokio::test]
async fn failed_refresh_returns_the_original_401() {
    let state = MockState::new(false, 0);
    let base = spawn_mock(state.clone()).await;

    let session = Session::new(&base).unwrap();
    session.set_access_token(Some(STALE_TOKEN.to_string())).await;

    let response = session
        .request(Method::GET, "/api/users/me", None)
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.me_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.access_token().await.as_deref(), Some(STALE_TOKEN));
}

#[tokio::test]
async fn concurrent_401s_coalesce_onto_one_refresh() {
    let state = MockState::new(true, 100);
    let base = spawn_mock(state.clone()).await;

    let session = Arc::new(Session::new(&base).unwrap());
    session.login("demo@example.com", "password123").await.unwrap();

    let a = {
        let session = session.clone();
        tokio::spawn(async move { session.request(Method::GET, "/api/users/me", None).await })
    };
    let b = {
        let session = session.clone();
        tokio::spawn(async move { session.request(Method::GET, "/api/users/me", None).await })
    };

    let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

    assert_eq!(a.status(), 200);
    assert_eq!(b.status(), 200);
    assert_eq!(state.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_without_cookie_fails_quietly() {
    let state = MockState::new(true, 0);
    let base = spawn_mock(state.clone()).await;

    // Fresh session, never logged in, so the cookie store is empty.
    let session = Session::new(&base).unwrap();
    assert!(!session.refresh_session().await);
    assert_eq!(session.access_token().await, None);
}
