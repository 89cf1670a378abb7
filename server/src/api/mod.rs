//! API Router and Application State
//!
//! Central routing configuration and shared state.

use axum::{
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth, config::Config, orgs, users};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Success envelope wrapping a response payload.
#[derive(Debug, Serialize)]
pub struct ApiOk<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> ApiOk<T> {
    pub fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

impl<T: Serialize> IntoResponse for ApiOk<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Success envelope for endpoints that return a message instead of data.
#[derive(Debug, Serialize)]
pub struct ApiMessage {
    pub status: &'static str,
    pub message: &'static str,
}

impl ApiMessage {
    pub fn new(message: &'static str) -> Self {
        Self {
            status: "ok",
            message,
        }
    }
}

impl IntoResponse for ApiMessage {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes that require a verified access token
    let protected_routes = Router::new()
        .nest("/api/orgs", orgs::router(state.clone()))
        .nest("/api/invites", orgs::invite_router())
        .nest("/api/users", users::router())
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Auth routes
        .nest("/api/auth", auth::router())
        .merge(protected_routes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
