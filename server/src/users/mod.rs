//! User Profile Routes

mod handlers;

use axum::routing::get;
use axum::Router;

use crate::api::AppState;

/// Create users router.
///
/// - GET /me - Current user summary
/// - PATCH /me - Update username
pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(handlers::get_me).patch(handlers::update_me))
}
