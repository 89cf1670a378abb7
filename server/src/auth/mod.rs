//! Authentication Service
//!
//! Credential hashing, JWT issuance and verification, OTP login, and the
//! request-auth / role-gate middleware layers used by the rest of the API.

mod error;
mod handlers;
pub mod jwt;
mod middleware;
mod otp;
mod password;

use axum::{routing::post, Router};

use crate::api::AppState;

pub use error::{AuthError, AuthResult};
pub use middleware::{require_auth, require_org_role, AuthUser};

/// Create authentication router.
///
/// All routes are public; the session they establish is what the protected
/// routers elsewhere consume.
///
/// - POST /check-email - Does this email have an account?
/// - POST /signup - Register with email and password
/// - POST /login - Login with email and password
/// - POST /refresh - Rotate the refresh cookie, mint a new access token
/// - POST /logout - Clear the refresh cookie
/// - POST /otp/request - Issue a one-time passcode
/// - POST /otp/verify - Verify a passcode and establish a session
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check-email", post(handlers::check_email))
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
        .route("/otp/request", post(handlers::otp_request))
        .route("/otp/verify", post(handlers::otp_verify))
}
