//! Authentication HTTP Handlers
//!
//! Login, signup, refresh, logout, and the OTP request/verify pair. All
//! success paths that establish a session set the HTTP-only refresh cookie;
//! the access token travels only in the JSON body.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use crate::api::{ApiMessage, ApiOk, AppState};
use crate::config::Config;
use crate::db;

use super::error::{AuthError, AuthResult};
use super::jwt::{sign_access_token, sign_refresh_token, verify_refresh_token};
use super::otp;
use super::password::{hash_password, verify_password};

/// Refresh cookie name.
pub const REFRESH_COOKIE: &str = "rt";

/// The refresh cookie never travels beyond its own endpoint.
pub const REFRESH_COOKIE_PATH: &str = "/api/auth/refresh";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Email existence probe.
#[derive(Debug, Deserialize)]
pub struct CheckEmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CheckEmailResponse {
    pub exists: bool,
}

/// Signup request.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Email address (also the login identifier).
    #[validate(email)]
    pub email: String,
    /// Password (8-128 characters).
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Login request. Same payload contract as signup.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// OTP issuance request.
#[derive(Debug, Deserialize)]
pub struct OtpRequestBody {
    pub email: Option<String>,
}

/// OTP verification request.
#[derive(Debug, Deserialize)]
pub struct OtpVerifyBody {
    pub email: Option<String>,
    pub otp: Option<String>,
}

/// Authentication response carrying the short-lived access token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
}

// ============================================================================
// Helpers
// ============================================================================

/// Build the refresh cookie: HTTP-only, path-scoped to the refresh endpoint,
/// SameSite=Lax in development and Strict (plus Secure) in production.
fn refresh_cookie(token: String, config: &Config) -> Cookie<'static> {
    let mut cookie = Cookie::new(REFRESH_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_path(REFRESH_COOKIE_PATH);
    cookie.set_max_age(time::Duration::seconds(config.jwt_refresh_expiry));
    if config.cookie_secure {
        cookie.set_same_site(SameSite::Strict);
        cookie.set_secure(true);
    } else {
        cookie.set_same_site(SameSite::Lax);
    }
    cookie
}

/// Mint the access/refresh pair for a user.
///
/// The access token carries `sub` only; organization context and roles are
/// resolved per-request by the role middleware. The refresh rotation id is
/// the user id (one logical refresh lineage per user).
fn issue_tokens(config: &Config, user_id: Uuid) -> AuthResult<(String, String)> {
    let access = sign_access_token(
        user_id,
        None,
        None,
        &config.jwt_secret,
        config.jwt_access_expiry,
    )?;
    let refresh = sign_refresh_token(
        user_id,
        user_id,
        &config.refresh_token_secret,
        config.jwt_refresh_expiry,
    )?;
    Ok((access, refresh))
}

/// Default username for accounts created from a bare email address.
fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or("user").to_string()
}

// ============================================================================
// Handlers
// ============================================================================

/// Check whether an email has an account.
///
/// Deliberately explicit about existence (signup/login UX); contrast with
/// `otp_request`, which never reveals it.
///
/// POST /api/auth/check-email
#[tracing::instrument(skip(state, body))]
pub async fn check_email(
    State(state): State<AppState>,
    Json(body): Json<CheckEmailRequest>,
) -> AuthResult<ApiOk<CheckEmailResponse>> {
    if !body.email.validate_email() {
        return Err(AuthError::UnprocessableEntity("Invalid email".to_string()));
    }

    let exists = db::email_exists(&state.db, &body.email).await?;
    Ok(ApiOk::new(CheckEmailResponse { exists }))
}

/// Register with email and password.
///
/// Attaches a password to a pre-existing email-only record (one created by
/// an OTP request); conflicts only when the account already has a password.
///
/// POST /api/auth/signup
#[tracing::instrument(skip(state, body), fields(email = %body.email))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignupRequest>,
) -> AuthResult<(CookieJar, ApiOk<AuthResponse>)> {
    body.validate().map_err(AuthError::Validation)?;

    if let Some(existing) = db::find_user_by_email(&state.db, &body.email).await? {
        if existing.password_hash.is_some() {
            return Err(AuthError::Conflict("Email already registered".to_string()));
        }
    }

    let password_hash = hash_password(&body.password, state.config.hash_time_cost)?;
    let user = db::upsert_user_password(
        &state.db,
        &body.email,
        &username_from_email(&body.email),
        &password_hash,
    )
    .await?;

    let (access, refresh) = issue_tokens(&state.config, user.id)?;

    tracing::info!(user_id = %user.id, "User signed up");

    Ok((
        jar.add(refresh_cookie(refresh, &state.config)),
        ApiOk::new(AuthResponse {
            access_token: access,
        }),
    ))
}

/// Login with email and password.
///
/// POST /api/auth/login
#[tracing::instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AuthResult<(CookieJar, ApiOk<AuthResponse>)> {
    body.validate().map_err(AuthError::Validation)?;

    let user = db::find_user_by_email(&state.db, &body.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    // OTP-only accounts have no password to check.
    let password_hash = user
        .password_hash
        .as_deref()
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(&body.password, password_hash) {
        return Err(AuthError::InvalidCredentials);
    }

    let (access, refresh) = issue_tokens(&state.config, user.id)?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(refresh_cookie(refresh, &state.config)),
        ApiOk::new(AuthResponse {
            access_token: access,
        }),
    ))
}

/// Exchange the refresh cookie for a new access token, rotating the cookie.
///
/// Rotation re-issues a fresh refresh token for the same subject and
/// rotation id; the superseded token is not tracked server-side.
///
/// POST /api/auth/refresh
#[tracing::instrument(skip(state, jar))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AuthResult<(CookieJar, ApiOk<AuthResponse>)> {
    let cookie = jar.get(REFRESH_COOKIE).ok_or(AuthError::Unauthorized)?;

    let claims = verify_refresh_token(cookie.value(), &state.config.refresh_token_secret)?;

    let user_id: Uuid = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
    let token_id: Uuid = claims.token_id.parse().map_err(|_| AuthError::InvalidToken)?;

    let access = sign_access_token(
        user_id,
        None,
        None,
        &state.config.jwt_secret,
        state.config.jwt_access_expiry,
    )?;
    let rotated = sign_refresh_token(
        user_id,
        token_id,
        &state.config.refresh_token_secret,
        state.config.jwt_refresh_expiry,
    )?;

    tracing::debug!(user_id = %user_id, "Access token refreshed");

    Ok((
        jar.add(refresh_cookie(rotated, &state.config)),
        ApiOk::new(AuthResponse {
            access_token: access,
        }),
    ))
}

/// Clear the refresh cookie.
///
/// Idempotent: clearing an absent cookie is a no-op, not an error, and no
/// server-side token state exists to invalidate.
///
/// POST /api/auth/logout
pub async fn logout(jar: CookieJar) -> (CookieJar, ApiMessage) {
    let removal = Cookie::build((REFRESH_COOKIE, "")).path(REFRESH_COOKIE_PATH);
    (jar.remove(removal), ApiMessage::new("Logged out"))
}

/// Issue a one-time passcode for an email address.
///
/// Always success-shaped once the email is present: whether the account
/// exists is never revealed on this path. Creates a placeholder user for
/// unknown emails so the code has a row to live on. Delivery is owned by the
/// (excluded) mail collaborator.
///
/// POST /api/auth/otp/request
#[tracing::instrument(skip(state, body))]
pub async fn otp_request(
    State(state): State<AppState>,
    Json(body): Json<OtpRequestBody>,
) -> AuthResult<ApiMessage> {
    let email = body
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AuthError::UnprocessableEntity("Email required".to_string()))?;

    let code = otp::generate_code();
    let user = db::upsert_user_otp(
        &state.db,
        &email,
        &username_from_email(&email),
        &code,
        otp::expiry_from_now(),
    )
    .await?;

    tracing::info!(user_id = %user.id, "OTP issued");

    Ok(ApiMessage::new("OTP issued"))
}

/// Verify a one-time passcode and establish a session.
///
/// The code is single-use: cleared on success, left intact on failure so a
/// mistyped digit does not force a re-request.
///
/// POST /api/auth/otp/verify
#[tracing::instrument(skip(state, jar, body))]
pub async fn otp_verify(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<OtpVerifyBody>,
) -> AuthResult<(CookieJar, ApiOk<AuthResponse>)> {
    let (email, code) = match (body.email, body.otp) {
        (Some(email), Some(otp)) if !email.is_empty() && !otp.is_empty() => (email, otp),
        _ => {
            return Err(AuthError::UnprocessableEntity(
                "Email and OTP required".to_string(),
            ))
        }
    };

    let user = db::find_user_by_email(&state.db, &email)
        .await?
        .ok_or(AuthError::InvalidOtp)?;

    if !otp::code_matches(&user, &code, Utc::now()) {
        return Err(AuthError::InvalidOtp);
    }

    db::clear_user_otp(&state.db, user.id).await?;

    let (access, refresh) = issue_tokens(&state.config, user.id)?;

    tracing::info!(user_id = %user.id, "User logged in via OTP");

    Ok((
        jar.add(refresh_cookie(refresh, &state.config)),
        ApiOk::new(AuthResponse {
            access_token: access,
        }),
    ))
}
