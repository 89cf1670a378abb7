//! Authentication Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Authentication and authorization error taxonomy.
///
/// Credential failures deliberately share generic messages so responses do
/// not leak which part of the check failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed request fields; carries field-level detail.
    #[error("Invalid payload")]
    Validation(validator::ValidationErrors),

    /// Missing or semantically unusable field (422).
    #[error("{0}")]
    UnprocessableEntity(String),

    /// Wrong email/password combination, absent user, or passwordless account.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, mismatched, or expired one-time passcode.
    #[error("Invalid OTP")]
    InvalidOtp,

    /// Signature or shape failure on either token class.
    #[error("Invalid token")]
    InvalidToken,

    /// Expiry failure; surfaced identically to `InvalidToken`.
    #[error("Invalid token")]
    TokenExpired,

    /// Missing/malformed Authorization header or absent refresh cookie.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed to act on the target organization.
    #[error("Forbidden")]
    Forbidden,

    /// Duplicate signup, membership, or similar uniqueness clash.
    #[error("{0}")]
    Conflict(String),

    /// Consumed or expired single-use resource (invite).
    #[error("{0}")]
    Gone(String),

    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Password hashing failure.
    #[error("Internal server error")]
    PasswordHash,

    /// Database error; detail is logged, never returned.
    #[error("Internal server error")]
    Database(#[from] sqlx::Error),

    /// Unexpected internal fault.
    #[error("Internal server error")]
    Internal(String),
}

/// JSON error envelope: `{status: "error", message, errors?}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl AuthError {
    const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials
            | Self::InvalidOtp
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Gone(_) => StatusCode::GONE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PasswordHash | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %inner_detail(&self), "Request failed");
        }

        let errors = match &self {
            Self::Validation(e) => serde_json::to_value(e).ok(),
            _ => None,
        };

        let body = Json(ErrorBody {
            status: "error",
            message: self.to_string(),
            errors,
        });

        (status, body).into_response()
    }
}

/// Internal detail for logging; the response body only ever carries the
/// generic message.
fn inner_detail(err: &AuthError) -> String {
    match err {
        AuthError::Database(e) => e.to_string(),
        AuthError::Internal(msg) => msg.clone(),
        AuthError::PasswordHash => "password hashing failed".to_string(),
        other => other.to_string(),
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_map_to_401() {
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InvalidOtp.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::TokenExpired.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn expired_and_invalid_tokens_share_a_message() {
        assert_eq!(
            AuthError::InvalidToken.to_string(),
            AuthError::TokenExpired.to_string()
        );
    }

    #[test]
    fn internal_errors_never_leak_detail() {
        let err = AuthError::Internal("secret detail".to_string());
        assert_eq!(err.to_string(), "Internal server error");
    }
}
