//! User Profile Handlers

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::{ApiOk, AppState};
use crate::auth::{AuthError, AuthResult, AuthUser};
use crate::db::{self, User};

/// Public view of a user. Credential and OTP fields never leave the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeRequest {
    pub username: Option<String>,
}

/// Current user summary.
///
/// GET /api/users/me
#[tracing::instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AuthResult<ApiOk<UserSummary>> {
    let user = db::find_user_by_id(&state.db, auth.id)
        .await?
        .ok_or(AuthError::NotFound("User"))?;
    Ok(ApiOk::new(user.into()))
}

/// Update the caller's username.
///
/// PATCH /api/users/me
#[tracing::instrument(skip(state, body))]
pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateMeRequest>,
) -> AuthResult<ApiOk<UserSummary>> {
    let username = body
        .username
        .filter(|u| u.len() >= 2)
        .ok_or_else(|| AuthError::UnprocessableEntity("Invalid username".to_string()))?;

    let user = db::update_username(&state.db, auth.id, &username).await?;

    tracing::info!(user_id = %auth.id, "Username updated");

    Ok(ApiOk::new(user.into()))
}
