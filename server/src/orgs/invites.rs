//! Organization Invite Handlers

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::api::{ApiOk, AppState};
use crate::auth::{AuthError, AuthResult, AuthUser};
use crate::db::{self, Invite, Membership, OrgRole};

/// Invites expire a week after issuance.
const INVITE_TTL_DAYS: i64 = 7;

/// Generate a cryptographically random 32-character invite token.
fn generate_invite_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[derive(Debug, serde::Deserialize)]
pub struct AcceptInviteRequest {
    pub token: Option<String>,
}

/// Create a single-use invite for an organization.
///
/// POST /api/orgs/{id}/invites
#[tracing::instrument(skip(state))]
pub async fn create_invite(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> AuthResult<ApiOk<Invite>> {
    let token = generate_invite_token();
    let expires_at = Utc::now() + Duration::days(INVITE_TTL_DAYS);

    let invite = db::create_invite(&state.db, org_id, &token, expires_at).await?;

    tracing::info!(org_id = %org_id, invite_id = %invite.id, "Invite created");

    Ok(ApiOk::new(invite))
}

/// Accept an invite by token, joining as MEMBER.
///
/// Membership creation and the `used_at` stamp commit in one transaction,
/// with the stamp guarded on the invite being unused. Two racing
/// acceptances of the same token cannot both succeed.
///
/// POST /api/invites/accept
#[tracing::instrument(skip(state, body))]
pub async fn accept_invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AcceptInviteRequest>,
) -> AuthResult<ApiOk<Membership>> {
    let token = body
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::UnprocessableEntity("Invalid token".to_string()))?;

    let invite = db::find_invite_by_token(&state.db, &token)
        .await?
        .ok_or(AuthError::NotFound("Invite"))?;

    if invite.used_at.is_some() {
        return Err(AuthError::Gone("Invite already used".to_string()));
    }
    if invite.expires_at < Utc::now() {
        return Err(AuthError::Gone("Invite expired".to_string()));
    }

    if db::find_membership(&state.db, invite.organization_id, auth.id)
        .await?
        .is_some()
    {
        return Err(AuthError::Conflict("Already a member".to_string()));
    }

    let mut tx = state.db.begin().await?;
    let membership =
        db::create_membership_tx(&mut tx, invite.organization_id, auth.id, OrgRole::Member)
            .await?;
    let consumed = db::mark_invite_used_tx(&mut tx, invite.id).await?;
    if !consumed {
        tx.rollback().await?;
        return Err(AuthError::Gone("Invite already used".to_string()));
    }
    tx.commit().await?;

    tracing::info!(
        org_id = %invite.organization_id,
        user_id = %auth.id,
        "Invite accepted"
    );

    Ok(ApiOk::new(membership))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_tokens_are_long_and_charset_bound() {
        let token = generate_invite_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn invite_tokens_are_unique() {
        assert_ne!(generate_invite_token(), generate_invite_token());
    }
}
