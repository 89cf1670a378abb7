//! Organization and Membership Handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiOk, AppState};
use crate::auth::{AuthError, AuthResult, AuthUser};
use crate::db::{self, Membership, MemberRow, Organization, OrgRole};

#[derive(Debug, Deserialize)]
pub struct CreateOrgRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: Option<String>,
    /// Deserialization failure on an unknown role name is surfaced as 422
    /// before the handler runs.
    pub role: Option<OrgRole>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: Option<OrgRole>,
}

/// Create an organization. The creator receives the sole OWNER membership
/// in the same transaction as the organization row.
///
/// POST /api/orgs
#[tracing::instrument(skip(state, body))]
pub async fn create_org(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateOrgRequest>,
) -> AuthResult<ApiOk<Organization>> {
    let name = body
        .name
        .filter(|n| n.len() >= 2)
        .ok_or_else(|| AuthError::UnprocessableEntity("Invalid name".to_string()))?;

    let mut tx = state.db.begin().await?;
    let org = db::create_org_tx(&mut tx, &name, auth.id).await?;
    db::create_membership_tx(&mut tx, org.id, auth.id, OrgRole::Owner).await?;
    tx.commit().await?;

    tracing::info!(org_id = %org.id, owner_id = %auth.id, "Organization created");

    Ok(ApiOk::new(org))
}

/// List organizations the caller belongs to, newest first.
///
/// GET /api/orgs
#[tracing::instrument(skip(state))]
pub async fn list_orgs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AuthResult<ApiOk<Vec<Organization>>> {
    let orgs = db::list_orgs_for_user(&state.db, auth.id).await?;
    Ok(ApiOk::new(orgs))
}

/// Fetch one organization. Membership is enforced by the route's role gate.
///
/// GET /api/orgs/{id}
#[tracing::instrument(skip(state))]
pub async fn get_org(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> AuthResult<ApiOk<Organization>> {
    let org = db::find_org_by_id(&state.db, org_id)
        .await?
        .ok_or(AuthError::NotFound("Organization"))?;
    Ok(ApiOk::new(org))
}

/// List members with user summaries, oldest first.
///
/// GET /api/orgs/{id}/members
#[tracing::instrument(skip(state))]
pub async fn list_members(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
) -> AuthResult<ApiOk<Vec<MemberRow>>> {
    let members = db::list_members(&state.db, org_id).await?;
    Ok(ApiOk::new(members))
}

/// Add a member by email with an explicit role.
///
/// POST /api/orgs/{id}/members
#[tracing::instrument(skip(state, body))]
pub async fn add_member(
    State(state): State<AppState>,
    Path(org_id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> AuthResult<(StatusCode, ApiOk<Membership>)> {
    let email = body
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AuthError::UnprocessableEntity("Invalid email".to_string()))?;
    let role = body
        .role
        .ok_or_else(|| AuthError::UnprocessableEntity("Invalid role".to_string()))?;

    let user = db::find_user_by_email(&state.db, &email)
        .await?
        .ok_or(AuthError::NotFound("User"))?;

    if db::find_membership(&state.db, org_id, user.id).await?.is_some() {
        return Err(AuthError::Conflict("User already a member".to_string()));
    }

    let membership = db::create_membership(&state.db, org_id, user.id, role).await?;

    tracing::info!(org_id = %org_id, user_id = %user.id, role = ?role, "Member added");

    Ok((StatusCode::CREATED, ApiOk::new(membership)))
}

/// Change a member's role. The OWNER role is immutable through this path;
/// transferring ownership is out of scope.
///
/// PATCH /api/orgs/{id}/members/{memberId}
#[tracing::instrument(skip(state, body))]
pub async fn update_member_role(
    State(state): State<AppState>,
    Path((org_id, member_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateRoleRequest>,
) -> AuthResult<ApiOk<Membership>> {
    let role = body
        .role
        .ok_or_else(|| AuthError::UnprocessableEntity("Invalid role".to_string()))?;

    let target = db::find_membership_by_id(&state.db, member_id)
        .await?
        .filter(|m| m.organization_id == org_id)
        .ok_or(AuthError::NotFound("Membership"))?;

    if target.role == OrgRole::Owner {
        return Err(AuthError::Forbidden);
    }

    let updated = db::update_membership_role(&state.db, member_id, role).await?;

    tracing::info!(org_id = %org_id, membership_id = %member_id, role = ?role, "Role updated");

    Ok(ApiOk::new(updated))
}
