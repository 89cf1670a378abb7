//! Database Queries
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::error;
use uuid::Uuid;

use super::models::{Invite, Membership, Organization, OrgRole, User};

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

// ============================================================================
// User Queries
// ============================================================================

/// Find user by ID.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_id", user_id = %id))
}

/// Find user by email.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_user_by_email", email = %email))
}

/// Check if an email has an account.
pub async fn email_exists(pool: &PgPool, email: &str) -> sqlx::Result<bool> {
    let result: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await
        .map_err(db_error!("email_exists", email = %email))?;
    Ok(result.0)
}

/// Create a user with a password hash, or attach the hash to a pre-existing
/// email-only record (one created by an OTP request).
pub async fn upsert_user_password(
    pool: &PgPool,
    email: &str,
    username: &str,
    password_hash: &str,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (email, username, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
        SET password_hash = EXCLUDED.password_hash, updated_at = NOW()
        RETURNING *
        ",
    )
    .bind(email)
    .bind(username)
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(db_error!("upsert_user_password", email = %email))
}

/// Set a fresh OTP on the user record, creating a placeholder user when the
/// email is unknown. Any previously issued code is superseded.
pub async fn upsert_user_otp(
    pool: &PgPool,
    email: &str,
    username: &str,
    otp: &str,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        r"
        INSERT INTO users (email, username, otp_value, otp_expires_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET otp_value = EXCLUDED.otp_value,
            otp_expires_at = EXCLUDED.otp_expires_at,
            updated_at = NOW()
        RETURNING *
        ",
    )
    .bind(email)
    .bind(username)
    .bind(otp)
    .bind(expires_at)
    .fetch_one(pool)
    .await
    .map_err(db_error!("upsert_user_otp", email = %email))
}

/// Clear the OTP fields after a successful verification (single use).
pub async fn clear_user_otp(pool: &PgPool, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE users SET otp_value = NULL, otp_expires_at = NULL, updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(db_error!("clear_user_otp", user_id = %user_id))?;
    Ok(())
}

/// Update the user's username.
pub async fn update_username(pool: &PgPool, user_id: Uuid, username: &str) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET username = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(user_id)
    .bind(username)
    .fetch_one(pool)
    .await
    .map_err(db_error!("update_username", user_id = %user_id))
}

// ============================================================================
// Organization Queries
// ============================================================================

/// Find organization by ID.
pub async fn find_org_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Organization>> {
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_org_by_id", org_id = %id))
}

/// List organizations the user is a member of, newest first.
pub async fn list_orgs_for_user(pool: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Organization>> {
    sqlx::query_as::<_, Organization>(
        r"
        SELECT o.* FROM organizations o
        INNER JOIN memberships m ON m.organization_id = o.id
        WHERE m.user_id = $1
        ORDER BY o.created_at DESC
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(db_error!("list_orgs_for_user", user_id = %user_id))
}

// ============================================================================
// Membership Queries
// ============================================================================

/// Find the membership for a (organization, user) pair.
pub async fn find_membership(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
) -> sqlx::Result<Option<Membership>> {
    sqlx::query_as::<_, Membership>(
        "SELECT * FROM memberships WHERE organization_id = $1 AND user_id = $2",
    )
    .bind(organization_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("find_membership", org_id = %organization_id, user_id = %user_id))
}

/// Find a membership row by its own ID.
pub async fn find_membership_by_id(pool: &PgPool, id: Uuid) -> sqlx::Result<Option<Membership>> {
    sqlx::query_as::<_, Membership>("SELECT * FROM memberships WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_membership_by_id", membership_id = %id))
}

/// Create a membership.
pub async fn create_membership(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
    role: OrgRole,
) -> sqlx::Result<Membership> {
    sqlx::query_as::<_, Membership>(
        r"
        INSERT INTO memberships (organization_id, user_id, role)
        VALUES ($1, $2, $3)
        RETURNING *
        ",
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(pool)
    .await
    .map_err(db_error!("create_membership", org_id = %organization_id, user_id = %user_id))
}

/// Update a membership's role.
pub async fn update_membership_role(
    pool: &PgPool,
    id: Uuid,
    role: OrgRole,
) -> sqlx::Result<Membership> {
    sqlx::query_as::<_, Membership>("UPDATE memberships SET role = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(role)
        .fetch_one(pool)
        .await
        .map_err(db_error!("update_membership_role", membership_id = %id))
}

/// Membership row joined with a user summary, for member listings.
#[derive(Debug, sqlx::FromRow, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: OrgRole,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// List memberships of an organization with user summaries, oldest first.
pub async fn list_members(pool: &PgPool, organization_id: Uuid) -> sqlx::Result<Vec<MemberRow>> {
    sqlx::query_as::<_, MemberRow>(
        r"
        SELECT m.id, m.organization_id, m.user_id, m.role,
               u.email, u.username, m.created_at
        FROM memberships m
        INNER JOIN users u ON u.id = m.user_id
        WHERE m.organization_id = $1
        ORDER BY m.created_at ASC
        ",
    )
    .bind(organization_id)
    .fetch_all(pool)
    .await
    .map_err(db_error!("list_members", org_id = %organization_id))
}

// ============================================================================
// Invite Queries
// ============================================================================

/// Find an invite by its token.
pub async fn find_invite_by_token(pool: &PgPool, token: &str) -> sqlx::Result<Option<Invite>> {
    sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE token = $1")
        .bind(token)
        .fetch_optional(pool)
        .await
        // The token itself is a secret; only the query name is logged.
        .map_err(db_error!("find_invite_by_token", table = "invites"))
}

/// Create an invite.
pub async fn create_invite(
    pool: &PgPool,
    organization_id: Uuid,
    token: &str,
    expires_at: DateTime<Utc>,
) -> sqlx::Result<Invite> {
    sqlx::query_as::<_, Invite>(
        r"
        INSERT INTO invites (organization_id, token, expires_at)
        VALUES ($1, $2, $3)
        RETURNING *
        ",
    )
    .bind(organization_id)
    .bind(token)
    .bind(expires_at)
    .fetch_one(pool)
    .await
    .map_err(db_error!("create_invite", org_id = %organization_id))
}

// ============================================================================
// Transactional variants (invite acceptance, organization creation)
// ============================================================================

/// Create a membership inside an open transaction.
pub async fn create_membership_tx(
    tx: &mut Transaction<'_, Postgres>,
    organization_id: Uuid,
    user_id: Uuid,
    role: OrgRole,
) -> sqlx::Result<Membership> {
    sqlx::query_as::<_, Membership>(
        r"
        INSERT INTO memberships (organization_id, user_id, role)
        VALUES ($1, $2, $3)
        RETURNING *
        ",
    )
    .bind(organization_id)
    .bind(user_id)
    .bind(role)
    .fetch_one(&mut **tx)
    .await
}

/// Stamp an invite used inside an open transaction. Guarded on `used_at IS
/// NULL` so two racing acceptances cannot both consume the invite.
pub async fn mark_invite_used_tx(
    tx: &mut Transaction<'_, Postgres>,
    invite_id: Uuid,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE invites SET used_at = NOW() WHERE id = $1 AND used_at IS NULL",
    )
    .bind(invite_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Create an organization inside an open transaction.
pub async fn create_org_tx(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    owner_id: Uuid,
) -> sqlx::Result<Organization> {
    sqlx::query_as::<_, Organization>(
        r"
        INSERT INTO organizations (name, owner_id)
        VALUES ($1, $2)
        RETURNING *
        ",
    )
    .bind(name)
    .bind(owner_id)
    .fetch_one(&mut **tx)
    .await
}
