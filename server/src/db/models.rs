//! Database Models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User model.
///
/// `password_hash` is null for accounts that have only ever authenticated via
/// OTP. A single OTP is active at a time; requesting a new one supersedes it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub otp_value: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organization model.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub settings: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Per-organization role.
///
/// Closed set: every permission gate is an allow-list over these three
/// variants, so the permission matrix stays auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "org_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrgRole {
    Owner,
    Admin,
    Member,
}

/// Membership join row: the role a user holds within one organization.
/// At most one membership exists per (organization, user) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Membership {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: OrgRole,
    pub created_at: DateTime<Utc>,
}

/// Single-use organization invite.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invite {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_role_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&OrgRole::Owner).unwrap(), "\"OWNER\"");
        assert_eq!(serde_json::to_string(&OrgRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(
            serde_json::to_string(&OrgRole::Member).unwrap(),
            "\"MEMBER\""
        );
    }

    #[test]
    fn org_role_deserializes_uppercase() {
        let role: OrgRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, OrgRole::Admin);
        assert!(serde_json::from_str::<OrgRole>("\"admin\"").is_err());
    }
}
