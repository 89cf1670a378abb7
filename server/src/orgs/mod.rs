//! Organizations
//!
//! The membership surface that anchors every role check: organizations,
//! memberships, and single-use invites.

mod handlers;
mod invites;

use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::Router;

use crate::api::AppState;
use crate::auth::require_org_role;
use crate::db::OrgRole;

/// Any current member may read the organization.
const ANY_MEMBER: &[OrgRole] = &[OrgRole::Owner, OrgRole::Admin, OrgRole::Member];

/// Managing members and invites takes OWNER or ADMIN.
const MANAGERS: &[OrgRole] = &[OrgRole::Owner, OrgRole::Admin];

/// Create organizations router.
///
/// - POST / - Create an organization (caller becomes OWNER)
/// - GET / - List my organizations
/// - GET /{id} - Fetch one organization (member)
/// - GET /{id}/members - List members (member)
/// - POST /{id}/members - Add a member by email (OWNER/ADMIN)
/// - PATCH /{id}/members/{memberId} - Change a member's role (OWNER/ADMIN)
/// - POST /{id}/invites - Create an invite (OWNER/ADMIN)
pub fn router(state: AppState) -> Router<AppState> {
    let manager_gate = from_fn_with_state(state.clone(), require_org_role(MANAGERS));

    // Org-scoped routes behind the member gate. Routes that additionally
    // require management rights wrap their handler in the manager gate, so a
    // plain member passes the outer layer and stops at the inner one.
    let scoped = Router::new()
        .route("/{id}", get(handlers::get_org))
        .route(
            "/{id}/members",
            get(handlers::list_members)
                .post(handlers::add_member.layer(manager_gate.clone())),
        )
        .route(
            "/{id}/members/{memberId}",
            patch(handlers::update_member_role.layer(manager_gate.clone())),
        )
        .route(
            "/{id}/invites",
            post(invites::create_invite.layer(manager_gate)),
        )
        .layer(from_fn_with_state(state, require_org_role(ANY_MEMBER)));

    Router::new()
        .route("/", post(handlers::create_org).get(handlers::list_orgs))
        .merge(scoped)
}

/// Create invites router (mounted at /api/invites).
///
/// - POST /accept - Accept an invite by token
pub fn invite_router() -> Router<AppState> {
    Router::new().route("/accept", post(invites::accept_invite))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_members_cannot_manage() {
        assert!(MANAGERS.contains(&OrgRole::Owner));
        assert!(MANAGERS.contains(&OrgRole::Admin));
        assert!(!MANAGERS.contains(&OrgRole::Member));
    }

    #[test]
    fn every_role_can_read() {
        for role in [OrgRole::Owner, OrgRole::Admin, OrgRole::Member] {
            assert!(ANY_MEMBER.contains(&role));
        }
    }
}
