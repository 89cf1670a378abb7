//! Authentication and Authorization Middleware
//!
//! Two composable layers: identity (Bearer token verification) and role
//! gating (current-membership lookup against an allow-list).

use std::future::Future;
use std::pin::Pin;

use axum::{
    extract::{RawPathParams, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::db::{self, OrgRole};

use super::error::AuthError;
use super::jwt::verify_access_token;

/// Verified identity injected into request extensions.
///
/// Populated entirely from the access token claims; no database lookup
/// happens at this layer.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User ID.
    pub id: Uuid,
    /// Organization context embedded in the token, when present.
    pub org_id: Option<Uuid>,
    /// Role claims embedded in the token, when present. Informational only;
    /// role gates never trust these.
    pub roles: Option<Vec<String>>,
}

/// Middleware to require authentication.
///
/// Extracts the Bearer token from the Authorization header, verifies it,
/// and injects [`AuthUser`] into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::Unauthorized)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Unauthorized)?;

    let claims = verify_access_token(token, &state.config.jwt_secret)?;

    let user_id: Uuid = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
    let org_id = match claims.org_id {
        Some(raw) => Some(raw.parse().map_err(|_| AuthError::InvalidToken)?),
        None => None,
    };

    request.extensions_mut().insert(AuthUser {
        id: user_id,
        org_id,
        roles: claims.roles,
    });

    Ok(next.run(request).await)
}

/// Extractor for the authenticated user in handlers.
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }
}

/// Middleware factory requiring membership in the target organization with a
/// role from `allowed`.
///
/// The organization id is resolved from either the `orgId` or `id` path
/// parameter, supporting both `/orgs/{id}/...` and `/orgs/{orgId}/...`
/// nesting conventions. Membership is re-queried on every request rather
/// than trusted from token claims: a demotion must take effect within the
/// token's remaining lifetime.
///
/// # Usage
///
/// ```ignore
/// Router::new()
///     .route("/{id}/members", post(add_member))
///     .layer(from_fn_with_state(
///         state.clone(),
///         require_org_role(&[OrgRole::Owner, OrgRole::Admin]),
///     ))
/// ```
/// Allow-list decision applied by the role gate.
fn role_allowed(allowed: &[OrgRole], role: OrgRole) -> bool {
    allowed.contains(&role)
}

pub fn require_org_role(
    allowed: &'static [OrgRole],
) -> impl Fn(
    State<AppState>,
    RawPathParams,
    Request,
    Next,
) -> Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>
       + Clone
       + Send
       + 'static {
    move |State(state), params, request, next| {
        Box::pin(async move {
            // Prefer the explicit `orgId` convention, fall back to `id`.
            let raw_org = params
                .iter()
                .find(|(name, _)| *name == "orgId")
                .or_else(|| params.iter().find(|(name, _)| *name == "id"))
                .map(|(_, value)| value);

            let org_id: Uuid = raw_org
                .and_then(|v| v.parse().ok())
                .ok_or(AuthError::Forbidden)?;

            let user = request
                .extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or(AuthError::Forbidden)?;

            let membership = db::find_membership(&state.db, org_id, user.id)
                .await?
                .ok_or(AuthError::Forbidden)?;

            if !role_allowed(allowed, membership.role) {
                tracing::debug!(
                    user_id = %user.id,
                    org_id = %org_id,
                    role = ?membership.role,
                    "Role gate rejected request"
                );
                return Err(AuthError::Forbidden);
            }

            Ok(next.run(request).await)
        })
    }
}
