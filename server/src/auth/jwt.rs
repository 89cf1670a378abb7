//! JWT Token Generation and Validation
//!
//! Two token classes signed with independent HS256 secrets: a short-lived
//! access token attached to every API call, and a long-lived refresh token
//! confined to the refresh-cookie path. Distinct secrets mean a compromised
//! access secret cannot forge refresh tokens and vice versa; distinct claim
//! shapes additionally reject a token presented as the wrong class.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{AuthError, AuthResult};

/// Access token claims: identity plus optional organization context.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject (user ID as UUID string).
    pub sub: String,
    /// Current organization context, when embedded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Optional role claims. Role-gated routes re-query current membership
    /// rather than trusting these; they exist for client-side display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
}

/// Refresh token claims: identity plus a rotation id.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    /// Subject (user ID as UUID string).
    pub sub: String,
    /// Rotation id carried across refreshes.
    pub token_id: String,
    /// Per-issuance nonce. `iat` has second granularity, so without this a
    /// rotation within the same second would re-emit the identical token.
    pub jti: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
}

fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation
}

fn map_decode_error(e: &jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    }
}

/// Sign an access token for the given identity.
pub fn sign_access_token(
    user_id: Uuid,
    org_id: Option<Uuid>,
    roles: Option<Vec<String>>,
    secret: &str,
    ttl_seconds: i64,
) -> AuthResult<String> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user_id.to_string(),
        org_id: org_id.map(|id| id.to_string()),
        roles,
        exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("Failed to sign access token: {e}")))
}

/// Validate and decode an access token.
///
/// Fails when the signature is invalid, the token is malformed or expired,
/// or the claims do not match the access shape.
pub fn verify_access_token(token: &str, secret: &str) -> AuthResult<AccessClaims> {
    let token_data = decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &strict_validation(),
    )
    .map_err(|e| map_decode_error(&e))?;

    Ok(token_data.claims)
}

/// Sign a refresh token carrying the rotation id.
pub fn sign_refresh_token(
    user_id: Uuid,
    token_id: Uuid,
    secret: &str,
    ttl_seconds: i64,
) -> AuthResult<String> {
    let now = Utc::now();
    let claims = RefreshClaims {
        sub: user_id.to_string(),
        token_id: token_id.to_string(),
        jti: Uuid::now_v7().to_string(),
        exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("Failed to sign refresh token: {e}")))
}

/// Validate and decode a refresh token.
///
/// Same failure contract as `verify_access_token`. A token lacking the
/// `tokenId` claim (e.g., an access token) is rejected as malformed.
pub fn verify_refresh_token(token: &str, secret: &str) -> AuthResult<RefreshClaims> {
    let token_data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &strict_validation(),
    )
    .map_err(|e| map_decode_error(&e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCESS_SECRET: &str = "test-access-secret";
    const REFRESH_SECRET: &str = "test-refresh-secret";

    #[test]
    fn access_token_round_trip() {
        let user_id = Uuid::now_v7();
        let org_id = Uuid::now_v7();

        let token = sign_access_token(
            user_id,
            Some(org_id),
            Some(vec!["ADMIN".to_string()]),
            ACCESS_SECRET,
            900,
        )
        .unwrap();
        let claims = verify_access_token(&token, ACCESS_SECRET).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.org_id.as_deref(), Some(org_id.to_string().as_str()));
        assert_eq!(claims.roles, Some(vec!["ADMIN".to_string()]));
    }

    #[test]
    fn refresh_token_round_trip() {
        let user_id = Uuid::now_v7();

        let token = sign_refresh_token(user_id, user_id, REFRESH_SECRET, 604800).unwrap();
        let claims = verify_refresh_token(&token, REFRESH_SECRET).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.token_id, user_id.to_string());
    }

    #[test]
    fn rotation_is_byte_different_even_within_one_second() {
        let user_id = Uuid::now_v7();

        let original = sign_refresh_token(user_id, user_id, REFRESH_SECRET, 604800).unwrap();
        let rotated = sign_refresh_token(user_id, user_id, REFRESH_SECRET, 604800).unwrap();

        assert_ne!(original, rotated);

        // Both still verify and carry the same rotation lineage.
        let a = verify_refresh_token(&original, REFRESH_SECRET).unwrap();
        let b = verify_refresh_token(&rotated, REFRESH_SECRET).unwrap();
        assert_eq!(a.token_id, b.token_id);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn tampered_token_fails() {
        let user_id = Uuid::now_v7();
        let token = sign_access_token(user_id, None, None, ACCESS_SECRET, 900).unwrap();

        // Flip one character of the signature segment
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert_ne!(token, tampered);

        assert!(verify_access_token(&tampered, ACCESS_SECRET).is_err());
    }

    #[test]
    fn expired_token_fails() {
        let user_id = Uuid::now_v7();
        let token = sign_access_token(user_id, None, None, ACCESS_SECRET, -1).unwrap();

        let err = verify_access_token(&token, ACCESS_SECRET).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn secrets_are_isolated() {
        let user_id = Uuid::now_v7();

        let access = sign_access_token(user_id, None, None, ACCESS_SECRET, 900).unwrap();
        let refresh = sign_refresh_token(user_id, user_id, REFRESH_SECRET, 604800).unwrap();

        // A token signed with one secret never verifies under the other.
        assert!(verify_access_token(&refresh, ACCESS_SECRET).is_err());
        assert!(verify_refresh_token(&access, REFRESH_SECRET).is_err());
    }

    #[test]
    fn access_token_rejected_as_refresh_even_with_same_secret() {
        // Claim-shape check: an access token has no tokenId claim.
        let user_id = Uuid::now_v7();
        let access = sign_access_token(user_id, None, None, ACCESS_SECRET, 900).unwrap();

        assert!(verify_refresh_token(&access, ACCESS_SECRET).is_err());
    }

    #[test]
    fn sub_only_access_token_omits_optional_claims() {
        let user_id = Uuid::now_v7();
        let token = sign_access_token(user_id, None, None, ACCESS_SECRET, 900).unwrap();
        let claims = verify_access_token(&token, ACCESS_SECRET).unwrap();

        assert!(claims.org_id.is_none());
        assert!(claims.roles.is_none());
    }
}
