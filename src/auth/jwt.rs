/// Token issuance and verification.
///
/// Access and refresh tokens are both HS256 JWTs but are signed with
/// independent secrets, so neither kind can be replayed as the other.
/// Verification failures are normalized to Unauthorized with a generic
/// message; the underlying cause (expired vs malformed vs bad signature) is
/// only distinguished in the logs.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::configuration::AuthSettings;
use crate::error::AppError;
use crate::users::User;

/// Mint a signed access token carrying the user's identity claims.
pub fn issue_access_token(user: &User, auth: &AuthSettings) -> Result<String, AppError> {
    let claims = AccessClaims::new(user, auth.access_token_expiry, auth.issuer.clone());

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.access_token_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Access token generation failed: {}", e)))
}

/// Mint a signed refresh token carrying the subject id only.
pub fn issue_refresh_token(user_id: Uuid, auth: &AuthSettings) -> Result<String, AppError> {
    let claims = RefreshClaims::new(user_id, auth.refresh_token_expiry, auth.issuer.clone());

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.refresh_token_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Refresh token generation failed: {}", e)))
}

/// Validate an access token's signature, expiry and issuer.
pub fn verify_access_token(token: &str, auth: &AuthSettings) -> Result<AccessClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&auth.issuer]);

    decode::<AccessClaims>(
        token,
        &DecodingKey::from_secret(auth.access_token_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("Access token validation error: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })
}

/// Validate a refresh token's signature, expiry and issuer.
///
/// Time-based expiry is enforced here, before any comparison against the
/// stored token: an expired token fails even if it still byte-matches
/// storage.
pub fn verify_refresh_token(token: &str, auth: &AuthSettings) -> Result<RefreshClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&auth.issuer]);

    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(auth.refresh_token_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("Refresh token validation error: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })
}
