/// JWT claim payloads for the two token kinds.
///
/// Access tokens carry denormalized identity claims so handlers can display
/// the user without a lookup. Refresh tokens carry the subject id and nothing
/// else, to minimize blast radius if one leaks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::users::User;

/// Claims embedded in access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl AccessClaims {
    pub fn new(user: &User, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            iat: now,
            exp: now + expiry_seconds,
            iss: issuer,
        }
    }

    /// # Errors
    /// Returns error if the subject is not a valid UUID.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid access token".to_string()))
    }
}

/// Claims embedded in refresh tokens: the subject id plus a random `jti`.
/// The nonce makes every minted token unique, so rotation always produces a
/// byte-distinct token even within the same second. No identity claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    /// Random token id; guarantees uniqueness across rotations.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl RefreshClaims {
    pub fn new(user_id: Uuid, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + expiry_seconds,
            iss: issuer,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".to_string()))
    }
}
