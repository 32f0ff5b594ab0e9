/// Session manager: the credential/session-token protocol core.
///
/// Orchestrates registration, login, refresh-token rotation, logout and
/// password changes over a `UserStore`. Free functions taking explicit store
/// and settings; no crypto hangs off the persisted record.
///
/// Per account exactly one refresh token is live at a time: login overwrites
/// it, refresh replaces it through a compare-and-set, logout clears it. A
/// refresh token is therefore single-use; presenting it again after a
/// successful rotation fails.

use uuid::Uuid;

use crate::auth::jwt::{issue_access_token, issue_refresh_token, verify_refresh_token};
use crate::auth::password::{hash_password, verify_password};
use crate::configuration::AuthSettings;
use crate::error::AppError;
use crate::users::{NewUser, UserStore, UserView};
use crate::validators::{is_valid_email, is_valid_full_name, is_valid_username};

/// Validated, normalized registration text fields.
///
/// Parsing happens before any side effect — the handler resolves media
/// references only after these checks pass, so a malformed request never
/// triggers an upload.
#[derive(Debug, Clone)]
pub struct RegisterFields {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl RegisterFields {
    pub fn parse(
        full_name: &str,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, AppError> {
        if password.trim().is_empty() {
            return Err(AppError::BadRequest("password is required".to_string()));
        }

        Ok(Self {
            full_name: is_valid_full_name(full_name)?,
            email: is_valid_email(email)?,
            username: is_valid_username(username)?,
            password: password.to_string(),
        })
    }
}

/// Registration data after the media collaborator resolved file references
/// into stable URLs.
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub fields: RegisterFields,
    pub avatar_url: String,
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserView,
    pub tokens: TokenPair,
}

/// Create an account. The password is hashed before it ever reaches the
/// store; uniqueness violations surface as Conflict from the store itself.
pub async fn register<S: UserStore>(
    store: &S,
    auth: &AuthSettings,
    input: RegisterInput,
) -> Result<UserView, AppError> {
    if input.avatar_url.trim().is_empty() {
        return Err(AppError::BadRequest("Avatar file is required".to_string()));
    }

    let password_hash = hash_password(&input.fields.password, auth.bcrypt_cost)?;

    let user = store
        .insert(NewUser {
            username: input.fields.username,
            email: input.fields.email,
            full_name: input.fields.full_name,
            avatar: input.avatar_url,
            cover_image: input.cover_image_url.filter(|c| !c.trim().is_empty()),
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(UserView::from(&user))
}

/// Verify credentials and open a session.
///
/// Overwriting the stored refresh token is the rotation point: it implicitly
/// invalidates the refresh token of any previous, still-open session.
pub async fn login<S: UserStore>(
    store: &S,
    auth: &AuthSettings,
    identifier: &str,
    password: &str,
) -> Result<LoginOutcome, AppError> {
    if identifier.trim().is_empty() {
        return Err(AppError::BadRequest(
            "username or email is required".to_string(),
        ));
    }

    let user = store
        .find_by_username_or_email(identifier)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    if !verify_password(password, &user.password_hash) {
        return Err(AppError::Unauthorized("Invalid user credentials".to_string()));
    }

    let access_token = issue_access_token(&user, auth)?;
    let refresh_token = issue_refresh_token(user.id, auth)?;

    store
        .set_refresh_token(user.id, Some(&refresh_token))
        .await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(LoginOutcome {
        user: UserView::from(&user),
        tokens: TokenPair {
            access_token,
            refresh_token,
        },
    })
}

/// Rotate the token pair.
///
/// A presented refresh token is honored only when it verifies
/// cryptographically, has not expired (checked by verification, before any
/// storage comparison) and byte-matches the single stored token. The final
/// compare-and-set closes the race between two refreshes presenting the same
/// token: the loser's token no longer matches after the winner's write.
pub async fn refresh<S: UserStore>(
    store: &S,
    auth: &AuthSettings,
    presented: Option<&str>,
) -> Result<TokenPair, AppError> {
    let presented = presented
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".to_string()))?;

    let claims = verify_refresh_token(presented, auth)?;
    let user_id = claims.user_id()?;

    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

    if user.refresh_token.as_deref() != Some(presented) {
        tracing::warn!(user_id = %user.id, "Presented refresh token does not match stored token");
        return Err(AppError::Unauthorized(
            "Refresh token is expired or invalid".to_string(),
        ));
    }

    let access_token = issue_access_token(&user, auth)?;
    let refresh_token = issue_refresh_token(user.id, auth)?;

    let rotated = store
        .swap_refresh_token(user.id, presented, &refresh_token)
        .await?;
    if !rotated {
        // Lost the race against a concurrent rotation or logout.
        tracing::warn!(user_id = %user.id, "Refresh token rotation lost to concurrent write");
        return Err(AppError::Unauthorized(
            "Refresh token is expired or invalid".to_string(),
        ));
    }

    tracing::info!(user_id = %user.id, "Refresh token rotated");

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Close the session. Idempotent: clearing an already-empty token is fine.
pub async fn logout<S: UserStore>(store: &S, user_id: Uuid) -> Result<(), AppError> {
    store.set_refresh_token(user_id, None).await?;
    tracing::info!(user_id = %user_id, "User logged out");
    Ok(())
}

/// Overwrite the account's avatar with a freshly resolved media URL.
pub async fn update_avatar<S: UserStore>(
    store: &S,
    user_id: Uuid,
    avatar_url: &str,
) -> Result<UserView, AppError> {
    if avatar_url.trim().is_empty() {
        return Err(AppError::BadRequest("Avatar file is required".to_string()));
    }

    let user = store.set_avatar(user_id, avatar_url).await?;

    tracing::info!(user_id = %user_id, "Avatar updated");
    Ok(UserView::from(&user))
}

/// Overwrite the account's cover image with a freshly resolved media URL.
pub async fn update_cover_image<S: UserStore>(
    store: &S,
    user_id: Uuid,
    cover_image_url: &str,
) -> Result<UserView, AppError> {
    if cover_image_url.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Cover image file is required".to_string(),
        ));
    }

    let user = store.set_cover_image(user_id, cover_image_url).await?;

    tracing::info!(user_id = %user_id, "Cover image updated");
    Ok(UserView::from(&user))
}

/// Replace the password after re-verifying the current one. The refresh
/// token is left untouched; the open session stays valid.
pub async fn change_password<S: UserStore>(
    store: &S,
    auth: &AuthSettings,
    user_id: Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    if new_password.trim().is_empty() {
        return Err(AppError::BadRequest("new password is required".to_string()));
    }

    let user = store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid access token".to_string()))?;

    if !verify_password(old_password, &user.password_hash) {
        return Err(AppError::Unauthorized(
            "Invalid current password".to_string(),
        ));
    }

    let password_hash = hash_password(new_password, auth.bcrypt_cost)?;
    store.set_password_hash(user_id, &password_hash).await?;

    tracing::info!(user_id = %user_id, "Password changed");
    Ok(())
}
