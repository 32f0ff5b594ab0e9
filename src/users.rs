/// User model and credential store.
///
/// One row per account. `password_hash` only ever holds bcrypt output and
/// `refresh_token` holds the single currently-trusted refresh token (or
/// NULL) — the newest token always replaces the previous one, so no token
/// history accumulates.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account view safe to return to clients: no password hash, no refresh token.
#[derive(Debug, Clone, serde::Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            created_at: user.created_at,
        }
    }
}

/// Validated, normalized registration data. Username and email arrive
/// lowercased, the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password_hash: String,
}

/// Persistence seam for accounts.
///
/// All writes to `refresh_token` are single-statement and therefore atomic
/// per account; `swap_refresh_token` is the compare-and-set used by token
/// rotation so that of two racing refreshes at most one wins.
pub trait UserStore: Send + Sync + 'static {
    fn insert(&self, new_user: NewUser) -> impl Future<Output = Result<User, AppError>> + Send;

    fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    fn find_by_id(&self, id: Uuid) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    /// Overwrite (login) or clear (logout) the stored refresh token.
    fn set_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Replace the stored refresh token only if it still equals `current`.
    /// Returns false when the stored token no longer matches.
    fn swap_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn set_avatar(
        &self,
        id: Uuid,
        avatar: &str,
    ) -> impl Future<Output = Result<User, AppError>> + Send;

    fn set_cover_image(
        &self,
        id: Uuid,
        cover_image: &str,
    ) -> impl Future<Output = Result<User, AppError>> + Send;

    fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> impl Future<Output = Result<User, AppError>> + Send;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserStore for PgUserStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        let now = Utc::now();
        // Uniqueness of username/email is enforced by the UNIQUE constraints;
        // a violation surfaces as AppError::Conflict via From<sqlx::Error>.
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users
                (id, username, email, full_name, avatar, cover_image,
                 password_hash, refresh_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.full_name)
        .bind(&new_user.avatar)
        .bind(&new_user.cover_image)
        .bind(&new_user.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<User>, AppError> {
        let identifier = identifier.trim().to_lowercase();
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE username = $1 OR email = $1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET refresh_token = $1, updated_at = $2 WHERE id = $3")
            .bind(token)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError> {
        // Single-statement compare-and-set: the WHERE clause re-checks the
        // stored token, so a concurrent rotation makes this a no-op.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $1, updated_at = $2
            WHERE id = $3 AND refresh_token = $4
            "#,
        )
        .bind(next)
        .bind(Utc::now())
        .bind(id)
        .bind(current)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_avatar(&self, id: Uuid, avatar: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET avatar = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(avatar)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn set_cover_image(&self, id: Uuid, cover_image: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET cover_image = $1, updated_at = $2 WHERE id = $3 RETURNING *",
        )
        .bind(cover_image)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET full_name = COALESCE($1, full_name),
                email = COALESCE($2, email),
                updated_at = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(full_name)
        .bind(email)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
