//! Protocol-core tests for the session manager: registration, login,
//! refresh-token rotation, logout and password changes, driven through an
//! in-memory `UserStore` implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use videotube::auth::session::{self, RegisterFields, RegisterInput};
use videotube::auth::{verify_password, verify_refresh_token};
use videotube::configuration::AuthSettings;
use videotube::error::AppError;
use videotube::users::{NewUser, User, UserStore};

/// In-memory credential store. The single mutex gives the same atomicity
/// guarantee per account that the Postgres store gets from single-statement
/// updates.
#[derive(Default)]
struct InMemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryStore {
    fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }
}

impl UserStore for InMemoryStore {
    async fn insert(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();

        let taken = users
            .values()
            .any(|u| u.username == new_user.username || u.email == new_user.email);
        if taken {
            return Err(AppError::Conflict(
                "User with this username or email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            full_name: new_user.full_name,
            avatar: new_user.avatar,
            cover_image: new_user.cover_image,
            password_hash: new_user.password_hash,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> Result<Option<User>, AppError> {
        let identifier = identifier.trim().to_lowercase();
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|u| u.username == identifier || u.email == identifier)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.get(id))
    }

    async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&id) {
            user.refresh_token = token.map(|t| t.to_string());
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        current: &str,
        next: &str,
    ) -> Result<bool, AppError> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(&id) {
            Some(user) if user.refresh_token.as_deref() == Some(current) => {
                user.refresh_token = Some(next.to_string());
                user.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.get_mut(&id) {
            user.password_hash = password_hash.to_string();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_avatar(&self, id: Uuid, avatar: &str) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;
        user.avatar = avatar.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_cover_image(&self, id: Uuid, cover_image: &str) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;
        user.cover_image = Some(cover_image.to_string());
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;
        if let Some(full_name) = full_name {
            user.full_name = full_name.to_string();
        }
        if let Some(email) = email {
            user.email = email.to_string();
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

fn test_auth_settings() -> AuthSettings {
    AuthSettings {
        access_token_secret: "access-secret-for-tests-32-characters!!".to_string(),
        access_token_expiry: 900,
        refresh_token_secret: "refresh-secret-for-tests-32-characters!".to_string(),
        refresh_token_expiry: 864000,
        // Minimum bcrypt cost keeps the suite fast.
        bcrypt_cost: 4,
        issuer: "videotube-test".to_string(),
    }
}

fn register_input(username: &str, email: &str, password: &str) -> RegisterInput {
    RegisterInput {
        fields: RegisterFields::parse("Ana Example", email, username, password)
            .expect("Test fields failed validation"),
        avatar_url: "https://media.example/avatar.png".to_string(),
        cover_image_url: None,
    }
}

fn assert_unauthorized<T: std::fmt::Debug>(result: Result<T, AppError>) {
    match result {
        Err(AppError::Unauthorized(_)) => (),
        other => panic!("Expected Unauthorized, got {:?}", other),
    }
}

// --- Registration ---

#[tokio::test]
async fn register_stores_hash_not_plaintext() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");

    let user = store.get(view.id).expect("User not persisted");
    assert_ne!(user.password_hash, "p1");
    assert!(verify_password("p1", &user.password_hash));
    assert!(user.refresh_token.is_none());
}

#[tokio::test]
async fn register_duplicate_username_is_conflict() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("First registration failed");

    let result =
        session::register(&store, &auth, register_input("ana", "other@x.com", "p2")).await;
    match result {
        Err(AppError::Conflict(_)) => (),
        other => panic!("Expected Conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn register_duplicate_email_is_conflict() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("First registration failed");

    let result = session::register(&store, &auth, register_input("bob", "ana@x.com", "p2")).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[test]
fn register_fields_reject_blank_or_invalid_input() {
    // Field validation is a pure parse step; nothing (store, media) is
    // touched before it passes.
    for (full_name, email, username, password) in [
        ("Ana Example", "ana@x.com", "ana", "  "),
        ("Ana Example", "ana@x.com", "   ", "p1"),
        ("   ", "ana@x.com", "ana", "p1"),
        ("Ana Example", "not-an-email", "ana", "p1"),
    ] {
        let result = RegisterFields::parse(full_name, email, username, password);
        assert!(
            matches!(result, Err(AppError::BadRequest(_))),
            "expected BadRequest for {:?}",
            (full_name, email, username, password)
        );
    }
}

#[tokio::test]
async fn register_rejects_blank_avatar() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let mut input = register_input("ana", "ana@x.com", "p1");
    input.avatar_url = "".to_string();
    assert!(matches!(
        session::register(&store, &auth, input).await,
        Err(AppError::BadRequest(_))
    ));
}

#[tokio::test]
async fn register_normalizes_username_and_email() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("Ana", "Ana@X.com", "p1"))
        .await
        .expect("Registration failed");

    assert_eq!(view.username, "ana");
    assert_eq!(view.email, "ana@x.com");
}

// --- Login ---

#[tokio::test]
async fn login_issues_pair_and_persists_refresh_token() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");

    let outcome = session::login(&store, &auth, "ana", "p1")
        .await
        .expect("Login failed");

    let stored = store.get(view.id).unwrap().refresh_token;
    assert_eq!(stored.as_deref(), Some(outcome.tokens.refresh_token.as_str()));

    let claims = verify_refresh_token(&outcome.tokens.refresh_token, &auth)
        .expect("Issued refresh token does not verify");
    assert_eq!(claims.user_id().unwrap(), view.id);
}

#[tokio::test]
async fn login_by_email_works() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");

    assert!(session::login(&store, &auth, "ana@x.com", "p1").await.is_ok());
}

#[tokio::test]
async fn login_wrong_password_is_unauthorized() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");

    assert_unauthorized(session::login(&store, &auth, "ana", "wrong").await);
}

#[tokio::test]
async fn login_unknown_user_is_not_found() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let result = session::login(&store, &auth, "ghost", "p1").await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn second_login_invalidates_previous_refresh_token() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");

    let first = session::login(&store, &auth, "ana", "p1").await.unwrap();
    let _second = session::login(&store, &auth, "ana", "p1").await.unwrap();

    // Single active session: the overwrite on login is a rotation point.
    assert_unauthorized(
        session::refresh(&store, &auth, Some(&first.tokens.refresh_token)).await,
    );
}

// --- Refresh rotation ---

#[tokio::test]
async fn refresh_rotates_and_old_token_becomes_unusable() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");
    let outcome = session::login(&store, &auth, "ana", "p1").await.unwrap();
    let old_token = outcome.tokens.refresh_token;

    let rotated = session::refresh(&store, &auth, Some(&old_token))
        .await
        .expect("Refresh failed");

    assert_ne!(rotated.refresh_token, old_token);
    let stored = store.get(view.id).unwrap().refresh_token;
    assert_eq!(stored.as_deref(), Some(rotated.refresh_token.as_str()));

    // The old token byte-differs from storage now; replay must fail.
    assert_unauthorized(session::refresh(&store, &auth, Some(&old_token)).await);

    // The rotated token is still good.
    assert!(session::refresh(&store, &auth, Some(&rotated.refresh_token))
        .await
        .is_ok());
}

#[tokio::test]
async fn refresh_without_token_is_unauthorized() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    assert_unauthorized(session::refresh(&store, &auth, None).await);
    assert_unauthorized(session::refresh(&store, &auth, Some("")).await);
}

#[tokio::test]
async fn refresh_with_garbage_token_is_unauthorized() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    assert_unauthorized(session::refresh(&store, &auth, Some("not.a.jwt")).await);
}

#[tokio::test]
async fn refresh_with_expired_token_fails_even_if_it_matches_storage() {
    let store = InMemoryStore::default();
    let mut auth = test_auth_settings();
    // Issue refresh tokens that are already past the validator's leeway.
    auth.refresh_token_expiry = -120;

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");
    let outcome = session::login(&store, &auth, "ana", "p1").await.unwrap();

    // The expired token is exactly what storage holds.
    let stored = store.get(view.id).unwrap().refresh_token;
    assert_eq!(stored.as_deref(), Some(outcome.tokens.refresh_token.as_str()));

    assert_unauthorized(
        session::refresh(&store, &auth, Some(&outcome.tokens.refresh_token)).await,
    );
}

#[tokio::test]
async fn concurrent_refresh_with_same_token_has_exactly_one_winner() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");
    let outcome = session::login(&store, &auth, "ana", "p1").await.unwrap();
    let token = outcome.tokens.refresh_token;

    let (a, b) = tokio::join!(
        session::refresh(&store, &auth, Some(&token)),
        session::refresh(&store, &auth, Some(&token)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1, "exactly one concurrent refresh may win");

    let loser = if a.is_ok() { b } else { a };
    assert_unauthorized(loser);
}

// --- Logout ---

#[tokio::test]
async fn logout_clears_token_and_is_idempotent() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");
    let outcome = session::login(&store, &auth, "ana", "p1").await.unwrap();

    session::logout(&store, view.id).await.expect("Logout failed");
    assert!(store.get(view.id).unwrap().refresh_token.is_none());

    // Second logout still succeeds and leaves the same end state.
    session::logout(&store, view.id)
        .await
        .expect("Second logout failed");
    assert!(store.get(view.id).unwrap().refresh_token.is_none());

    // The cleared token cannot be replayed.
    assert_unauthorized(
        session::refresh(&store, &auth, Some(&outcome.tokens.refresh_token)).await,
    );
}

// --- Password changes ---

#[tokio::test]
async fn change_password_requires_current_password() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");

    assert_unauthorized(session::change_password(&store, &auth, view.id, "wrong", "p2").await);

    session::change_password(&store, &auth, view.id, "p1", "p2")
        .await
        .expect("Password change failed");

    assert_unauthorized(session::login(&store, &auth, "ana", "p1").await);
    assert!(session::login(&store, &auth, "ana", "p2").await.is_ok());
}

#[tokio::test]
async fn change_password_leaves_refresh_token_untouched() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");
    let outcome = session::login(&store, &auth, "ana", "p1").await.unwrap();

    session::change_password(&store, &auth, view.id, "p1", "p2")
        .await
        .expect("Password change failed");

    let stored = store.get(view.id).unwrap().refresh_token;
    assert_eq!(stored.as_deref(), Some(outcome.tokens.refresh_token.as_str()));
    assert!(session::refresh(&store, &auth, Some(&outcome.tokens.refresh_token))
        .await
        .is_ok());
}

// --- Media updates ---

#[tokio::test]
async fn update_avatar_overwrites_only_the_avatar() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");
    let before = store.get(view.id).unwrap();

    let updated = session::update_avatar(&store, view.id, "https://media.example/new.png")
        .await
        .expect("Avatar update failed");

    assert_eq!(updated.avatar, "https://media.example/new.png");

    let after = store.get(view.id).unwrap();
    assert_eq!(after.avatar, "https://media.example/new.png");
    assert_eq!(after.username, before.username);
    assert_eq!(after.password_hash, before.password_hash);
    assert_eq!(after.cover_image, before.cover_image);
}

#[tokio::test]
async fn update_avatar_rejects_blank_url() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");

    assert!(matches!(
        session::update_avatar(&store, view.id, "   ").await,
        Err(AppError::BadRequest(_))
    ));
    // The stored avatar is untouched.
    assert_eq!(
        store.get(view.id).unwrap().avatar,
        "https://media.example/avatar.png"
    );
}

#[tokio::test]
async fn update_cover_image_sets_the_cover() {
    let store = InMemoryStore::default();
    let auth = test_auth_settings();

    let view = session::register(&store, &auth, register_input("ana", "ana@x.com", "p1"))
        .await
        .expect("Registration failed");
    assert!(store.get(view.id).unwrap().cover_image.is_none());

    let updated = session::update_cover_image(&store, view.id, "https://media.example/cover.png")
        .await
        .expect("Cover image update failed");

    assert_eq!(
        updated.cover_image.as_deref(),
        Some("https://media.example/cover.png")
    );
    assert_eq!(
        store.get(view.id).unwrap().cover_image.as_deref(),
        Some("https://media.example/cover.png")
    );
}

#[tokio::test]
async fn update_avatar_for_missing_account_is_not_found() {
    let store = InMemoryStore::default();

    assert!(matches!(
        session::update_avatar(&store, Uuid::new_v4(), "https://media.example/new.png").await,
        Err(AppError::NotFound(_))
    ));
}
