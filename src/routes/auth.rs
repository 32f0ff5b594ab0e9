/// Authentication Routes
///
/// Binds the HTTP transport to the session manager: JSON bodies in, token
/// cookies and sanitized account views out.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::session::{self, RegisterFields, RegisterInput};
use crate::auth::{SessionArtifacts, REFRESH_COOKIE};
use crate::configuration::AuthSettings;
use crate::error::AppError;
use crate::media_client::MediaClient;
use crate::middleware::CurrentUser;
use crate::users::{PgUserStore, UserStore, UserView};
use crate::validators::{is_valid_email, is_valid_full_name};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    /// Local file reference for the avatar; resolved through the media
    /// collaborator before the account is created.
    pub avatar: String,
    pub cover_image: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UpdateAccountRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar: String,
}

#[derive(Deserialize)]
pub struct UpdateCoverImageRequest {
    pub cover_image: String,
}

/// Login/refresh response body for non-cookie clients.
#[derive(Serialize)]
pub struct TokenResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserView>,
    pub access_token: String,
    pub refresh_token: String,
}

/// POST /auth/register
///
/// Creates an account. The avatar reference is mandatory and must resolve to
/// a media URL; the cover image is optional.
///
/// # Errors
/// - 400: blank/invalid fields, missing avatar
/// - 409: username or email already taken
/// - 500: storage or media-collaborator failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    store: web::Data<PgUserStore>,
    auth: web::Data<AuthSettings>,
    media: web::Data<MediaClient>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();

    // All text-field validation happens before the media collaborator is
    // contacted, so a bad request never leaves an orphaned upload behind.
    let fields = RegisterFields::parse(&form.full_name, &form.email, &form.username, &form.password)?;

    if form.avatar.trim().is_empty() {
        return Err(AppError::BadRequest("Avatar file is required".to_string()));
    }

    let avatar_url = media.upload(&form.avatar).await?;
    let cover_image_url = match form.cover_image.as_deref() {
        Some(cover) if !cover.trim().is_empty() => Some(media.upload(cover).await?),
        _ => None,
    };

    let user = session::register(
        store.get_ref(),
        auth.get_ref(),
        RegisterInput {
            fields,
            avatar_url,
            cover_image_url,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(user))
}

/// POST /auth/login
///
/// Authenticates by username or email plus password. Sets both token cookies
/// and returns the pair in the body for non-cookie clients.
///
/// # Errors
/// - 400: neither username nor email supplied
/// - 404: no matching account
/// - 401: wrong password
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<PgUserStore>,
    auth: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    let identifier = form
        .username
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .or(form.email.as_deref())
        .ok_or_else(|| AppError::BadRequest("Username or Email required".to_string()))?;

    let outcome = session::login(store.get_ref(), auth.get_ref(), identifier, &form.password).await?;

    let artifacts = SessionArtifacts::issue(
        &outcome.tokens.access_token,
        &outcome.tokens.refresh_token,
        auth.get_ref(),
    );

    Ok(HttpResponse::Ok()
        .cookie(artifacts.access)
        .cookie(artifacts.refresh)
        .json(TokenResponse {
            user: Some(outcome.user),
            access_token: outcome.tokens.access_token,
            refresh_token: outcome.tokens.refresh_token,
        }))
}

/// POST /auth/refresh
///
/// Rotates the token pair. The presented refresh token is read from the
/// cookie first, then from the request body.
///
/// # Errors
/// - 401: missing, invalid, expired or already-rotated token
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    store: web::Data<PgUserStore>,
    auth: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    let cookie_token = req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string());
    let body_token = body.and_then(|b| b.into_inner().refresh_token);
    let presented = cookie_token.or(body_token);

    let tokens = session::refresh(store.get_ref(), auth.get_ref(), presented.as_deref()).await?;

    let artifacts = SessionArtifacts::issue(&tokens.access_token, &tokens.refresh_token, auth.get_ref());

    Ok(HttpResponse::Ok()
        .cookie(artifacts.access)
        .cookie(artifacts.refresh)
        .json(TokenResponse {
            user: None,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }))
}

/// POST /auth/logout (protected)
///
/// Clears the stored refresh token and both cookies. Always succeeds;
/// logging out twice leaves the same end state.
pub async fn logout(
    current_user: web::ReqData<CurrentUser>,
    store: web::Data<PgUserStore>,
) -> Result<HttpResponse, AppError> {
    session::logout(store.get_ref(), current_user.0.id).await?;

    let artifacts = SessionArtifacts::clear();

    Ok(HttpResponse::Ok()
        .cookie(artifacts.access)
        .cookie(artifacts.refresh)
        .json(serde_json::json!({ "message": "User logged out" })))
}

/// GET /auth/me (protected)
pub async fn current_user(user: web::ReqData<CurrentUser>) -> HttpResponse {
    HttpResponse::Ok().json(&user.into_inner().0)
}

/// POST /auth/change-password (protected)
///
/// # Errors
/// - 401: current password does not verify
/// - 400: blank new password
pub async fn change_password(
    form: web::Json<ChangePasswordRequest>,
    current_user: web::ReqData<CurrentUser>,
    store: web::Data<PgUserStore>,
    auth: web::Data<AuthSettings>,
) -> Result<HttpResponse, AppError> {
    session::change_password(
        store.get_ref(),
        auth.get_ref(),
        current_user.0.id,
        &form.old_password,
        &form.new_password,
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Password changed successfully" })))
}

/// PATCH /auth/account (protected)
///
/// Updates profile text fields. At least one of full_name/email must be
/// present.
pub async fn update_account(
    form: web::Json<UpdateAccountRequest>,
    current_user: web::ReqData<CurrentUser>,
    store: web::Data<PgUserStore>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();

    if form.full_name.is_none() && form.email.is_none() {
        return Err(AppError::BadRequest(
            "full_name or email is required".to_string(),
        ));
    }

    let full_name = form
        .full_name
        .as_deref()
        .map(is_valid_full_name)
        .transpose()?;
    let email = form.email.as_deref().map(is_valid_email).transpose()?;

    let user = store
        .update_profile(current_user.0.id, full_name.as_deref(), email.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(UserView::from(&user)))
}

/// PATCH /auth/avatar (protected)
///
/// Resolves the new avatar reference through the media collaborator and
/// overwrites the stored URL.
///
/// # Errors
/// - 400: blank avatar reference
/// - 500: media-collaborator or storage failure
pub async fn update_avatar(
    form: web::Json<UpdateAvatarRequest>,
    current_user: web::ReqData<CurrentUser>,
    store: web::Data<PgUserStore>,
    media: web::Data<MediaClient>,
) -> Result<HttpResponse, AppError> {
    if form.avatar.trim().is_empty() {
        return Err(AppError::BadRequest("Avatar file is required".to_string()));
    }

    let avatar_url = media.upload(&form.avatar).await?;
    let user = session::update_avatar(store.get_ref(), current_user.0.id, &avatar_url).await?;

    Ok(HttpResponse::Ok().json(user))
}

/// PATCH /auth/cover-image (protected)
///
/// # Errors
/// - 400: blank cover image reference
/// - 500: media-collaborator or storage failure
pub async fn update_cover_image(
    form: web::Json<UpdateCoverImageRequest>,
    current_user: web::ReqData<CurrentUser>,
    store: web::Data<PgUserStore>,
    media: web::Data<MediaClient>,
) -> Result<HttpResponse, AppError> {
    if form.cover_image.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Cover image file is required".to_string(),
        ));
    }

    let cover_image_url = media.upload(&form.cover_image).await?;
    let user =
        session::update_cover_image(store.get_ref(), current_user.0.id, &cover_image_url).await?;

    Ok(HttpResponse::Ok().json(user))
}
