/// Session artifacts: the cookie pair carrying the token pair.
///
/// Built as explicit values so the session manager stays transport-agnostic;
/// handlers attach them to the response. Both cookies are HttpOnly and
/// Secure, so client-side scripts never see the tokens.

use actix_web::cookie::{time::Duration, Cookie, SameSite};

use crate::configuration::AuthSettings;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

pub struct SessionArtifacts {
    pub access: Cookie<'static>,
    pub refresh: Cookie<'static>,
}

impl SessionArtifacts {
    /// Cookie pair for a freshly issued token pair.
    pub fn issue(access_token: &str, refresh_token: &str, auth: &AuthSettings) -> Self {
        Self {
            access: token_cookie(ACCESS_COOKIE, access_token, auth.access_token_expiry),
            refresh: token_cookie(REFRESH_COOKIE, refresh_token, auth.refresh_token_expiry),
        }
    }

    /// Removal pair for logout: empty values, zero max-age.
    pub fn clear() -> Self {
        Self {
            access: removal_cookie(ACCESS_COOKIE),
            refresh: removal_cookie(REFRESH_COOKIE),
        }
    }
}

fn token_cookie(name: &'static str, value: &str, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(name, value.to_string())
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build(name, "")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .finish()
}
