/// Verification middleware for protected routes.
///
/// Extracts the bearer credential (secure cookie first, then the
/// Authorization header), validates it against the access-token secret,
/// loads the account and attaches a sanitized `CurrentUser` to the request.
/// Access tokens are stateless: beyond the single account lookup there is no
/// storage access and no refresh-token check here.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::{verify_access_token, ACCESS_COOKIE};
use crate::configuration::AuthSettings;
use crate::users::{UserStore, UserView};

/// The verified identity attached to the request for downstream handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserView);

/// Generic over the store seam so the account lookup can be exercised (and
/// counted) in tests without a database.
pub struct AuthMiddleware<St> {
    auth: AuthSettings,
    store: St,
}

impl<St: UserStore + Clone> AuthMiddleware<St> {
    pub fn new(auth: AuthSettings, store: St) -> Self {
        Self { auth, store }
    }
}

impl<S, B, St> Transform<S, ServiceRequest> for AuthMiddleware<St>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    St: UserStore + Clone,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S, St>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            auth: self.auth.clone(),
            store: self.store.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S, St> {
    service: Rc<S>,
    auth: AuthSettings,
    store: St,
}

impl<S, B, St> Service<ServiceRequest> for AuthMiddlewareService<S, St>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    St: UserStore + Clone,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let auth = self.auth.clone();
        let store = self.store.clone();

        Box::pin(async move {
            let token = match extract_access_token(&req) {
                Some(token) => token,
                None => {
                    tracing::warn!("Missing access token on protected route");
                    return Err(reject("Unauthorized request", "UNAUTHORIZED"));
                }
            };

            // Expired vs malformed is only distinguished inside
            // verify_access_token's logging; the client sees one outcome.
            let claims = match verify_access_token(&token, &auth) {
                Ok(claims) => claims,
                Err(_) => return Err(reject("Invalid or expired token", "TOKEN_INVALID")),
            };

            let user_id = match claims.user_id() {
                Ok(id) => id,
                Err(_) => return Err(reject("Invalid or expired token", "TOKEN_INVALID")),
            };

            let user = match store.find_by_id(user_id).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    tracing::warn!(user_id = %user_id, "Access token subject no longer exists");
                    return Err(reject("Invalid or expired token", "TOKEN_INVALID"));
                }
                Err(e) => return Err(e.into()),
            };

            req.extensions_mut().insert(CurrentUser(UserView::from(&user)));

            tracing::debug!(user_id = %user_id, "Access token verified");

            service.call(req).await
        })
    }
}

/// Bearer credential extraction; the cookie takes precedence when both are
/// present.
fn extract_access_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

fn reject(message: &str, code: &str) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "message": message,
        "code": code,
    }));
    actix_web::error::InternalError::from_response(message.to_string(), response).into()
}
