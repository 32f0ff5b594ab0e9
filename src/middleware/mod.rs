/// Middleware module
///
/// Request-level identity verification for protected routes.

mod auth_middleware;

pub use auth_middleware::{AuthMiddleware, CurrentUser};
