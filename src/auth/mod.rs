/// Authentication module
///
/// Password hashing, token issuance/verification, session artifacts and the
/// session manager orchestrating the credential lifecycle.

mod claims;
mod cookies;
mod jwt;
mod password;
pub mod session;

pub use claims::{AccessClaims, RefreshClaims};
pub use cookies::{SessionArtifacts, ACCESS_COOKIE, REFRESH_COOKIE};
pub use jwt::{issue_access_token, issue_refresh_token, verify_access_token, verify_refresh_token};
pub use password::{hash_password, verify_password};
