/// Password Hashing and Verification
///
/// bcrypt with a configurable work factor. The hash output is the only thing
/// that ever reaches the users table.

use crate::error::AppError;

/// Hash a password with the configured bcrypt cost.
///
/// # Errors
/// Returns Internal if bcrypt rejects the input or cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    bcrypt::hash(password, cost)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a candidate password against a stored bcrypt hash.
///
/// bcrypt's comparison is constant-time with respect to the candidate. A
/// malformed or missing hash verifies false instead of erroring, so a
/// corrupted row degrades to a failed login rather than a 500.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
