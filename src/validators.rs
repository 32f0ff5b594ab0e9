/// Input validators for registration and profile fields.
///
/// Length limits protect against oversized payloads; format checks catch
/// obviously broken identifiers before they hit the database.

use lazy_static::lazy_static;
use regex::Regex;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_USERNAME_LENGTH: usize = 30;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 256;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // Usernames are stored lowercase; the check runs after normalization.
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[a-z0-9][a-z0-9._-]*$").unwrap();
}

#[derive(Debug)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is required", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates and normalizes an email address (trimmed, lowercased).
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim().to_lowercase();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }
    if !EMAIL_REGEX.is_match(&trimmed) || trimmed.matches('@').count() != 1 {
        return Err(ValidationError::InvalidFormat("email"));
    }

    Ok(trimmed)
}

/// Validates and normalizes a username (trimmed, lowercased).
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim().to_lowercase();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username"));
    }
    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username", MIN_USERNAME_LENGTH));
    }
    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username", MAX_USERNAME_LENGTH));
    }
    if !USERNAME_REGEX.is_match(&trimmed) {
        return Err(ValidationError::InvalidFormat("username"));
    }

    Ok(trimmed)
}

/// Validates a display name (trimmed, control characters rejected).
pub fn is_valid_full_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("full name"));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong("full name", MAX_NAME_LENGTH));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat("full name"));
    }

    Ok(trimmed.to_string())
}
