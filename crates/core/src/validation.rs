//! Input validation for user-supplied account fields.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Minimum password length in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum accepted length for names.
pub const MAX_NAME_LENGTH: usize = 100;
const MIN_NAME_LENGTH: usize = 2;
/// Maximum accepted length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-'.]+$").expect("valid regex"));

/// Trim and strip control characters.
///
/// The length limit applies to the raw input, so an over-long value is
/// rejected instead of being cut down to something that would validate.
pub fn sanitize_input(input: &str, max_chars: usize) -> Result<String, CoreError> {
    if input.chars().count() > max_chars {
        return Err(CoreError::Validation(format!(
            "Input must be at most {max_chars} characters"
        )));
    }
    Ok(input
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .collect())
}

pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_RE.is_match(email) {
        return Err(CoreError::Validation("Invalid email format".into()));
    }
    Ok(())
}

/// Names are 2..=100 characters of letters, digits, spaces, `-`, `'` and `.`.
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    let len = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&len) {
        return Err(CoreError::Validation(format!(
            "Name must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters"
        )));
    }
    if !NAME_RE.is_match(name) {
        return Err(CoreError::Validation(
            "Name contains invalid characters".into(),
        ));
    }
    Ok(())
}

/// Require at least 8 characters with upper, lower, digit and symbol.
pub fn validate_password(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    let mut missing = Vec::new();
    if !password.chars().any(|c| c.is_uppercase()) {
        missing.push("an uppercase letter");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        missing.push("a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a number");
    }
    if !password.chars().any(|c| c.is_ascii_punctuation()) {
        missing.push("a special character");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Password must contain {}",
            missing.join(", ")
        )))
    }
}
