use std::sync::LazyLock;

use regex::Regex;

use super::ValidationError;

pub const MIN_PASSWORD_LEN: usize = 8;

// One `@`, no whitespace, and a dot somewhere after the `@`.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("EMAIL_REGEX: invalid regex pattern")
});

/// Accepts `local@domain.tld` with no whitespace and a dot after the `@`.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required { field: "email" });
    }
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::EmailFormat)
    }
}

pub fn validate_password(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Required { field: "password" });
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}
