use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;

/// Centralized validation for account registration and login input.
///
/// Login input is only checked for presence: anything stricter would let a
/// caller learn the registration rules from login responses.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Validates an email address
///
/// # Examples
///
/// ```rust
/// use narthex_core::validation::validate_email;
///
/// assert!(validate_email("secretaria@parroquia.org").is_ok());
/// assert!(validate_email("invalid-email").is_err());
/// ```
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::MissingField(
            "Email is required".to_string(),
        ));
    }

    if email.len() > 254 {
        return Err(ValidationError::InvalidEmail(
            "Email is too long".to_string(),
        ));
    }

    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(format!(
            "Invalid email format: {email}"
        )))
    }
}

/// Validates a new password
///
/// # Password Requirements
///
/// - 8 to 128 characters
/// - At least one uppercase letter, one lowercase letter and one digit
/// - At least one of `!@#$%^&*(),.?":{}|<>`
///
/// # Examples
///
/// ```rust
/// use narthex_core::validation::validate_password;
///
/// assert!(validate_password("Parroquia#2024").is_ok());
/// assert!(validate_password("weak").is_err());
/// ```
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingField(
            "Password is required".to_string(),
        ));
    }

    let length = password.chars().count();
    if length < 8 {
        return Err(ValidationError::InvalidPassword(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if length > 128 {
        return Err(ValidationError::InvalidPassword(
            "Password must be no more than 128 characters long".to_string(),
        ));
    }

    let mut missing = Vec::new();
    if !password.chars().any(|c| c.is_uppercase()) {
        missing.push("an uppercase letter");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        missing.push("a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit");
    }
    if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)) {
        missing.push("a special character");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidPassword(format!(
            "Password must contain {}",
            missing.join(", ")
        )))
    }
}

/// Validates a first or last name: non-blank, at most 100 characters.
pub fn validate_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField(format!("{field} is required")));
    }

    if name.chars().count() > 100 {
        return Err(ValidationError::InvalidName(format!(
            "{field} must be no more than 100 characters long"
        )));
    }

    Ok(())
}

/// Validates an identity document for registration.
///
/// The type is a short code (`CC`, `TI`, `CE`, `1`...). The number allows
/// letters, digits and hyphens, up to 20 characters, after trimming.
pub fn validate_document(document_type: &str, document_number: &str) -> Result<(), ValidationError> {
    let document_type = document_type.trim();
    let document_number = document_number.trim();

    if document_type.is_empty() {
        return Err(ValidationError::MissingField(
            "Document type is required".to_string(),
        ));
    }

    if document_number.is_empty() {
        return Err(ValidationError::MissingField(
            "Document number is required".to_string(),
        ));
    }

    if document_type.len() > 10 || !document_type.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidDocument(format!(
            "Invalid document type: {document_type}"
        )));
    }

    if document_number.len() > 20
        || !document_number
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ValidationError::InvalidDocument(
            "Document number must be at most 20 letters, digits or hyphens".to_string(),
        ));
    }

    Ok(())
}

/// Presence check for a login attempt.
pub fn validate_login_input(
    document_type: &str,
    document_number: &str,
    password: &str,
) -> Result<(), ValidationError> {
    for (field, value) in [
        ("Document type", document_type.trim()),
        ("Document number", document_number.trim()),
        ("Password", password),
    ] {
        if value.is_empty() {
            return Err(ValidationError::MissingField(format!("{field} is required")));
        }
    }

    Ok(())
}
