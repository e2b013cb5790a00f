//! Client-side form checks.
//!
//! Everything here runs before a request is built; a failing check never
//! reaches the network layer.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Upload size limit enforced by the backend.
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// bcrypt only looks at the first 72 bytes of a password.
pub const MAX_PASSWORD_BYTES: usize = 72;

pub const MIN_NEW_PASSWORD_CHARS: usize = 8;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password is required")]
    EmptyPassword,

    #[error("Password must be at most 72 bytes")]
    PasswordTooLong,

    #[error("Password must be at least 8 characters and contain a letter and a digit")]
    WeakPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Only PDF files are supported: {0}")]
    NotPdf(String),

    #[error("File is too large ({0} bytes). Maximum size is 50MB")]
    FileTooLarge(u64),

    #[error("Cannot read file: {0}")]
    Unreadable(String),

    #[error("File is empty")]
    EmptyFile,

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Option label cannot be empty")]
    EmptyLabel,

    #[error("Built-in questions cannot be removed; add your own options first")]
    BuiltInOption,

    #[error("No conversation selected")]
    NoSessionSelected,

    #[error("This conversation is closed and cannot receive replies")]
    SessionClosed,
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

/// Checks a new password and its confirmation (reset and change forms).
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::PasswordTooLong);
    }
    let long_enough = password.chars().count() >= MIN_NEW_PASSWORD_CHARS;
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(long_enough && has_letter && has_digit) {
        return Err(ValidationError::WeakPassword);
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Checks name and size of a knowledge-base upload.
pub fn validate_upload(path: &Path, size_bytes: u64) -> Result<(), ValidationError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if !is_pdf {
        return Err(ValidationError::NotPdf(path.display().to_string()));
    }
    if size_bytes == 0 {
        return Err(ValidationError::EmptyFile);
    }
    if size_bytes > MAX_UPLOAD_BYTES {
        return Err(ValidationError::FileTooLarge(size_bytes));
    }
    Ok(())
}

/// Trims a chat message and rejects blank input.
pub fn normalize_message(text: &str) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    Ok(trimmed.to_string())
}
