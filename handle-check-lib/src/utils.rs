//! Utility functions for username handling.

use crate::error::HandleCheckError;

/// Characters that would change the meaning of a profile URL.
const FORBIDDEN_CHARS: [char; 4] = ['/', '?', '#', '\\'];

/// Validate a username before it is substituted into URL templates.
///
/// The username must be non-empty after trimming and must stay inside a
/// single URL path segment.
///
/// # Returns
///
/// `Ok(())` if valid, `Err(HandleCheckError)` if invalid.
pub fn validate_username(username: &str) -> Result<(), HandleCheckError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(HandleCheckError::invalid_username(
            username,
            "Username cannot be empty",
        ));
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(HandleCheckError::invalid_username(
            username,
            "Username cannot contain whitespace",
        ));
    }

    if let Some(c) = trimmed.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(HandleCheckError::invalid_username(
            username,
            format!("Username cannot contain '{}'", c),
        ));
    }

    Ok(())
}
