//! Stitcher (user profile) input validation.

use crate::error::CoreError;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_MOTTO_LEN: usize = 255;

/// Usernames are 3-150 characters of ASCII letters, digits, `_`, `.` or `-`.
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(CoreError::Validation(format!(
            "Username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters, got {len}"
        )));
    }
    if let Some(bad) = username
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(CoreError::Validation(format!(
            "Username contains invalid character '{bad}'"
        )));
    }
    Ok(())
}

/// Minimal shape check: exactly one `@` with a non-empty local part and a
/// dotted domain.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    let invalid = || CoreError::Validation(format!("Invalid email address '{email}'"));
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || !domain.contains('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_motto(motto: Option<&str>) -> Result<(), CoreError> {
    match motto {
        Some(m) if m.chars().count() > MAX_MOTTO_LEN => Err(CoreError::Validation(format!(
            "Motto must be at most {MAX_MOTTO_LEN} characters"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("ada.l").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("ada.example.com").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada@localhost").is_err());
        assert!(validate_email("ada@@example.com").is_err());
        assert!(validate_email("a da@example.com").is_err());
    }

    #[test]
    fn motto_length() {
        assert!(validate_motto(None).is_ok());
        assert!(validate_motto(Some("stitch it all together")).is_ok());
        assert!(validate_motto(Some(&"m".repeat(MAX_MOTTO_LEN + 1))).is_err());
    }
}
