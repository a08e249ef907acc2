//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest Telegram file id accepted from the admin panel.
const MAX_FILE_ID_LENGTH: usize = 256;

/// Validates that a value looks like a Telegram `file_id`.
///
/// # Examples
///
/// ```ignore
/// validate_file_id("AgACAgIAAxkBAAIB") // Ok
/// validate_file_id("not a file id")    // Err - whitespace
/// validate_file_id("")                 // Err - empty
/// ```
pub fn validate_file_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_FILE_ID_LENGTH {
        let mut err = ValidationError::new("file_id_length");
        err.message = Some(
            format!(
                "File id must be between 1 and {MAX_FILE_ID_LENGTH} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        let mut err = ValidationError::new("file_id_format");
        err.message = Some("File id may only contain letters, digits, `_` and `-`".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_id_valid() {
        assert!(validate_file_id("AgACAgIAAxkBAAIBZ2ZkX").is_ok());
        assert!(validate_file_id("CQACAgI-AAx_kB").is_ok());
    }

    #[test]
    fn test_validate_file_id_invalid_length() {
        assert!(validate_file_id("").is_err());
        assert!(validate_file_id(&"a".repeat(257)).is_err());
    }

    #[test]
    fn test_validate_file_id_invalid_format() {
        assert!(validate_file_id("not a file id").is_err()); // space
        assert!(validate_file_id("uploads/x.jpg").is_err()); // path
        assert!(validate_file_id("id\n").is_err()); // newline
    }
}
