//! Validation helpers for DTOs.

use validator::ValidationError;

/// Player display names are 1 to 20 characters once trimmed.
pub const MAX_NAME_LENGTH: usize = 20;
/// Join codes are exactly 6 characters.
pub const CODE_LENGTH: usize = 6;

/// Validates a player display name: non-blank, at most 20 characters.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Player name must not be blank".into());
        return Err(err);
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!("Player name must be at most {MAX_NAME_LENGTH} characters").into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates a join code: exactly 6 uppercase letters or digits.
pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != CODE_LENGTH {
        let mut err = ValidationError::new("code_length");
        err.message =
            Some(format!("Join code must be exactly {CODE_LENGTH} characters (got {})", code.len()).into());
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
    {
        let mut err = ValidationError::new("code_format");
        err.message = Some("Join code must contain only uppercase letters and digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_name_valid() {
        assert!(validate_player_name("Ada").is_ok());
        assert!(validate_player_name("  Grace Hopper  ").is_ok());
        assert!(validate_player_name(&"x".repeat(20)).is_ok());
    }

    #[test]
    fn test_validate_player_name_invalid() {
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err()); // blank after trim
        assert!(validate_player_name(&"x".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_join_code_valid() {
        assert!(validate_join_code("ABC123").is_ok());
        assert!(validate_join_code("000000").is_ok());
        assert!(validate_join_code("ZZZZZZ").is_ok());
    }

    #[test]
    fn test_validate_join_code_invalid() {
        assert!(validate_join_code("ABC12").is_err()); // too short
        assert!(validate_join_code("ABC1234").is_err()); // too long
        assert!(validate_join_code("abc123").is_err()); // lowercase
        assert!(validate_join_code("ABC 12").is_err()); // space
    }
}
