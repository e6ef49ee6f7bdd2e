use validator::Validate;

use crate::error::ApiError;

/// Longest accepted user identifier.
pub const MAX_USER_ID_LEN: usize = 255;

/// Run the derived `validator` rules on a request body.
pub fn validate_body<T: Validate>(body: &T) -> Result<(), ApiError> {
    body.validate().map_err(ApiError::from)
}

/// User ids are opaque client strings; they only need to be present and
/// fit the storage column.
pub fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
    if user_id.trim().is_empty() {
        return Err(ApiError::Validation("user_id cannot be empty".to_string()));
    }

    if user_id.len() > MAX_USER_ID_LEN {
        return Err(ApiError::Validation(format!(
            "user_id must be at most {MAX_USER_ID_LEN} bytes"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Sample {
        #[validate(range(min = 0.25, max = 4.0))]
        speed: f64,
    }

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id("amina").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("   ").is_err());
        assert!(validate_user_id(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_validate_body_reports_field() {
        assert!(validate_body(&Sample { speed: 1.0 }).is_ok());

        let err = validate_body(&Sample { speed: 5.0 }).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref msg) if msg.starts_with("speed")));
    }
}
