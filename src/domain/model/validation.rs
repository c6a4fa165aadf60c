//! Model validation utilities

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length for model IDs
pub const MAX_MODEL_ID_LENGTH: usize = 64;

/// Regex pattern for valid model IDs (alphanumeric, hyphens, underscores)
static MODEL_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$").unwrap());

/// Model validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ModelValidationError {
    /// Model ID is empty
    EmptyId,
    /// Model ID exceeds maximum length
    IdTooLong { length: usize, max: usize },
    /// Model ID contains invalid characters
    InvalidIdFormat { id: String },
}

impl fmt::Display for ModelValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "Model ID cannot be empty"),
            Self::IdTooLong { length, max } => {
                write!(f, "Model ID too long: {} characters (max {})", length, max)
            }
            Self::InvalidIdFormat { id } => {
                write!(
                    f,
                    "Invalid model ID format '{}': must be alphanumeric with hyphens or underscores",
                    id
                )
            }
        }
    }
}

impl std::error::Error for ModelValidationError {}

/// Validates a semantic model ID.
///
/// `/` is reserved for catalog names such as `{id}/draft`, so it never appears in an ID.
pub fn validate_model_id(id: &str) -> Result<(), ModelValidationError> {
    if id.is_empty() {
        return Err(ModelValidationError::EmptyId);
    }

    if id.len() > MAX_MODEL_ID_LENGTH {
        return Err(ModelValidationError::IdTooLong {
            length: id.len(),
            max: MAX_MODEL_ID_LENGTH,
        });
    }

    if !MODEL_ID_PATTERN.is_match(id) {
        return Err(ModelValidationError::InvalidIdFormat { id: id.to_string() });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(validate_model_id("sales").is_ok());
        assert!(validate_model_id("2f1c9a3e-0b7d-4c4e-9b1a-7e0d6f1a2b3c").is_ok());
        assert!(validate_model_id("model_v2").is_ok());
    }

    #[test]
    fn test_empty_id() {
        assert_eq!(validate_model_id(""), Err(ModelValidationError::EmptyId));
    }

    #[test]
    fn test_draft_suffix_is_rejected() {
        assert!(matches!(
            validate_model_id("sales/draft"),
            Err(ModelValidationError::InvalidIdFormat { .. })
        ));
    }

    #[test]
    fn test_too_long() {
        let id = "a".repeat(MAX_MODEL_ID_LENGTH + 1);
        assert!(matches!(
            validate_model_id(&id),
            Err(ModelValidationError::IdTooLong { .. })
        ));
    }
}
