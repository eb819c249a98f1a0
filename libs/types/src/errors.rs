//! Error types for the building model
//!
//! Error taxonomy using thiserror

use thiserror::Error;

/// Errors raised when reading or mutating the building model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Home not found: {home_id}")]
    HomeNotFound { home_id: String },

    #[error("Light not found: {light_id}")]
    LightNotFound { light_id: String },

    #[error("No home loaded")]
    NoHome,

    #[error("Invalid color: {color} (expected #rrggbb)")]
    InvalidColor { color: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_not_found_display() {
        let err = ModelError::HomeNotFound {
            home_id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Home not found: abc");
    }

    #[test]
    fn test_invalid_color_display() {
        let err = ModelError::InvalidColor {
            color: "red".to_string(),
        };
        assert!(err.to_string().contains("red"));
    }
}
