//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while validating raw geometry input or unit names.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A coordinate or bulge value is NaN or infinite.
    #[error("Non-finite value in {field} of segment {index}")]
    NonFinite {
        /// Index of the offending segment in the input list.
        index: usize,
        /// Name of the offending field.
        field: &'static str,
    },

    /// A unit name could not be parsed.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
}

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_display() {
        let err = CoreError::NonFinite {
            index: 3,
            field: "bulge",
        };
        assert_eq!(err.to_string(), "Non-finite value in bulge of segment 3");

        let err = CoreError::UnknownUnit("furlong".to_string());
        assert_eq!(err.to_string(), "Unknown unit: furlong");
    }
}
