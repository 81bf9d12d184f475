//! Error types for the CAM tools crate.
//!
//! Geometry problems never fail a calculation; they are logged and the
//! affected feature is dropped. Errors are reserved for bad input values,
//! unknown output targets and I/O.

use std::io;
use thiserror::Error;
use viamill_core::CoreError;
use viamill_settings::SettingsError;

/// Errors that can occur during CAM tool operations.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// Invalid parameters were provided to a CAM tool.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// No post-processor exists for the requested output dialect.
    #[error("Unknown output target: {0}")]
    UnknownOutputTarget(String),

    /// The input geometry contains unusable values.
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] CoreError),

    /// The setup could not be loaded or validated.
    #[error("Setup error: {0}")]
    Settings(#[from] SettingsError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type alias for CAM tool operations.
pub type CamToolResult<T> = Result<T, CamToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cam_tool_error_display() {
        let err = CamToolError::InvalidParameters("tool diameter is zero".to_string());
        assert_eq!(err.to_string(), "Invalid parameters: tool diameter is zero");

        let err = CamToolError::UnknownOutputTarget("hpgl".to_string());
        assert_eq!(err.to_string(), "Unknown output target: hpgl");
    }

    #[test]
    fn test_geometry_error_conversion() {
        let core_err = CoreError::NonFinite {
            index: 2,
            field: "start",
        };
        let err: CamToolError = core_err.into();
        assert!(matches!(err, CamToolError::Geometry(_)));
        assert_eq!(
            err.to_string(),
            "Invalid geometry: Non-finite value in start of segment 2"
        );
    }

    #[test]
    fn test_settings_error_conversion() {
        let settings_err = SettingsError::LoadError("missing".to_string());
        let err: CamToolError = settings_err.into();
        assert!(matches!(err, CamToolError::Settings(_)));
    }
}
