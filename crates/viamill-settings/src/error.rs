//! Error types for the settings crate.
//!
//! Loading, saving and validating a machining setup report through
//! [`SettingsError`]; schema and range violations are [`ConfigError`]s.

use thiserror::Error;

/// Errors that can occur while loading, saving or editing a setup.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The setup file could not be loaded.
    #[error("Failed to load setup: {0}")]
    LoadError(String),

    /// The setup file could not be saved.
    #[error("Failed to save setup: {0}")]
    SaveError(String),

    /// A setup value is invalid.
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// A schema or range check failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to the option schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The option id is not part of the schema.
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// The setup file format is not supported.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The value has the wrong kind for the option.
    #[error("Type mismatch for '{key}': expected {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// A configuration value is out of valid range.
    #[error("Value out of range for '{key}': {value}")]
    ValueOutOfRange { key: String, value: String },
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Result type alias for schema operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
