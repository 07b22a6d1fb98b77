//! Error types for the MXCP validator
//!
//! Per-file problems (unparseable text, schema violations) are not errors:
//! they are reported through [`crate::validation::ValidationResult`]. The
//! variants here cover everything that stops a run or a command outright.

use thiserror::Error;

/// Main error type for validator operations
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Text could not be parsed as YAML, JSON or TOML
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A schema file is missing, malformed or does not compile
    #[error("Schema load error: {0}")]
    SchemaLoad(String),

    /// Validator configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization of output failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ValidationError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ValidationError::InvalidInput(msg.into())
    }

    /// Create a file error
    pub fn file_error(msg: impl Into<String>) -> Self {
        ValidationError::FileError(msg.into())
    }

    /// Create a parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        ValidationError::ParseError(msg.into())
    }

    /// Create a schema load error
    pub fn schema_load(msg: impl Into<String>) -> Self {
        ValidationError::SchemaLoad(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        ValidationError::Config(msg.into())
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ValidationError::InvalidInput(_)
                | ValidationError::FileError(_)
                | ValidationError::ParseError(_)
                | ValidationError::SchemaLoad(_)
                | ValidationError::Config(_)
        )
    }
}

impl From<std::io::Error> for ValidationError {
    fn from(err: std::io::Error) -> Self {
        ValidationError::FileError(err.to_string())
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(err: serde_json::Error) -> Self {
        ValidationError::ParseError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for ValidationError {
    fn from(err: serde_yaml::Error) -> Self {
        ValidationError::ParseError(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for ValidationError {
    fn from(err: toml::de::Error) -> Self {
        ValidationError::ParseError(format!("TOML error: {}", err))
    }
}

/// Result type alias for validator operations
pub type Result<T> = std::result::Result<T, ValidationError>;
