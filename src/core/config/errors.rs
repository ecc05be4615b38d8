//! Configuration validation primitives.
//!
//! Every configuration struct in the pipeline implements [`ConfigValidator`]
//! so that misconfiguration is caught once, at pipeline construction, instead
//! of surfacing per-document.

use thiserror::Error;

/// Errors produced by configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value outside its permitted range.
    #[error("invalid value for '{field}': expected {expected}, got {actual}")]
    InvalidValue {
        /// The offending field.
        field: String,
        /// Description of the permitted values.
        expected: String,
        /// The actual value, rendered for the message.
        actual: String,
    },
    /// A required field was not provided.
    #[error("missing required field '{field}'")]
    MissingField {
        /// The missing field.
        field: String,
    },
    /// A cross-field constraint does not hold.
    #[error("inconsistent configuration: {message}")]
    Inconsistent {
        /// What the check found.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    pub fn invalid_value(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            expected: expected.into(),
            actual: actual.to_string(),
        }
    }

    /// Creates a missing-field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Creates a cross-field inconsistency error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }
}

/// Trait implemented by every configuration struct in the pipeline.
pub trait ConfigValidator {
    /// Checks all field-level and cross-field constraints.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Extension helpers shared by validator implementations.
pub trait ConfigValidatorExt: ConfigValidator {
    /// Validates and returns `self` for call chaining.
    fn validated(self) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        self.validate()?;
        Ok(self)
    }
}

impl<T: ConfigValidator> ConfigValidatorExt for T {}
