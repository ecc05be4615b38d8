//! Core error types for the document pipeline.
//!
//! This module defines the fundamental error types used throughout the
//! matching and extraction system, including the main PipelineError enum and
//! the ProcessingStage enum that locates a failure within the pipeline.

use thiserror::Error;

/// Enum representing different stages of processing in the document pipeline.
///
/// This enum is used to identify which stage of the pipeline an error
/// occurred in, providing context for debugging and error handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessingStage {
    /// Error occurred during skew estimation or rotation correction.
    Deskew,
    /// Error occurred during denoising.
    Denoise,
    /// Error occurred during adaptive binarization.
    Binarize,
    /// Error occurred during resolution normalization.
    Resample,
    /// Error occurred during border/margin removal.
    BorderCrop,
    /// Error occurred during zone detection.
    ZoneDetection,
    /// Error occurred while building or comparing fingerprints.
    Fingerprinting,
    /// Error occurred during template matching.
    Matching,
    /// Error occurred during field extraction.
    Extraction,
    /// Generic processing error.
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Deskew => write!(f, "deskew"),
            ProcessingStage::Denoise => write!(f, "denoise"),
            ProcessingStage::Binarize => write!(f, "binarize"),
            ProcessingStage::Resample => write!(f, "resample"),
            ProcessingStage::BorderCrop => write!(f, "border crop"),
            ProcessingStage::ZoneDetection => write!(f, "zone detection"),
            ProcessingStage::Fingerprinting => write!(f, "fingerprinting"),
            ProcessingStage::Matching => write!(f, "matching"),
            ProcessingStage::Extraction => write!(f, "extraction"),
            ProcessingStage::Generic => write!(f, "processing"),
        }
    }
}

/// Enum representing the errors that can occur in the document pipeline.
///
/// Recoverable conditions (no zones detected, no match above threshold, an
/// unresolvable field zone, a failed type parse) are not represented here:
/// those produce well-formed degraded results instead of errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error occurred while decoding or loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        stage: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input (undecodable or zero-size image).
    ///
    /// Distinct from "no match": it reports bad input rather than the
    /// absence of a matching template.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    ///
    /// Raised at pipeline construction time, never per-document.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error indicating a template that failed load-time validation.
    #[error("template '{template_id}' rejected: {message}")]
    TemplateInvalid {
        /// The identifier of the offending template.
        template_id: String,
        /// What the validation found.
        message: String,
    },

    /// Error from an OCR engine invocation.
    #[error("ocr engine '{engine}': {context}")]
    Ocr {
        /// The name of the engine that failed.
        engine: String,
        /// Additional context about the failure.
        context: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used across the pipeline.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<image::ImageError> for PipelineError {
    /// Converts an image::ImageError to PipelineError::ImageLoad.
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for PipelineError {
    /// Converts a ConfigError to PipelineError::ConfigError.
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl PipelineError {
    /// Creates an invalid-input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a configuration error with enhanced context and details.
    ///
    /// # Arguments
    ///
    /// * `context` - High-level description of what was being configured
    /// * `details` - Specific details about what went wrong
    pub fn config_error_detailed(context: impl Into<String>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!("{}: {}", context.into(), details.into()),
        }
    }

    /// Creates a configuration error for missing required fields.
    ///
    /// # Arguments
    ///
    /// * `field` - The name of the missing field
    /// * `context` - Context about where the field is required
    pub fn missing_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ConfigError {
            message: format!(
                "missing required field '{}' in {}",
                field.into(),
                context.into()
            ),
        }
    }

    /// Creates a template validation error.
    pub fn template_invalid(template_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TemplateInvalid {
            template_id: template_id.into(),
            message: message.into(),
        }
    }

    /// Wraps an error that occurred in a specific pipeline stage.
    pub fn processing(
        stage: ProcessingStage,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates an OCR engine error.
    pub fn ocr(engine: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Ocr {
            engine: engine.into(),
            context: context.into(),
        }
    }
}
