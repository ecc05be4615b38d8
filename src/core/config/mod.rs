//! Configuration management for the document pipeline.
//!
//! This module provides configuration types, validation traits, and utilities
//! for managing pipeline configurations.

pub mod errors;
pub mod parallel;
pub mod pipeline;

// Re-export commonly used types
pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use parallel::ParallelPolicy;
pub use pipeline::{
    CoarseWeights, ExtractionConfig, FineWeights, MatchingConfig, OcrConfig, OcrEngineKind,
    PipelineConfig, PreprocessConfig, ZoneDetectionConfig,
};
