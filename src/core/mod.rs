//! The core module of the document pipeline.
//!
//! This module contains the fundamental building blocks shared by every
//! pipeline component:
//! - Configuration management and validation
//! - Error handling
//! - Validation macros
//!
//! It also re-exports commonly used types for convenience.

pub mod config;
pub mod errors;
#[macro_use]
pub mod macros;

pub use config::{
    CoarseWeights, ConfigError, ConfigValidator, ConfigValidatorExt, ExtractionConfig, FineWeights,
    MatchingConfig, OcrConfig, OcrEngineKind, ParallelPolicy, PipelineConfig, PreprocessConfig,
    ZoneDetectionConfig,
};
pub use errors::{PipelineError, PipelineResult, ProcessingStage};
