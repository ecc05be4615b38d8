//! Error handling for the document pipeline.

pub mod types;

pub use types::{PipelineError, PipelineResult, ProcessingStage};
