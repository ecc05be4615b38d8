//! The document pipeline module.
//!
//! This module provides the high-level builder API for assembling the
//! preprocess → match → extract → validate chain.
//!
//! # Main APIs
//!
//! - [`DocumentPipelineBuilder`] - wires configuration, templates, and the
//!   OCR engine into a ready pipeline
//! - [`DocumentPipeline`] - processes documents and batches
//! - [`Preprocessor`] - the standalone preprocessing chain, also used when
//!   fingerprinting reference pages during template onboarding

pub mod document;
pub mod preprocess;

pub use document::{DocumentPipeline, DocumentPipelineBuilder};
pub use preprocess::{PreprocessedImage, Preprocessor};
