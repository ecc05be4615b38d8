//! Template matching and zone-based field extraction for scanned business
//! documents.
//!
//! `formprint` classifies scanned receipts and invoices against a library
//! of known vendor templates and extracts structured field data from the
//! match. The core is a DPI/scale-invariant structural fingerprint, a
//! two-phase matching algorithm that scales to large template libraries,
//! and a template-driven zone extractor with per-field confidence scoring
//! and validation.
//!
//! # Pipeline
//!
//! raw image → preprocess → zone detection → fingerprints → template
//! matching → field extraction → validation → [`DocumentRecord`].
//!
//! # Example
//!
//! ```no_run
//! use formprint::core::config::PipelineConfig;
//! use formprint::pipeline::DocumentPipeline;
//! use formprint::utils::load_image;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let templates = serde_json::from_str(&std::fs::read_to_string("templates.json")?)?;
//! let pipeline = DocumentPipeline::builder(PipelineConfig::with_target_dpi(300))
//!     .with_templates(templates)
//!     .build()?;
//!
//! let image = load_image("scan.png")?;
//! let record = pipeline.process(&image, None)?;
//! println!("{}", serde_json::to_string_pretty(&record)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`core`] - configuration, validation, and error types
//! - [`domain`] - zones, fingerprints, templates, result records
//! - [`processors`] - low-level image operations (deskew, denoise, ...)
//! - [`layout`] - zone detection in fast and full tiers
//! - [`matching`] - the template library and two-phase matcher
//! - [`extract`] - field extraction, typed parsing, validation
//! - [`ocr`] - the OCR engine seam and its implementations
//! - [`pipeline`] - the assembled end-to-end pipeline
//! - [`utils`] - image loading and logging helpers

pub mod core;
pub mod domain;
pub mod extract;
pub mod layout;
pub mod matching;
pub mod ocr;
pub mod pipeline;
pub mod processors;
pub mod utils;

pub use crate::core::config::PipelineConfig;
pub use crate::core::errors::{PipelineError, PipelineResult};
pub use crate::domain::record::DocumentRecord;
pub use crate::domain::template::Template;
pub use crate::pipeline::{DocumentPipeline, DocumentPipelineBuilder};
