//! Utility functions for the document pipeline.
//!
//! This module provides the image loading helpers and logging setup used
//! throughout the pipeline and its binary.

pub mod image;
pub mod logging;

pub use image::{dynamic_to_gray, load_image};
pub use logging::init_tracing;
