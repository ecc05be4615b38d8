//! Low-level image processing operations.
//!
//! Each processor is a small, configuration-driven unit; the pipeline
//! module composes them in a fixed order.

pub mod binarize;
pub mod border;
pub mod denoise;
pub mod deskew;
pub mod geometry;

pub use binarize::{AdaptiveBinarizer, ink_mask, ink_ratio};
pub use border::BorderCropper;
pub use denoise::NonLocalMeans;
pub use deskew::Deskewer;
pub use geometry::{contour_bounds, union_rect};
