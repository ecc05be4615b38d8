//! Border and margin removal.
//!
//! Flatbed scans carry dead margins and platen edges around the page
//! content. This step finds the union bounding box of all significant ink
//! contours and crops to it plus a small retained margin. With no
//! significant content the image passes through unchanged.

use super::binarize::ink_mask;
use super::geometry::{contour_bounds, union_rect};
use crate::core::config::PreprocessConfig;
use crate::domain::zone::PixelRect;
use image::{GrayImage, imageops};
use imageproc::contours::find_contours;
use tracing::debug;

/// Contour-based margin cropper.
#[derive(Debug, Clone)]
pub struct BorderCropper {
    min_blob_area_ratio: f32,
    margin_ratio: f32,
}

impl BorderCropper {
    /// Builds a cropper from the preprocessing configuration.
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            min_blob_area_ratio: config.border_min_blob_area_ratio,
            margin_ratio: config.border_margin_ratio,
        }
    }

    /// Crops a document-form binary image to its content bounding box.
    ///
    /// Contours smaller than the configured area fraction are treated as
    /// dust and do not extend the box. Returns the input unchanged when no
    /// significant content exists.
    pub fn apply(&self, image: GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return image;
        }
        let page_area = (width as u64 * height as u64) as f32;
        let min_area = (page_area * self.min_blob_area_ratio).max(1.0) as u64;

        let mask = ink_mask(&image);
        let content: Option<PixelRect> = find_contours::<u32>(&mask)
            .iter()
            .filter_map(contour_bounds)
            .filter(|bounds| bounds.area() >= min_area)
            .reduce(union_rect);

        let Some(content) = content else {
            debug!("no significant content; keeping full frame");
            return image;
        };

        let margin_x = (width as f32 * self.margin_ratio) as u32;
        let margin_y = (height as f32 * self.margin_ratio) as u32;
        let x1 = content.x.saturating_sub(margin_x);
        let y1 = content.y.saturating_sub(margin_y);
        let x2 = (content.x + content.width + margin_x).min(width);
        let y2 = (content.y + content.height + margin_y).min(height);
        if x2 <= x1 || y2 <= y1 {
            return image;
        }
        debug!(x1, y1, width = x2 - x1, height = y2 - y1, "cropping to content");
        imageops::crop_imm(&image, x1, y1, x2 - x1, y2 - y1).to_image()
    }
}
