//! Adaptive binarization.
//!
//! Converts a denoised grayscale page into document form: ink at 0,
//! background at 255. The threshold adapts to the local neighborhood mean
//! so uneven illumination and paper tint do not smear structure, which a
//! single global threshold would.

use crate::core::config::PreprocessConfig;
use image::{GrayImage, Luma};
use ndarray::Array2;

/// Fraction below the local mean a pixel must fall to count as ink.
/// Keeps flat background regions from flickering into foreground.
const MEAN_OFFSET: f32 = 0.85;

/// Local-mean adaptive binarizer.
#[derive(Debug, Clone)]
pub struct AdaptiveBinarizer {
    block_radius: u32,
}

impl AdaptiveBinarizer {
    /// Builds a binarizer from the preprocessing configuration.
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            block_radius: config.binarize_block_radius,
        }
    }

    /// Binarizes a grayscale image into document form (ink 0, background
    /// 255).
    ///
    /// A pixel becomes ink when it is darker than `MEAN_OFFSET` times the
    /// mean of its neighborhood, computed over a window of the configured
    /// radius via an integral image.
    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return image.clone();
        }

        let integral = integral_image(image);
        let radius = self.block_radius as i64;
        let mut out = GrayImage::new(width, height);
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let x1 = (x - radius).max(0);
                let y1 = (y - radius).max(0);
                let x2 = (x + radius).min(width as i64 - 1);
                let y2 = (y + radius).min(height as i64 - 1);
                let count = ((x2 - x1 + 1) * (y2 - y1 + 1)) as f32;
                let sum = window_sum(&integral, x1, y1, x2, y2) as f32;
                let mean = sum / count;
                let pixel = image.get_pixel(x as u32, y as u32)[0] as f32;
                let value = if pixel < mean * MEAN_OFFSET { 0u8 } else { 255u8 };
                out.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }
        out
    }
}

/// Inverts a document-form binary image into an ink mask (ink 255), the
/// foreground convention contour extraction expects.
pub fn ink_mask(document: &GrayImage) -> GrayImage {
    let mut mask = document.clone();
    for pixel in mask.pixels_mut() {
        pixel[0] = 255 - pixel[0];
    }
    mask
}

/// Fraction of ink pixels in a document-form binary image.
pub fn ink_ratio(document: &GrayImage) -> f32 {
    let total = document.width() as u64 * document.height() as u64;
    if total == 0 {
        return 0.0;
    }
    let ink = document.pixels().filter(|p| p[0] < 128).count() as u64;
    ink as f32 / total as f32
}

/// Summed-area table with one row and column of zero padding.
fn integral_image(image: &GrayImage) -> Array2<u64> {
    let (width, height) = image.dimensions();
    let mut integral = Array2::<u64>::zeros((height as usize + 1, width as usize + 1));
    for y in 0..height as usize {
        let mut row_sum = 0u64;
        for x in 0..width as usize {
            row_sum += image.get_pixel(x as u32, y as u32)[0] as u64;
            integral[(y + 1, x + 1)] = integral[(y, x + 1)] + row_sum;
        }
    }
    integral
}

/// Inclusive window sum over the padded summed-area table.
fn window_sum(integral: &Array2<u64>, x1: i64, y1: i64, x2: i64, y2: i64) -> u64 {
    let (x1, y1, x2, y2) = (x1 as usize, y1 as usize, x2 as usize + 1, y2 as usize + 1);
    integral[(y2, x2)] + integral[(y1, x1)] - integral[(y1, x2)] - integral[(y2, x1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    #[test]
    fn test_blank_page_stays_background() {
        let binarizer = AdaptiveBinarizer::from_config(&PreprocessConfig::with_target_dpi(300));
        let image = GrayImage::from_pixel(64, 64, Luma([240u8]));
        let out = binarizer.apply(&image);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_dark_block_becomes_ink() {
        let binarizer = AdaptiveBinarizer::from_config(&PreprocessConfig::with_target_dpi(300));
        let mut image = GrayImage::from_pixel(64, 64, Luma([240u8]));
        draw_filled_rect_mut(&mut image, Rect::at(20, 20).of_size(16, 16), Luma([30u8]));
        let out = binarizer.apply(&image);
        assert_eq!(out.get_pixel(28, 28)[0], 0);
        assert_eq!(out.get_pixel(2, 2)[0], 255);
    }

    #[test]
    fn test_uneven_illumination_handled() {
        // Left half dim, right half bright, dark text on both halves.
        let mut image = GrayImage::new(64, 32);
        for y in 0..32 {
            for x in 0..64 {
                let background = if x < 32 { 140u8 } else { 230u8 };
                image.put_pixel(x, y, Luma([background]));
            }
        }
        draw_filled_rect_mut(&mut image, Rect::at(8, 12).of_size(8, 8), Luma([40u8]));
        draw_filled_rect_mut(&mut image, Rect::at(44, 12).of_size(8, 8), Luma([90u8]));
        let binarizer = AdaptiveBinarizer::from_config(&PreprocessConfig::with_target_dpi(300));
        let out = binarizer.apply(&image);
        assert_eq!(out.get_pixel(12, 16)[0], 0, "text lost in dim half");
        assert_eq!(out.get_pixel(48, 16)[0], 0, "text lost in bright half");
    }

    #[test]
    fn test_ink_mask_inverts() {
        let mut document = GrayImage::from_pixel(4, 4, Luma([255u8]));
        document.put_pixel(1, 1, Luma([0u8]));
        let mask = ink_mask(&document);
        assert_eq!(mask.get_pixel(1, 1)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_ink_ratio() {
        let mut document = GrayImage::from_pixel(10, 10, Luma([255u8]));
        for x in 0..10 {
            document.put_pixel(x, 0, Luma([0u8]));
        }
        assert!((ink_ratio(&document) - 0.1).abs() < 1e-6);
        assert_eq!(ink_ratio(&GrayImage::new(0, 0)), 0.0);
    }
}
