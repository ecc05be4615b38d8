//! Image preprocessing ahead of any measurement.
//!
//! The steps run in a fixed order: grayscale, deskew, denoise, adaptive
//! binarization, resolution normalization, border crop. The order matters:
//! denoising precedes binarization because thresholding noisy input
//! corrupts structure, and deskewing precedes zone detection because zone
//! geometry assumes upright content.
//!
//! Preprocessing is total. A featureless page passes through every step
//! and comes out as a valid (possibly blank) page; only an undecodable or
//! zero-size input is an error, reported before the first step runs.

use crate::core::config::{ConfigValidator, PreprocessConfig};
use crate::core::errors::{PipelineError, PipelineResult};
use crate::processors::{AdaptiveBinarizer, BorderCropper, Deskewer, NonLocalMeans};
use image::{DynamicImage, GrayImage, imageops};
use tracing::debug;

/// A preprocessed page plus the corrections that were applied, kept for
/// observability.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    /// The page in document form: ink at 0, background at 255, normalized
    /// resolution, margins removed.
    pub image: GrayImage,
    /// Rotation applied by the deskew step, in degrees, if any.
    pub applied_rotation: Option<f32>,
    /// Scale factor applied by resolution normalization.
    pub resample_scale: f32,
}

/// The fixed preprocessing chain.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
    deskewer: Deskewer,
    denoiser: NonLocalMeans,
    binarizer: AdaptiveBinarizer,
    cropper: BorderCropper,
}

impl Preprocessor {
    /// Builds the chain, validating the configuration.
    ///
    /// A missing target resolution fails here, at construction, never
    /// per-document.
    pub fn from_config(config: &PreprocessConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            deskewer: Deskewer::from_config(config),
            denoiser: NonLocalMeans::from_config(config),
            binarizer: AdaptiveBinarizer::from_config(config),
            cropper: BorderCropper::from_config(config),
        })
    }

    /// Runs the full chain on a decoded image.
    pub fn preprocess(&self, image: &DynamicImage) -> PipelineResult<PreprocessedImage> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(PipelineError::invalid_input(format!(
                "zero-size image ({width}x{height})"
            )));
        }

        let gray = image.to_luma8();
        let (gray, applied_rotation) = self.deskewer.apply(gray);
        let gray = self.denoiser.apply(&gray);
        let gray = self.binarizer.apply(&gray);
        let (gray, resample_scale) = self.normalize_resolution(gray);
        let gray = self.cropper.apply(gray);

        debug!(
            width = gray.width(),
            height = gray.height(),
            ?applied_rotation,
            resample_scale,
            "preprocessing complete"
        );
        Ok(PreprocessedImage {
            image: gray,
            applied_rotation,
            resample_scale,
        })
    }

    /// Resamples the page to the configured target resolution.
    ///
    /// Raster inputs carry no physical DPI, so the scale is anchored on
    /// width: the normalized page is `target_dpi * page_width_inches`
    /// pixels wide. Cubic resampling blends the binary page at stroke
    /// edges, so values are snapped back to document form afterwards.
    fn normalize_resolution(&self, image: GrayImage) -> (GrayImage, f32) {
        let target_width = self.config.target_width_px();
        let width = image.width();
        if width == target_width {
            return (image, 1.0);
        }
        let scale = target_width as f32 / width as f32;
        let target_height = ((image.height() as f32 * scale).round() as u32).max(1);
        let mut resized = imageops::resize(
            &image,
            target_width,
            target_height,
            imageops::FilterType::CatmullRom,
        );
        for pixel in resized.pixels_mut() {
            pixel[0] = if pixel[0] < 128 { 0 } else { 255 };
        }
        (resized, scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn config() -> PreprocessConfig {
        // 50 dpi over an 8.5 inch page: 425 pixels wide. The narrow
        // denoise search window keeps test pages cheap.
        PreprocessConfig {
            denoise_search_radius: 1,
            ..PreprocessConfig::with_target_dpi(50)
        }
    }

    fn content_page(width: u32, height: u32) -> DynamicImage {
        let mut page = GrayImage::from_pixel(width, height, Luma([235u8]));
        let w = width as i32;
        let h = height as i32;
        draw_filled_rect_mut(
            &mut page,
            Rect::at(w / 10, h / 10).of_size(width * 8 / 10, height / 10),
            Luma([40u8]),
        );
        draw_filled_rect_mut(
            &mut page,
            Rect::at(w / 10, h / 3).of_size(width * 8 / 10, height / 3),
            Luma([40u8]),
        );
        DynamicImage::ImageLuma8(page)
    }

    #[test]
    fn test_missing_target_dpi_fails_at_construction() {
        let result = Preprocessor::from_config(&PreprocessConfig::default());
        assert!(matches!(result, Err(PipelineError::ConfigError { .. })));
    }

    #[test]
    fn test_zero_size_input_is_invalid_input() {
        let preprocessor = Preprocessor::from_config(&config()).expect("valid config");
        let image = DynamicImage::new_luma8(0, 0);
        assert!(matches!(
            preprocessor.preprocess(&image),
            Err(PipelineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_output_is_normalized_and_nonzero() {
        let preprocessor = Preprocessor::from_config(&config()).expect("valid config");
        let out = preprocessor
            .preprocess(&content_page(850, 1100))
            .expect("total");
        // Border crop may trim the normalized page but never widens it.
        assert!(out.image.width() > 0 && out.image.height() > 0);
        assert!(out.image.width() <= 425);
        assert!((out.resample_scale - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_blank_page_is_total() {
        let preprocessor = Preprocessor::from_config(&config()).expect("valid config");
        let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(425, 550, Luma([250u8])));
        let out = preprocessor.preprocess(&blank).expect("total");
        assert_eq!(out.image.width(), 425);
        assert!(out.applied_rotation.is_none());
    }

    #[test]
    fn test_output_is_document_form_binary() {
        let preprocessor = Preprocessor::from_config(&config()).expect("valid config");
        let out = preprocessor
            .preprocess(&content_page(425, 550))
            .expect("total");
        assert!(out.image.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_two_scan_resolutions_converge() {
        let preprocessor = Preprocessor::from_config(&config()).expect("valid config");
        let low = preprocessor
            .preprocess(&content_page(425, 550))
            .expect("total");
        let high = preprocessor
            .preprocess(&content_page(1275, 1650))
            .expect("total");
        let dw = (low.image.width() as i64 - high.image.width() as i64).abs();
        let dh = (low.image.height() as i64 - high.image.height() as i64).abs();
        assert!(dw <= 8, "widths diverge by {dw}");
        assert!(dh <= 8, "heights diverge by {dh}");
    }
}
