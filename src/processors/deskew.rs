//! Skew estimation and rotation correction.
//!
//! Scanned pages are rarely perfectly upright. This step estimates the
//! dominant line orientation via a Hough transform over detected edges and
//! rotates the page back to upright. When no dominant orientation can be
//! found the image passes through unrotated: preprocessing is total and
//! never fails a document for being featureless.

use crate::core::config::PreprocessConfig;
use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use imageproc::hough::{LineDetectionOptions, detect_lines};
use tracing::debug;

/// Rotations smaller than this are left alone; resampling cost outweighs
/// the correction.
const MIN_CORRECTION_DEGREES: f32 = 0.5;

/// Hough peak suppression radius in (r, theta) space.
const SUPPRESSION_RADIUS: u32 = 8;

/// Line-detection based skew corrector.
#[derive(Debug, Clone)]
pub struct Deskewer {
    max_angle_degrees: f32,
    vote_threshold: u32,
    canny_low: f32,
    canny_high: f32,
}

impl Deskewer {
    /// Builds a deskewer from the preprocessing configuration.
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            max_angle_degrees: config.deskew_max_angle_degrees,
            vote_threshold: config.deskew_vote_threshold,
            canny_low: config.canny_low,
            canny_high: config.canny_high,
        }
    }

    /// Estimates the dominant skew angle in degrees.
    ///
    /// Lines close to horizontal or vertical vote with their deviation from
    /// the nearest axis; the median deviation wins. Returns None when no
    /// line passes the vote threshold within the configured angle window,
    /// in which case the caller should pass the image through unrotated.
    pub fn estimate_skew(&self, image: &GrayImage) -> Option<f32> {
        let edges = canny(image, self.canny_low, self.canny_high);
        let lines = detect_lines(
            &edges,
            LineDetectionOptions {
                vote_threshold: self.vote_threshold,
                suppression_radius: SUPPRESSION_RADIUS,
            },
        );

        // PolarLine angles are the orientation of the line normal in
        // [0, 180). A horizontal text baseline has a vertical normal (90);
        // ruled verticals have a horizontal normal (0 or 180).
        let mut deviations: Vec<f32> = lines
            .iter()
            .filter_map(|line| {
                let theta = line.angle_in_degrees as f32;
                let from_horizontal = theta - 90.0;
                let from_vertical = if theta <= 90.0 { theta } else { theta - 180.0 };
                let deviation = if from_horizontal.abs() <= from_vertical.abs() {
                    from_horizontal
                } else {
                    from_vertical
                };
                (deviation.abs() <= self.max_angle_degrees).then_some(deviation)
            })
            .collect();

        if deviations.is_empty() {
            return None;
        }
        deviations.sort_by(f32::total_cmp);
        Some(deviations[deviations.len() / 2])
    }

    /// Rotates the image upright.
    ///
    /// Returns the corrected image and the angle that was applied, if any.
    /// Uncovered corners are filled with white, matching paper background.
    pub fn apply(&self, image: GrayImage) -> (GrayImage, Option<f32>) {
        match self.estimate_skew(&image) {
            Some(angle) if angle.abs() >= MIN_CORRECTION_DEGREES => {
                debug!(angle, "correcting skew");
                let rotated = rotate_about_center(
                    &image,
                    -angle.to_radians(),
                    Interpolation::Bilinear,
                    Luma([255u8]),
                );
                (rotated, Some(angle))
            }
            Some(angle) => {
                debug!(angle, "skew below correction threshold");
                (image, None)
            }
            None => {
                debug!("no dominant line orientation; passing through");
                (image, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    fn blank_page(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([255u8]))
    }

    fn ruled_page() -> GrayImage {
        let mut page = blank_page(400, 400);
        for row in [80, 160, 240, 320] {
            draw_filled_rect_mut(&mut page, Rect::at(20, row).of_size(360, 3), Luma([0u8]));
        }
        page
    }

    #[test]
    fn test_blank_page_has_no_dominant_orientation() {
        let deskewer = Deskewer::from_config(&PreprocessConfig::with_target_dpi(300));
        assert!(deskewer.estimate_skew(&blank_page(300, 300)).is_none());
    }

    #[test]
    fn test_blank_page_passes_through() {
        let deskewer = Deskewer::from_config(&PreprocessConfig::with_target_dpi(300));
        let page = blank_page(300, 300);
        let (out, applied) = deskewer.apply(page.clone());
        assert!(applied.is_none());
        assert_eq!(out.dimensions(), page.dimensions());
    }

    #[test]
    fn test_upright_ruling_needs_no_correction() {
        let deskewer = Deskewer::from_config(&PreprocessConfig::with_target_dpi(300));
        let (_, applied) = deskewer.apply(ruled_page());
        // Horizontal rules deviate ~0 degrees from the axis.
        assert!(applied.is_none());
    }

    #[test]
    fn test_apply_is_total_for_tiny_images() {
        let deskewer = Deskewer::from_config(&PreprocessConfig::with_target_dpi(300));
        let (out, _) = deskewer.apply(blank_page(3, 3));
        assert_eq!(out.dimensions(), (3, 3));
    }
}
