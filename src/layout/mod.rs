//! Zone detection: segmenting a page into labeled content regions.
//!
//! The detector turns a preprocessed (document-form binary) page into a
//! list of [`Zone`]s by merging nearby ink into blocks with morphological
//! closing, taking contour bounding rectangles, and classifying each block
//! from its size, position, and aspect ratio. Detection is deterministic
//! for a given image and configuration.
//!
//! Two speed tiers exist. The **fast** tier downsamples the page first and
//! feeds the coarse fingerprint, where only approximate counts and areas
//! matter. The **full** tier runs at native resolution and feeds the fine
//! fingerprint and extraction zone alignment.

use crate::core::config::ZoneDetectionConfig;
use crate::domain::zone::{PixelRect, Zone, ZoneType};
use crate::processors::{contour_bounds, ink_mask};
use image::{GrayImage, imageops};
use imageproc::contours::{BorderType, find_contours};
use imageproc::distance_transform::Norm;
use imageproc::morphology::close;
use tracing::debug;

/// Heuristic zone detector over document-form binary images.
#[derive(Debug, Clone)]
pub struct ZoneDetector {
    config: ZoneDetectionConfig,
}

impl ZoneDetector {
    /// Builds a detector from the zone detection configuration.
    pub fn from_config(config: &ZoneDetectionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Fast detection tier.
    ///
    /// Downsamples the page by the configured factor before segmenting.
    /// Pixel bounds in the returned zones are mapped back to the input
    /// image's resolution; ratio geometry is identical either way.
    pub fn detect_fast(&self, image: &GrayImage) -> Vec<Zone> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let factor = self.config.fast_downsample.max(1);
        if factor == 1 {
            return self.detect_full(image);
        }

        let small_w = (width / factor).max(1);
        let small_h = (height / factor).max(1);
        let small = imageops::resize(image, small_w, small_h, imageops::FilterType::Triangle);
        // Downsampling blends ink into gray; restore binary form so contour
        // extraction sees solid blocks.
        let small = rebinarize(&small);

        let scale_x = width as f32 / small_w as f32;
        let scale_y = height as f32 / small_h as f32;
        let zones = self
            .segment(&small)
            .into_iter()
            .map(|bounds| {
                PixelRect::new(
                    ((bounds.x as f32 * scale_x) as u32).min(width - 1),
                    ((bounds.y as f32 * scale_y) as u32).min(height - 1),
                    ((bounds.width as f32 * scale_x) as u32).max(1),
                    ((bounds.height as f32 * scale_y) as u32).max(1),
                )
            })
            .collect::<Vec<_>>();
        self.classify_all(zones, width, height)
    }

    /// Full detection tier, at native resolution.
    pub fn detect_full(&self, image: &GrayImage) -> Vec<Zone> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let blocks = self.segment(image);
        self.classify_all(blocks, width, height)
    }

    /// Merges ink into blocks and returns their bounding rectangles,
    /// smallest-noise filtered, in arbitrary order.
    fn segment(&self, image: &GrayImage) -> Vec<PixelRect> {
        let (width, height) = image.dimensions();
        let page_area = (width as u64 * height as u64) as f32;
        let min_area = (page_area * self.config.min_zone_area_ratio).max(1.0) as u64;

        let radius = ((width as f32 * self.config.merge_radius_ratio).round() as u32)
            .clamp(1, u8::MAX as u32) as u8;
        let mask = close(&ink_mask(image), Norm::LInf, radius);

        let blocks: Vec<PixelRect> = find_contours::<u32>(&mask)
            .iter()
            .filter(|contour| contour.border_type == BorderType::Outer)
            .filter_map(contour_bounds)
            .filter(|bounds| bounds.area() >= min_area)
            .collect();
        debug!(count = blocks.len(), radius, "segmented content blocks");
        blocks
    }

    /// Classifies blocks and orders them top-to-bottom, left-to-right.
    fn classify_all(&self, blocks: Vec<PixelRect>, width: u32, height: u32) -> Vec<Zone> {
        let mut zones: Vec<Zone> = blocks
            .into_iter()
            .map(|bounds| {
                let kind = self.classify(bounds, width, height);
                Zone::from_pixels(kind, bounds, width, height)
            })
            .collect();
        zones.sort_by_key(|z| (z.bounds.y, z.bounds.x));
        zones
    }

    /// Position/size/aspect classification of one block.
    ///
    /// Small compact blocks in the header band are logos; other header-band
    /// blocks are headers. Blocks in the footer band are footers. Wide,
    /// tall central blocks are tables. Everything else is other.
    fn classify(&self, bounds: PixelRect, width: u32, height: u32) -> ZoneType {
        let w = width as f32;
        let h = height as f32;
        let center_y = (bounds.y as f32 + bounds.height as f32 / 2.0) / h;
        let area_ratio = bounds.area() as f32 / (w * h);
        let aspect = if bounds.height == 0 {
            f32::MAX
        } else {
            bounds.width as f32 / bounds.height as f32
        };

        if center_y <= self.config.header_band_ratio {
            if area_ratio <= self.config.logo_max_area_ratio && aspect <= self.config.logo_max_aspect
            {
                return ZoneType::Logo;
            }
            return ZoneType::Header;
        }
        if center_y >= self.config.footer_band_ratio {
            return ZoneType::Footer;
        }
        let width_ratio = bounds.width as f32 / w;
        let height_ratio = bounds.height as f32 / h;
        if width_ratio >= self.config.table_min_width_ratio
            && height_ratio >= self.config.table_min_height_ratio
        {
            return ZoneType::Table;
        }
        ZoneType::Other
    }
}

/// Snaps a resampled (blended) binary image back to pure ink/background.
fn rebinarize(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = if pixel[0] < 192 { 0 } else { 255 };
    }
    out
}
