//! Non-local-means denoising.
//!
//! Scanner sensor noise corrupts adaptive binarization, so documents are
//! denoised first. Non-local means averages pixels whose surrounding
//! patches look alike rather than pixels that merely sit nearby, which
//! preserves stroke edges far better than a blur kernel.

use crate::core::config::PreprocessConfig;
use image::GrayImage;
use ndarray::Array2;
use rayon::prelude::*;

/// Patch-similarity denoiser.
#[derive(Debug, Clone)]
pub struct NonLocalMeans {
    strength: f32,
    patch_radius: i64,
    search_radius: i64,
}

impl NonLocalMeans {
    /// Builds a denoiser from the preprocessing configuration.
    pub fn from_config(config: &PreprocessConfig) -> Self {
        Self {
            strength: config.denoise_strength,
            patch_radius: config.denoise_patch_radius as i64,
            search_radius: config.denoise_search_radius as i64,
        }
    }

    /// Denoises a grayscale image.
    ///
    /// Rows are processed in parallel; borders are handled by clamping
    /// patch coordinates into the image.
    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return image.clone();
        }

        let src = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            image.get_pixel(x as u32, y as u32)[0] as f32
        });
        let h2 = self.strength * self.strength;
        let rows: Vec<Vec<u8>> = (0..height as i64)
            .into_par_iter()
            .map(|y| {
                (0..width as i64)
                    .map(|x| self.filtered_pixel(&src, x, y, h2))
                    .collect()
            })
            .collect();

        let mut out = GrayImage::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                out.put_pixel(x as u32, y as u32, image::Luma([value]));
            }
        }
        out
    }

    fn filtered_pixel(&self, src: &Array2<f32>, x: i64, y: i64, h2: f32) -> u8 {
        let mut weight_sum = 0.0f32;
        let mut value_sum = 0.0f32;
        for dy in -self.search_radius..=self.search_radius {
            for dx in -self.search_radius..=self.search_radius {
                let qx = x + dx;
                let qy = y + dy;
                let d2 = self.patch_distance(src, x, y, qx, qy);
                let weight = (-d2 / h2).exp();
                weight_sum += weight;
                value_sum += weight * clamped(src, qx, qy);
            }
        }
        (value_sum / weight_sum).round().clamp(0.0, 255.0) as u8
    }

    /// Mean squared difference between the patches centered on p and q.
    fn patch_distance(&self, src: &Array2<f32>, px: i64, py: i64, qx: i64, qy: i64) -> f32 {
        let mut sum = 0.0f32;
        let mut count = 0.0f32;
        for dy in -self.patch_radius..=self.patch_radius {
            for dx in -self.patch_radius..=self.patch_radius {
                let a = clamped(src, px + dx, py + dy);
                let b = clamped(src, qx + dx, qy + dy);
                let diff = a - b;
                sum += diff * diff;
                count += 1.0;
            }
        }
        sum / count
    }
}

/// Reads a pixel with coordinates clamped into the image.
fn clamped(src: &Array2<f32>, x: i64, y: i64) -> f32 {
    let (rows, cols) = src.dim();
    let y = y.clamp(0, rows as i64 - 1) as usize;
    let x = x.clamp(0, cols as i64 - 1) as usize;
    src[(y, x)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn config() -> PreprocessConfig {
        PreprocessConfig::with_target_dpi(300)
    }

    #[test]
    fn test_uniform_image_unchanged() {
        let denoiser = NonLocalMeans::from_config(&config());
        let image = GrayImage::from_pixel(16, 16, Luma([200u8]));
        let out = denoiser.apply(&image);
        assert!(out.pixels().all(|p| p[0] == 200));
    }

    #[test]
    fn test_isolated_speck_is_attenuated() {
        let denoiser = NonLocalMeans::from_config(&config());
        let mut image = GrayImage::from_pixel(16, 16, Luma([255u8]));
        image.put_pixel(8, 8, Luma([0u8]));
        let out = denoiser.apply(&image);
        // The lone dark pixel should move toward the white background.
        assert!(out.get_pixel(8, 8)[0] > 0);
    }

    #[test]
    fn test_strong_edge_survives() {
        let denoiser = NonLocalMeans::from_config(&config());
        let mut image = GrayImage::from_pixel(16, 16, Luma([255u8]));
        for y in 0..16 {
            for x in 0..8 {
                image.put_pixel(x, y, Luma([0u8]));
            }
        }
        let out = denoiser.apply(&image);
        // Deep inside each half, values stay near their side of the edge.
        assert!(out.get_pixel(2, 8)[0] < 64);
        assert!(out.get_pixel(13, 8)[0] > 192);
    }

    #[test]
    fn test_empty_image_is_total() {
        let denoiser = NonLocalMeans::from_config(&config());
        let image = GrayImage::new(0, 0);
        let out = denoiser.apply(&image);
        assert_eq!(out.dimensions(), (0, 0));
    }
}
