//! Image loading and conversion helpers.

use crate::core::errors::{PipelineError, PipelineResult};
use image::{DynamicImage, GrayImage};
use std::path::Path;

/// Loads and decodes an image file.
///
/// An undecodable file or a decoded image with a zero dimension is an
/// input error, distinct from any downstream "no match" outcome.
pub fn load_image(path: impl AsRef<Path>) -> PipelineResult<DynamicImage> {
    let path = path.as_ref();
    let image = image::open(path)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::invalid_input(format!(
            "zero-size image at '{}'",
            path.display()
        )));
    }
    Ok(image)
}

/// Converts any decoded image into the grayscale working form.
pub fn dynamic_to_gray(image: &DynamicImage) -> GrayImage {
    image.to_luma8()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_image("/nonexistent/scan.png").is_err());
    }

    #[test]
    fn test_dynamic_to_gray_keeps_dimensions() {
        let image = DynamicImage::new_rgb8(32, 48);
        let gray = dynamic_to_gray(&image);
        assert_eq!(gray.dimensions(), (32, 48));
    }
}
