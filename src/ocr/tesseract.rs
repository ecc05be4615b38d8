//! Tesseract-backed OCR engine via leptess.

use super::{OcrEngine, OcrOutput};
use crate::core::errors::{PipelineError, PipelineResult};
use image::{DynamicImage, GrayImage, ImageFormat};
use leptess::LepTess;
use std::io::Cursor;
use std::sync::Mutex;

/// Tesseract engine. The underlying handle is stateful, so invocations are
/// serialized through a mutex; deployments wanting per-worker throughput
/// construct one pipeline (and thus one engine) per worker.
pub struct TesseractEngine {
    inner: Mutex<LepTess>,
    language: String,
}

impl std::fmt::Debug for TesseractEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TesseractEngine")
            .field("language", &self.language)
            .finish()
    }
}

impl TesseractEngine {
    /// Initializes Tesseract with the given language pack.
    pub fn new(language: &str) -> PipelineResult<Self> {
        let inner = LepTess::new(None, language).map_err(|e| {
            PipelineError::ocr(
                "tesseract",
                format!("initialization failed for language '{language}': {e}"),
            )
        })?;
        Ok(Self {
            inner: Mutex::new(inner),
            language: language.to_string(),
        })
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, region: &GrayImage) -> PipelineResult<OcrOutput> {
        if region.width() == 0 || region.height() == 0 {
            return Ok(OcrOutput::empty());
        }

        // leptess consumes encoded image bytes.
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(region.clone())
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| PipelineError::ocr("tesseract", format!("region encode failed: {e}")))?;

        let mut engine = self
            .inner
            .lock()
            .map_err(|_| PipelineError::ocr("tesseract", "engine mutex poisoned"))?;
        engine
            .set_image_from_mem(png.get_ref())
            .map_err(|e| PipelineError::ocr("tesseract", format!("set_image failed: {e}")))?;

        let text = engine
            .get_utf8_text()
            .map_err(|e| PipelineError::ocr("tesseract", format!("text read failed: {e}")))?;
        let confidence = (engine.mean_text_conf().max(0) as f32 / 100.0).min(1.0);

        Ok(OcrOutput {
            text: text.trim().to_string(),
            confidence,
        })
    }
}
