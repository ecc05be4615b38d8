//! OCR engine abstraction.
//!
//! Zonal extraction reads text through the [`OcrEngine`] trait so the
//! concrete engine is a deployment decision: Tesseract behind the
//! `tesseract` cargo feature, a disabled stub for layout-only use, and
//! mock engines in tests.

#[cfg(feature = "tesseract")]
pub mod tesseract;

use crate::core::config::{OcrConfig, OcrEngineKind};
use crate::core::errors::{PipelineError, PipelineResult};
use image::GrayImage;
use std::sync::Arc;
use tracing::debug;

/// Raw output of one OCR invocation over a cropped region.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    /// Recognized text, not yet trimmed or parsed.
    pub text: String,
    /// Engine-reported confidence in [0, 1].
    pub confidence: f32,
}

impl OcrOutput {
    /// Output representing an unreadable or empty region.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }
}

/// A text recognition engine operating on cropped grayscale regions.
///
/// Engines may block; OCR latency is expected and not a failure mode.
/// Implementations must be shareable across worker threads.
pub trait OcrEngine: Send + Sync + std::fmt::Debug {
    /// Short engine identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Recognizes text in the given region.
    fn recognize(&self, region: &GrayImage) -> PipelineResult<OcrOutput>;
}

/// Engine stub used when OCR is disabled by configuration.
///
/// Every zonal field degrades to a null value; matching and layout
/// analysis keep working.
#[derive(Debug, Default)]
pub struct DisabledOcrEngine;

impl OcrEngine for DisabledOcrEngine {
    fn name(&self) -> &str {
        "disabled"
    }

    fn recognize(&self, _region: &GrayImage) -> PipelineResult<OcrOutput> {
        debug!("ocr disabled; returning empty output");
        Ok(OcrOutput::empty())
    }
}

/// Constructs the engine selected by the configuration.
///
/// Selecting Tesseract without the `tesseract` cargo feature is a
/// configuration error reported at pipeline construction.
pub fn engine_from_config(config: &OcrConfig) -> PipelineResult<Arc<dyn OcrEngine>> {
    match config.engine {
        OcrEngineKind::Disabled => Ok(Arc::new(DisabledOcrEngine)),
        OcrEngineKind::Tesseract => {
            #[cfg(feature = "tesseract")]
            {
                Ok(Arc::new(tesseract::TesseractEngine::new(&config.language)?))
            }
            #[cfg(not(feature = "tesseract"))]
            {
                Err(PipelineError::config_error_detailed(
                    "ocr engine selection",
                    "engine 'tesseract' requires building with the `tesseract` feature",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_engine_returns_empty() {
        let engine = DisabledOcrEngine;
        let region = GrayImage::new(10, 10);
        let out = engine.recognize(&region).expect("disabled engine is total");
        assert_eq!(out, OcrOutput::empty());
    }

    #[test]
    fn test_disabled_kind_constructs() {
        let config = OcrConfig {
            engine: OcrEngineKind::Disabled,
            ..OcrConfig::default()
        };
        let engine = engine_from_config(&config).expect("disabled engine");
        assert_eq!(engine.name(), "disabled");
    }

    #[cfg(not(feature = "tesseract"))]
    #[test]
    fn test_tesseract_without_feature_is_config_error() {
        let config = OcrConfig::default();
        assert!(matches!(
            engine_from_config(&config),
            Err(PipelineError::ConfigError { .. })
        ));
    }
}
