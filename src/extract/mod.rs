//! Template-driven field extraction.
//!
//! Given a matched template, the extractor produces one [`ExtractedField`]
//! per declared field mapping: it resolves the field's zone, crops the
//! region from the preprocessed page, reads a raw value through the field's
//! declared [`Strategy`], and parses it with the declared [`FieldType`].
//! Extraction is total per field: an unresolvable zone, an unreadable
//! region, or a failed parse all yield a null or penalized field, never an
//! omission and never an error.

pub mod parsers;
pub mod validate;

pub use validate::FieldValidator;

use crate::core::config::ExtractionConfig;
use crate::core::errors::PipelineResult;
use crate::domain::record::ExtractedField;
use crate::domain::template::{FieldType, Strategy, Template};
use crate::domain::zone::RatioRect;
use crate::ocr::{OcrEngine, OcrOutput};
use crate::processors::ink_ratio;
use image::{GrayImage, imageops};
use std::sync::Arc;
use tracing::{debug, warn};

/// A language-model reader for fields declaring the LLM strategy.
///
/// Injected by the deployment; the core never talks to a model service
/// itself. Without a reader, LLM fields degrade to null values.
pub trait LlmReader: Send + Sync + std::fmt::Debug {
    /// Reads the named field's value from the cropped region.
    fn read_field(&self, region: &GrayImage, field_name: &str) -> PipelineResult<OcrOutput>;
}

/// Zone-based field extractor over preprocessed pages.
#[derive(Debug)]
pub struct FieldExtractor {
    config: ExtractionConfig,
    engine: Arc<dyn OcrEngine>,
    llm: Option<Arc<dyn LlmReader>>,
}

impl FieldExtractor {
    /// Builds an extractor with the given OCR engine.
    pub fn new(config: &ExtractionConfig, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            config: config.clone(),
            engine,
            llm: None,
        }
    }

    /// Injects a language-model reader for LLM-strategy fields.
    pub fn with_llm_reader(mut self, reader: Arc<dyn LlmReader>) -> Self {
        self.llm = Some(reader);
        self
    }

    /// Extracts every field the template declares, in mapping order.
    pub fn extract(&self, image: &GrayImage, template: &Template) -> Vec<ExtractedField> {
        template
            .field_mappings
            .keys()
            .map(|field_name| self.extract_field(image, template, field_name))
            .collect()
    }

    fn extract_field(
        &self,
        image: &GrayImage,
        template: &Template,
        field_name: &str,
    ) -> ExtractedField {
        let strategy = template
            .extraction_strategies
            .get(field_name)
            .copied()
            .unwrap_or_default();
        let field_type: FieldType = template
            .field_types
            .get(field_name)
            .copied()
            .unwrap_or_default();

        let (zone_name, region) = self.resolve_region(image, template, field_name);
        let output = match self.read_region(&region, strategy, field_name) {
            Ok(output) => output,
            Err(error) => {
                warn!(field_name, %error, "strategy failed; field degrades to null");
                return null_field(field_name, strategy, zone_name);
            }
        };

        let raw = output.text.trim();
        if raw.is_empty() {
            debug!(field_name, "nothing read from region");
            return null_field(field_name, strategy, zone_name);
        }

        let value = parsers::parse_field(raw, field_type);
        let confidence = if value.is_some() {
            (output.confidence + self.config.type_parse_bonus).clamp(0.0, 1.0)
        } else {
            (output.confidence - self.config.type_parse_penalty).clamp(0.0, 1.0)
        };
        ExtractedField {
            field_name: field_name.to_string(),
            value,
            raw_text: Some(raw.to_string()),
            confidence,
            source: strategy,
            zone_name,
        }
    }

    /// Resolves a field's region: its own named zone, then the configured
    /// general fallback zone, then the full page.
    fn resolve_region(
        &self,
        image: &GrayImage,
        template: &Template,
        field_name: &str,
    ) -> (Option<String>, GrayImage) {
        let named = template
            .zone_definitions
            .get(field_name)
            .map(|rect| (field_name.to_string(), rect))
            .or_else(|| {
                template
                    .zone_definitions
                    .get(&self.config.fallback_zone)
                    .map(|rect| (self.config.fallback_zone.clone(), rect))
            });
        match named {
            Some((name, rect)) => (Some(name), crop_ratio(image, rect)),
            None => {
                debug!(field_name, "no zone resolved; searching full page");
                (None, image.clone())
            }
        }
    }

    /// The single strategy dispatch point.
    fn read_region(
        &self,
        region: &GrayImage,
        strategy: Strategy,
        field_name: &str,
    ) -> PipelineResult<OcrOutput> {
        match strategy {
            Strategy::ZonalOcr => self.engine.recognize(region),
            Strategy::Contour => Ok(self.read_mark(region)),
            Strategy::Llm => match &self.llm {
                Some(reader) => reader.read_field(region, field_name),
                None => {
                    warn!(field_name, "llm strategy declared but no reader injected");
                    Ok(OcrOutput::empty())
                }
            },
        }
    }

    /// Contour/ink analysis for mark-style fields (checkboxes, stamps).
    ///
    /// A region whose ink coverage clears the configured threshold reads as
    /// "marked"; confidence grows with coverage and saturates at twice the
    /// threshold.
    fn read_mark(&self, region: &GrayImage) -> OcrOutput {
        let ratio = ink_ratio(region);
        if ratio >= self.config.mark_ink_threshold {
            OcrOutput {
                text: "marked".to_string(),
                confidence: (ratio / (2.0 * self.config.mark_ink_threshold)).min(1.0),
            }
        } else {
            OcrOutput::empty()
        }
    }
}

/// Crops the pixel region a ratio rectangle selects on the given page.
fn crop_ratio(image: &GrayImage, rect: &RatioRect) -> GrayImage {
    let bounds = rect.to_pixels(image.width(), image.height());
    imageops::crop_imm(image, bounds.x, bounds.y, bounds.width, bounds.height).to_image()
}

/// The field produced when nothing could be read.
fn null_field(field_name: &str, source: Strategy, zone_name: Option<String>) -> ExtractedField {
    ExtractedField {
        field_name: field_name.to_string(),
        value: None,
        raw_text: None,
        confidence: 0.0,
        source,
        zone_name,
    }
}
