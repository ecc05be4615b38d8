//! The end-to-end document pipeline and its builder.
//!
//! One pipeline owns every stage: preprocess, zone detection, fingerprint
//! construction, template matching, field extraction, and validation. A
//! single document runs the whole chain synchronously; batches fan out
//! across rayon workers per the configured parallel policy. The pipeline
//! holds no per-document state, so one instance serves any number of
//! concurrent callers.

use super::preprocess::Preprocessor;
use crate::core::config::{ConfigValidator, ParallelPolicy, PipelineConfig};
use crate::core::errors::PipelineResult;
use crate::domain::fingerprint::{CoarseFingerprint, FineFingerprint};
use crate::domain::record::DocumentRecord;
use crate::domain::template::Template;
use crate::extract::{FieldExtractor, FieldValidator, LlmReader};
use crate::layout::ZoneDetector;
use crate::matching::{TemplateLibrary, TemplateMatcher};
use crate::ocr::{OcrEngine, engine_from_config};
use image::DynamicImage;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::info;

/// Builder for [`DocumentPipeline`].
///
/// Configuration is validated once, at [`build`](Self::build); a
/// misconfigured pipeline never processes a document.
#[derive(Debug, Default)]
pub struct DocumentPipelineBuilder {
    config: PipelineConfig,
    templates: Vec<Template>,
    engine: Option<Arc<dyn OcrEngine>>,
    llm: Option<Arc<dyn LlmReader>>,
}

impl DocumentPipelineBuilder {
    /// Starts a builder from a pipeline configuration.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Seeds the template library.
    pub fn with_templates(mut self, templates: Vec<Template>) -> Self {
        self.templates = templates;
        self
    }

    /// Overrides the OCR engine the configuration would otherwise select.
    /// Tests inject mock engines here.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Injects a language-model reader for LLM-strategy fields.
    pub fn with_llm_reader(mut self, reader: Arc<dyn LlmReader>) -> Self {
        self.llm = Some(reader);
        self
    }

    /// Validates the configuration, loads the template library, and wires
    /// every stage.
    pub fn build(self) -> PipelineResult<DocumentPipeline> {
        self.config.validate()?;
        let engine = match self.engine {
            Some(engine) => engine,
            None => engine_from_config(&self.config.extraction.ocr)?,
        };
        let library = TemplateLibrary::from_templates(self.templates)?;

        let mut extractor = FieldExtractor::new(&self.config.extraction, engine);
        if let Some(reader) = self.llm {
            extractor = extractor.with_llm_reader(reader);
        }

        Ok(DocumentPipeline {
            preprocessor: Preprocessor::from_config(&self.config.preprocess)?,
            detector: ZoneDetector::from_config(&self.config.zones),
            matcher: TemplateMatcher::from_config(&self.config.matching),
            validator: FieldValidator::from_config(&self.config.extraction),
            parallel: self.config.parallel.clone(),
            extractor,
            library,
        })
    }
}

/// The assembled preprocess → match → extract → validate pipeline.
#[derive(Debug)]
pub struct DocumentPipeline {
    preprocessor: Preprocessor,
    detector: ZoneDetector,
    matcher: TemplateMatcher,
    extractor: FieldExtractor,
    validator: FieldValidator,
    library: TemplateLibrary,
    parallel: ParallelPolicy,
}

impl DocumentPipeline {
    /// Starts building a pipeline from a configuration.
    pub fn builder(config: PipelineConfig) -> DocumentPipelineBuilder {
        DocumentPipelineBuilder::new(config)
    }

    /// The template library behind this pipeline. Inserts and removals
    /// publish new snapshots; documents already in flight keep the
    /// snapshot they started with.
    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    /// Processes one document through the full chain.
    ///
    /// Recoverable conditions (a blank page, no template above threshold,
    /// unreadable fields) produce a well-formed record. The only errors
    /// are invalid input and engine-level failures.
    pub fn process(
        &self,
        image: &DynamicImage,
        calling_app_id: Option<&str>,
    ) -> PipelineResult<DocumentRecord> {
        let preprocessed = self.preprocessor.preprocess(image)?;
        let page = &preprocessed.image;
        let (width, height) = page.dimensions();
        let snapshot = self.library.snapshot();

        let fast_zones = self.detector.detect_fast(page);
        let coarse = CoarseFingerprint::from_zones(&fast_zones, width, height);
        let full_zones = self.detector.detect_full(page);
        let fine = FineFingerprint::from_zones(&full_zones, width, height);

        let (match_result, matched) =
            self.matcher
                .match_document(&coarse, &fine, &snapshot, calling_app_id);

        let record = match matched {
            Some(template) => {
                let fields = self.extractor.extract(page, &template);
                let validation = self.validator.validate(&fields, &template);
                DocumentRecord::assemble(match_result, Some((&template, fields, validation)))
            }
            None => DocumentRecord::assemble(match_result, None),
        };
        info!(
            matched = record.matched_template_id.as_deref().unwrap_or("-"),
            score = record.match_score,
            candidates = record.candidates_considered,
            "document processed"
        );
        Ok(record)
    }

    /// Processes a batch of documents, fanning out across rayon workers
    /// when the batch is large enough to be worth it.
    ///
    /// Results keep the input order; each document succeeds or fails
    /// independently.
    pub fn process_batch(
        &self,
        images: &[DynamicImage],
        calling_app_id: Option<&str>,
    ) -> Vec<PipelineResult<DocumentRecord>> {
        if images.len() <= self.parallel.batch_threshold {
            images
                .iter()
                .map(|image| self.process(image, calling_app_id))
                .collect()
        } else {
            images
                .par_iter()
                .map(|image| self.process(image, calling_app_id))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OcrEngineKind;
    use crate::domain::record::FieldValue;
    use crate::domain::template::FieldType;
    use crate::domain::zone::RatioRect;
    use crate::ocr::OcrOutput;
    use image::{GrayImage, Luma};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use std::collections::BTreeMap;

    fn test_config() -> PipelineConfig {
        let mut config = PipelineConfig::with_target_dpi(50);
        config.preprocess.denoise_search_radius = 1;
        config.extraction.ocr.engine = OcrEngineKind::Disabled;
        config
    }

    /// Renders the same synthetic receipt layout at any resolution.
    fn receipt_page(width: u32, height: u32) -> DynamicImage {
        let mut page = GrayImage::from_pixel(width, height, Luma([245u8]));
        let sx = width as f32 / 850.0;
        let sy = height as f32 / 1100.0;
        let mut block = |x: f32, y: f32, w: f32, h: f32| {
            draw_filled_rect_mut(
                &mut page,
                Rect::at((x * sx) as i32, (y * sy) as i32)
                    .of_size((w * sx) as u32, (h * sy) as u32),
                Luma([30u8]),
            );
        };
        block(250.0, 40.0, 550.0, 90.0);
        block(50.0, 40.0, 110.0, 100.0);
        block(60.0, 330.0, 730.0, 450.0);
        block(60.0, 960.0, 730.0, 70.0);
        DynamicImage::ImageLuma8(page)
    }

    /// Builds a template by fingerprinting the reference rendering through
    /// the same preprocessing and detection the pipeline will use.
    fn receipt_template(config: &PipelineConfig) -> Template {
        let preprocessor = Preprocessor::from_config(&config.preprocess).expect("config");
        let detector = ZoneDetector::from_config(&config.zones);
        let page = preprocessor
            .preprocess(&receipt_page(425, 550))
            .expect("total")
            .image;
        let (width, height) = page.dimensions();
        let full = detector.detect_full(&page);

        let mut template = Template {
            template_id: "acme-receipt-v1".to_string(),
            calling_app_id: None,
            coarse: CoarseFingerprint::from_zones(&full, width, height),
            fine: FineFingerprint::from_zones(&full, width, height),
            field_mappings: BTreeMap::new(),
            zone_definitions: BTreeMap::new(),
            required_fields: Default::default(),
            optional_fields: Default::default(),
            field_types: BTreeMap::new(),
            extraction_strategies: BTreeMap::new(),
        };
        template
            .field_mappings
            .insert("total".to_string(), "total_amount".to_string());
        template.required_fields.insert("total".to_string());
        template
            .zone_definitions
            .insert("total".to_string(), RatioRect::new(0.05, 0.85, 0.9, 0.1));
        template
            .field_types
            .insert("total".to_string(), FieldType::Currency);
        template
    }

    fn pipeline_with_template() -> DocumentPipeline {
        let config = test_config();
        let template = receipt_template(&config);
        DocumentPipeline::builder(config)
            .with_templates(vec![template])
            .build()
            .expect("pipeline builds")
    }

    #[test]
    fn test_default_config_fails_construction() {
        let result = DocumentPipeline::builder(PipelineConfig::default()).build();
        assert!(result.is_err(), "missing target dpi must fail fast");
    }

    #[test]
    fn test_zero_size_image_is_reported_as_input_error() {
        let pipeline = pipeline_with_template();
        let result = pipeline.process(&DynamicImage::new_luma8(0, 0), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_known_layout_matches_and_extracts() {
        let pipeline = pipeline_with_template();
        let record = pipeline
            .process(&receipt_page(425, 550), None)
            .expect("processes");
        assert_eq!(
            record.matched_template_id.as_deref(),
            Some("acme-receipt-v1")
        );
        assert!(record.match_score > 0.8, "score {}", record.match_score);
        // The disabled OCR engine reads nothing, so the required field is
        // present but null and validation reports it missing.
        let field = record
            .extracted_fields
            .get("total_amount")
            .expect("declared field always produces an entry");
        assert!(field.value.is_none());
        let validation = record.validation.expect("matched documents validate");
        assert!(!validation.is_valid);
        assert_eq!(validation.missing_fields, vec!["total"]);
    }

    #[test]
    fn test_blank_page_is_no_match_not_error() {
        let pipeline = pipeline_with_template();
        let blank =
            DynamicImage::ImageLuma8(GrayImage::from_pixel(425, 550, Luma([250u8])));
        let record = pipeline.process(&blank, None).expect("no error");
        assert!(record.matched_template_id.is_none());
        assert!(record.match_score < 0.1);
        assert!(record.extracted_fields.is_empty());
        assert!(record.validation.is_none());
    }

    #[test]
    fn test_same_layout_at_two_resolutions_matches_same_template() {
        let pipeline = pipeline_with_template();
        let low = pipeline
            .process(&receipt_page(425, 550), None)
            .expect("low dpi");
        let high = pipeline
            .process(&receipt_page(1275, 1650), None)
            .expect("high dpi");
        assert_eq!(
            low.matched_template_id, high.matched_template_id,
            "resolution changed the match"
        );
        assert!(high.matched_template_id.is_some());
    }

    #[test]
    fn test_mock_engine_drives_full_extraction() {
        #[derive(Debug)]
        struct TotalEngine;
        impl OcrEngine for TotalEngine {
            fn name(&self) -> &str {
                "mock"
            }
            fn recognize(&self, _: &GrayImage) -> PipelineResult<OcrOutput> {
                Ok(OcrOutput {
                    text: "$ 42.00".to_string(),
                    confidence: 0.9,
                })
            }
        }
        let config = test_config();
        let template = receipt_template(&config);
        let pipeline = DocumentPipeline::builder(config)
            .with_templates(vec![template])
            .with_ocr_engine(Arc::new(TotalEngine))
            .build()
            .expect("builds");
        let record = pipeline
            .process(&receipt_page(425, 550), None)
            .expect("processes");
        let field = record.extracted_fields.get("total_amount").expect("entry");
        assert_eq!(
            field.value,
            Some(FieldValue::Currency {
                amount: 42.0,
                symbol: Some("$".to_string()),
            })
        );
        assert!(record.validation.expect("validated").is_valid);
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let pipeline = pipeline_with_template();
        let images = vec![
            receipt_page(425, 550),
            DynamicImage::ImageLuma8(GrayImage::from_pixel(425, 550, Luma([250u8]))),
            receipt_page(425, 550),
        ];
        let results = pipeline.process_batch(&images, None);
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().expect("ok").matched_template_id.is_some());
        assert!(results[1].as_ref().expect("ok").matched_template_id.is_none());
        assert!(results[2].as_ref().expect("ok").matched_template_id.is_some());
    }

    #[test]
    fn test_template_inserted_after_build_is_visible() {
        let config = test_config();
        let template = receipt_template(&config);
        let pipeline = DocumentPipeline::builder(config).build().expect("builds");
        let before = pipeline
            .process(&receipt_page(425, 550), None)
            .expect("processes");
        assert!(before.matched_template_id.is_none());

        pipeline.library().insert(template).expect("insert");
        let after = pipeline
            .process(&receipt_page(425, 550), None)
            .expect("processes");
        assert_eq!(
            after.matched_template_id.as_deref(),
            Some("acme-receipt-v1")
        );
    }
}
