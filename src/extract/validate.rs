//! Field completeness and quality validation.
//!
//! Pure computation over the extracted field set and the template's
//! declarations: no I/O, deterministic, recomputable from its inputs at
//! any time.

use crate::core::config::ExtractionConfig;
use crate::domain::record::{ExtractedField, ValidationResult};
use crate::domain::template::Template;

/// Validator applying required-field completeness checks, type-parse
/// outcomes, and the confidence floor.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    low_confidence_threshold: f32,
}

impl FieldValidator {
    /// Builds a validator from the extraction configuration.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            low_confidence_threshold: config.low_confidence_threshold,
        }
    }

    /// Validates an extracted field set against its template.
    ///
    /// A document is valid iff every required field carries a value. The
    /// extraction rate is the filled fraction of required fields, defined
    /// as 1.0 when the template requires nothing. Raw text without a value
    /// marks a failed type parse; low confidence is reported independently
    /// of validity.
    pub fn validate(&self, fields: &[ExtractedField], template: &Template) -> ValidationResult {
        let has_value = |name: &str| {
            fields
                .iter()
                .any(|f| f.field_name == name && f.value.is_some())
        };

        let missing_fields: Vec<String> = template
            .required_fields
            .iter()
            .filter(|name| !has_value(name))
            .cloned()
            .collect();

        let required = template.required_fields.len();
        let extraction_rate = if required == 0 {
            1.0
        } else {
            (required - missing_fields.len()) as f32 / required as f32
        };

        let invalid_fields: Vec<String> = fields
            .iter()
            .filter(|f| f.raw_text.is_some() && f.value.is_none())
            .map(|f| f.field_name.clone())
            .collect();

        let low_confidence_fields: Vec<String> = fields
            .iter()
            .filter(|f| f.confidence < self.low_confidence_threshold)
            .map(|f| f.field_name.clone())
            .collect();

        ValidationResult {
            is_valid: missing_fields.is_empty(),
            extraction_rate,
            missing_fields,
            invalid_fields,
            low_confidence_fields,
        }
    }
}
