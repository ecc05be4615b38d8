//! Vendor template definitions and load-time validation.
//!
//! A template is the stored reference for one known vendor document format:
//! its fingerprints, its named extraction zones, and the declarations that
//! drive field extraction and validation. Templates are produced by an
//! external management process and are read-only here; a template that
//! fails validation is rejected when the library loads it, never mid-match.

use super::fingerprint::{CoarseFingerprint, FineFingerprint};
use super::zone::RatioRect;
use crate::core::errors::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Declared type of a field's value, selecting the parser applied to raw
/// extraction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Calendar date in any of the accepted formats.
    Date,
    /// Monetary amount, optionally with a currency symbol.
    Currency,
    /// Plain numeric value.
    Number,
    /// Free text.
    #[default]
    Text,
}

/// How a field's raw value is read out of its image region.
///
/// New strategies are added by extending this enum and its handler in the
/// field extractor; there is a single dispatch point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// OCR over the cropped zone. The default, and the only strategy a
    /// deployment must support.
    #[default]
    ZonalOcr,
    /// Ink/contour analysis of the cropped zone, for mark-style fields.
    Contour,
    /// Delegation to an injected language-model reader.
    Llm,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::ZonalOcr => write!(f, "zonal_ocr"),
            Strategy::Contour => write!(f, "contour"),
            Strategy::Llm => write!(f, "llm"),
        }
    }
}

/// Stored reference for one known vendor document format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier; also the deterministic tie-breaker between
    /// equally scored candidates.
    pub template_id: String,

    /// When set, this template only participates in searches scoped to the
    /// same calling application.
    #[serde(default)]
    pub calling_app_id: Option<String>,

    /// Phase 1 fingerprint.
    pub coarse: CoarseFingerprint,

    /// Phase 2 fingerprint.
    pub fine: FineFingerprint,

    /// Format-specific field name to canonical field name.
    #[serde(default)]
    pub field_mappings: BTreeMap<String, String>,

    /// Named extraction zones in ratio form. A field whose format name
    /// appears here is cropped to that zone.
    #[serde(default)]
    pub zone_definitions: BTreeMap<String, RatioRect>,

    /// Format field names that must extract for a document to validate.
    #[serde(default)]
    pub required_fields: BTreeSet<String>,

    /// Format field names that may extract.
    #[serde(default)]
    pub optional_fields: BTreeSet<String>,

    /// Declared value type per format field name. Fields without an entry
    /// default to text.
    #[serde(default)]
    pub field_types: BTreeMap<String, FieldType>,

    /// Extraction strategy per format field name. Fields without an entry
    /// default to zonal OCR.
    #[serde(default)]
    pub extraction_strategies: BTreeMap<String, Strategy>,
}

impl Template {
    /// Checks every load-time invariant.
    ///
    /// Rejection reasons: empty id, out-of-range ratios in either the fine
    /// fingerprint or a zone definition, disagreeing fingerprint zone
    /// counts, overlap between required and optional fields, a mapped
    /// field declared in neither set, or a type/strategy declaration for
    /// an unmapped field.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.template_id.is_empty() {
            return Err(PipelineError::template_invalid(
                "<unnamed>",
                "empty template_id",
            ));
        }
        if !(0.0..=1.0).contains(&self.coarse.total_content_area_ratio) {
            return Err(self.rejected(format!(
                "total_content_area_ratio {} outside [0, 1]",
                self.coarse.total_content_area_ratio
            )));
        }
        if !self.fine.zones_within_bounds() {
            return Err(self.rejected("fine fingerprint zone outside [0, 1] bounds"));
        }
        if self.coarse.zone_count != self.fine.zone_count {
            return Err(self.rejected(format!(
                "coarse zone_count {} disagrees with fine zone_count {}",
                self.coarse.zone_count, self.fine.zone_count
            )));
        }
        for (name, rect) in &self.zone_definitions {
            if !rect.is_within_bounds() {
                return Err(self.rejected(format!("zone '{name}' outside [0, 1] bounds")));
            }
        }
        if let Some(overlap) = self.required_fields.intersection(&self.optional_fields).next() {
            return Err(self.rejected(format!(
                "field '{overlap}' is both required and optional"
            )));
        }
        for field in self.field_mappings.keys() {
            if !self.required_fields.contains(field) && !self.optional_fields.contains(field) {
                return Err(self.rejected(format!(
                    "mapped field '{field}' is neither required nor optional"
                )));
            }
        }
        for field in self.field_types.keys() {
            if !self.field_mappings.contains_key(field) {
                return Err(self.rejected(format!("field_types entry '{field}' is not mapped")));
            }
        }
        for field in self.extraction_strategies.keys() {
            if !self.field_mappings.contains_key(field) {
                return Err(self.rejected(format!(
                    "extraction_strategies entry '{field}' is not mapped"
                )));
            }
        }
        Ok(())
    }

    /// Whether this template participates in a search scoped to the given
    /// calling application.
    ///
    /// An unscoped search sees every template; a scoped search sees only
    /// templates registered for that application.
    pub fn matches_calling_app(&self, calling_app_id: Option<&str>) -> bool {
        match calling_app_id {
            None => true,
            Some(requested) => self
                .calling_app_id
                .as_deref()
                .is_some_and(|own| own == requested),
        }
    }

    fn rejected(&self, message: impl Into<String>) -> PipelineError {
        PipelineError::template_invalid(&self.template_id, message)
    }
}
