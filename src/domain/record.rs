//! Result types produced by the pipeline.
//!
//! Everything here is immutable once produced and serializes to the JSON
//! shape consumed by the external collaborator that persists and displays
//! results.

use super::template::{Strategy, Template};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of matching one document against the template library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The winning template, or None when no candidate cleared the fine
    /// score threshold. No match is a normal outcome, not an error.
    pub matched_template_id: Option<String>,
    /// The winning fine score in [0, 1]; 0.0 when nothing was scored.
    pub match_score: f32,
    /// How many templates were coarse-scored before the fine phase.
    pub candidates_considered: usize,
}

impl MatchResult {
    /// A result carrying no match.
    pub fn no_match(candidates_considered: usize) -> Self {
        Self {
            matched_template_id: None,
            match_score: 0.0,
            candidates_considered,
        }
    }
}

/// A parsed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Free text, trimmed.
    Text(String),
    /// Plain numeric value.
    Number(f64),
    /// Monetary amount with the currency symbol found alongside it, if any.
    Currency {
        /// The parsed amount.
        amount: f64,
        /// The currency symbol or code found next to the amount.
        symbol: Option<String>,
    },
    /// Calendar date.
    Date(NaiveDate),
}

/// One extracted field. Every field a template declares produces exactly one
/// of these per document, even when nothing could be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    /// The template's format-specific field name (the key of the
    /// template's field mappings and required/optional sets).
    pub field_name: String,
    /// The typed value, or None when the region was unreadable, empty, or
    /// had no resolvable zone.
    pub value: Option<FieldValue>,
    /// The raw strategy output before type parsing. Present whenever the
    /// strategy read something, even when the parser rejected it; raw text
    /// with no value marks a failed type parse.
    pub raw_text: Option<String>,
    /// Combined confidence in [0, 1].
    pub confidence: f32,
    /// The strategy that produced the raw value.
    pub source: Strategy,
    /// The zone the value was read from; None means the full image was
    /// searched.
    pub zone_name: Option<String>,
}

/// Completeness and quality summary derived from the extracted fields and
/// the template's declarations. Pure data: recomputable at any time from
/// its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff every required field has a non-null value.
    pub is_valid: bool,
    /// Fraction of required fields with a non-null value; 1.0 when the
    /// template requires nothing.
    pub extraction_rate: f32,
    /// Required fields with a null value.
    pub missing_fields: Vec<String>,
    /// Fields whose declared type parser rejected the raw value.
    pub invalid_fields: Vec<String>,
    /// Fields below the configured confidence threshold, valid or not.
    pub low_confidence_fields: Vec<String>,
}

/// Per-field entry in the output record, keyed by canonical field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// The typed value, if one was extracted.
    pub value: Option<FieldValue>,
    /// Combined confidence in [0, 1].
    pub confidence: f32,
    /// The strategy that produced the value.
    pub source: Strategy,
    /// The zone the value was read from.
    pub zone: Option<String>,
}

/// The JSON-serializable record handed to the external collaborator, one
/// per processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// The matched template, or None.
    pub matched_template_id: Option<String>,
    /// The match score in [0, 1].
    pub match_score: f32,
    /// How many templates were considered during matching.
    pub candidates_considered: usize,
    /// Extracted fields keyed by canonical field name. Empty when no
    /// template matched.
    pub extracted_fields: BTreeMap<String, FieldRecord>,
    /// Validation summary; present only when a template matched.
    pub validation: Option<ValidationResult>,
}

impl DocumentRecord {
    /// Builds the output record from the match outcome and, when a template
    /// matched, its extracted fields and validation summary.
    ///
    /// Field entries are re-keyed from the template's format-specific names
    /// to canonical names through the template's field mappings.
    pub fn assemble(
        match_result: MatchResult,
        matched: Option<(&Template, Vec<ExtractedField>, ValidationResult)>,
    ) -> Self {
        let (extracted_fields, validation) = match matched {
            Some((template, fields, validation)) => {
                let mut by_canonical = BTreeMap::new();
                for field in fields {
                    let canonical = template
                        .field_mappings
                        .get(&field.field_name)
                        .cloned()
                        .unwrap_or_else(|| field.field_name.clone());
                    by_canonical.insert(
                        canonical,
                        FieldRecord {
                            value: field.value,
                            confidence: field.confidence,
                            source: field.source,
                            zone: field.zone_name,
                        },
                    );
                }
                (by_canonical, Some(validation))
            }
            None => (BTreeMap::new(), None),
        };
        Self {
            matched_template_id: match_result.matched_template_id,
            match_score: match_result.match_score,
            candidates_considered: match_result.candidates_considered,
            extracted_fields,
            validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_json_shape() {
        let value = FieldValue::Currency {
            amount: 42.5,
            symbol: Some("$".to_string()),
        };
        let json = serde_json::to_value(&value).expect("serialize");
        assert_eq!(json["kind"], "currency");
        assert_eq!(json["value"]["amount"], 42.5);
    }

    #[test]
    fn test_date_value_serializes_iso() {
        let value = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date"));
        let json = serde_json::to_string(&value).expect("serialize");
        assert!(json.contains("2024-03-09"), "got {json}");
    }

    #[test]
    fn test_no_match_record_has_no_fields() {
        let record = DocumentRecord::assemble(MatchResult::no_match(7), None);
        assert!(record.matched_template_id.is_none());
        assert_eq!(record.match_score, 0.0);
        assert_eq!(record.candidates_considered, 7);
        assert!(record.extracted_fields.is_empty());
        assert!(record.validation.is_none());
    }

    #[test]
    fn test_record_roundtrips_through_json() {
        let record = DocumentRecord::assemble(MatchResult::no_match(0), None);
        let json = serde_json::to_string(&record).expect("serialize");
        let back: DocumentRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }
}
