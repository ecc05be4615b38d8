//! Domain types for document matching and extraction.
//!
//! This module holds the data model shared by every pipeline stage: zones
//! and their ratio geometry, the two fingerprint tiers, vendor templates,
//! and the result records handed to callers.

pub mod fingerprint;
pub mod record;
pub mod template;
pub mod zone;

pub use fingerprint::{CoarseFingerprint, FineFingerprint};
pub use record::{
    DocumentRecord, ExtractedField, FieldRecord, FieldValue, MatchResult, ValidationResult,
};
pub use template::{FieldType, Strategy, Template};
pub use zone::{PixelRect, RatioRect, Zone, ZoneShape, ZoneType, RATIO_EPSILON};
