//! Configuration sections for every stage of the document pipeline.
//!
//! All thresholds, weights, and targets used anywhere in the pipeline live
//! here and are threaded into component constructors; no component reads
//! ambient global state. Validation happens once, when the pipeline is
//! built.

use super::errors::{ConfigError, ConfigValidator};
use super::parallel::ParallelPolicy;
use crate::impl_config_validator;
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that a weight set sums to one.
const WEIGHT_SUM_EPSILON: f32 = 1e-3;

/// Configuration for image preprocessing.
///
/// The preprocessing order is fixed (deskew, denoise, binarize, resample,
/// border crop); this struct only tunes the individual steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Target resolution in dots per inch. Required: there is no usable
    /// default because scan hardware varies, so a missing value fails
    /// pipeline construction.
    pub target_dpi: Option<u32>,

    /// Physical page width assumed when anchoring the resample scale,
    /// in inches (default: 8.5). Raster inputs carry no physical DPI, so
    /// the normalized width is `target_dpi * page_width_inches`.
    #[serde(default = "PreprocessConfig::default_page_width_inches")]
    pub page_width_inches: f32,

    /// Maximum rotation the deskew step will apply, in degrees
    /// (default: 15.0). Line orientations further from upright are treated
    /// as content, not skew.
    #[serde(default = "PreprocessConfig::default_deskew_max_angle")]
    pub deskew_max_angle_degrees: f32,

    /// Minimum Hough votes for a line to participate in skew estimation
    /// (default: 120).
    #[serde(default = "PreprocessConfig::default_deskew_vote_threshold")]
    pub deskew_vote_threshold: u32,

    /// Lower hysteresis threshold for the edge detector feeding skew
    /// estimation (default: 50.0).
    #[serde(default = "PreprocessConfig::default_canny_low")]
    pub canny_low: f32,

    /// Upper hysteresis threshold for the edge detector feeding skew
    /// estimation (default: 100.0).
    #[serde(default = "PreprocessConfig::default_canny_high")]
    pub canny_high: f32,

    /// Filtering strength for non-local-means denoising (default: 10.0).
    /// Higher values remove more noise at the cost of detail.
    #[serde(default = "PreprocessConfig::default_denoise_strength")]
    pub denoise_strength: f32,

    /// Patch radius for non-local-means similarity windows (default: 1,
    /// i.e. 3x3 patches).
    #[serde(default = "PreprocessConfig::default_denoise_patch_radius")]
    pub denoise_patch_radius: u32,

    /// Search radius for non-local-means candidate patches (default: 3,
    /// i.e. a 7x7 search window).
    #[serde(default = "PreprocessConfig::default_denoise_search_radius")]
    pub denoise_search_radius: u32,

    /// Neighborhood radius for adaptive binarization (default: 16).
    #[serde(default = "PreprocessConfig::default_binarize_block_radius")]
    pub binarize_block_radius: u32,

    /// Connected content smaller than this fraction of the page is ignored
    /// when locating the content bounding box for border removal
    /// (default: 0.0002).
    #[serde(default = "PreprocessConfig::default_border_min_blob_area_ratio")]
    pub border_min_blob_area_ratio: f32,

    /// Margin retained around the detected content box, as a fraction of
    /// each image dimension (default: 0.01).
    #[serde(default = "PreprocessConfig::default_border_margin_ratio")]
    pub border_margin_ratio: f32,
}

impl PreprocessConfig {
    fn default_page_width_inches() -> f32 {
        8.5
    }
    fn default_deskew_max_angle() -> f32 {
        15.0
    }
    fn default_deskew_vote_threshold() -> u32 {
        120
    }
    fn default_canny_low() -> f32 {
        50.0
    }
    fn default_canny_high() -> f32 {
        100.0
    }
    fn default_denoise_strength() -> f32 {
        10.0
    }
    fn default_denoise_patch_radius() -> u32 {
        1
    }
    fn default_denoise_search_radius() -> u32 {
        3
    }
    fn default_binarize_block_radius() -> u32 {
        16
    }
    fn default_border_min_blob_area_ratio() -> f32 {
        0.0002
    }
    fn default_border_margin_ratio() -> f32 {
        0.01
    }

    /// Creates a config with every tunable at its default and the given
    /// target resolution.
    pub fn with_target_dpi(target_dpi: u32) -> Self {
        Self {
            target_dpi: Some(target_dpi),
            ..Self::default()
        }
    }

    /// The normalized page width in pixels implied by this configuration.
    ///
    /// Callers must validate the config first; this returns 0 when the
    /// target resolution is unset.
    pub fn target_width_px(&self) -> u32 {
        self.target_dpi
            .map(|dpi| (dpi as f32 * self.page_width_inches).round() as u32)
            .unwrap_or(0)
    }
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_dpi: None,
            page_width_inches: Self::default_page_width_inches(),
            deskew_max_angle_degrees: Self::default_deskew_max_angle(),
            deskew_vote_threshold: Self::default_deskew_vote_threshold(),
            canny_low: Self::default_canny_low(),
            canny_high: Self::default_canny_high(),
            denoise_strength: Self::default_denoise_strength(),
            denoise_patch_radius: Self::default_denoise_patch_radius(),
            denoise_search_radius: Self::default_denoise_search_radius(),
            binarize_block_radius: Self::default_binarize_block_radius(),
            border_min_blob_area_ratio: Self::default_border_min_blob_area_ratio(),
            border_margin_ratio: Self::default_border_margin_ratio(),
        }
    }
}

impl ConfigValidator for PreprocessConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        match self.target_dpi {
            None => return Err(ConfigError::missing_field("target_dpi")),
            Some(0) => {
                return Err(ConfigError::invalid_value("target_dpi", "value > 0", 0));
            }
            Some(_) => {}
        }
        if self.page_width_inches <= 0.0 {
            return Err(ConfigError::invalid_value(
                "page_width_inches",
                "value > 0",
                self.page_width_inches,
            ));
        }
        if !(0.0..=45.0).contains(&self.deskew_max_angle_degrees) {
            return Err(ConfigError::invalid_value(
                "deskew_max_angle_degrees",
                "value in [0, 45]",
                self.deskew_max_angle_degrees,
            ));
        }
        if self.canny_low >= self.canny_high {
            return Err(ConfigError::inconsistent(format!(
                "canny_low ({}) must be below canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if self.denoise_strength <= 0.0 {
            return Err(ConfigError::invalid_value(
                "denoise_strength",
                "value > 0",
                self.denoise_strength,
            ));
        }
        if self.binarize_block_radius == 0 {
            return Err(ConfigError::invalid_value(
                "binarize_block_radius",
                "value >= 1",
                self.binarize_block_radius,
            ));
        }
        if !(0.0..=1.0).contains(&self.border_min_blob_area_ratio) {
            return Err(ConfigError::invalid_value(
                "border_min_blob_area_ratio",
                "value in [0, 1]",
                self.border_min_blob_area_ratio,
            ));
        }
        if !(0.0..=0.5).contains(&self.border_margin_ratio) {
            return Err(ConfigError::invalid_value(
                "border_margin_ratio",
                "value in [0, 0.5]",
                self.border_margin_ratio,
            ));
        }
        Ok(())
    }
}

/// Configuration for zone detection heuristics.
///
/// Classification is deterministic for a given image and config; these
/// bands and limits control how contour blocks map onto zone types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDetectionConfig {
    /// Downsampling factor used by the fast detector tier (default: 4).
    #[serde(default = "ZoneDetectionConfig::default_fast_downsample")]
    pub fast_downsample: u32,

    /// Morphological closing radius as a fraction of image width, used to
    /// merge nearby content into blocks (default: 0.012).
    #[serde(default = "ZoneDetectionConfig::default_merge_radius_ratio")]
    pub merge_radius_ratio: f32,

    /// Blocks smaller than this fraction of the page area are discarded
    /// (default: 0.0005).
    #[serde(default = "ZoneDetectionConfig::default_min_zone_area_ratio")]
    pub min_zone_area_ratio: f32,

    /// Zones whose center lies above this fraction of the page height are
    /// header candidates (default: 0.18).
    #[serde(default = "ZoneDetectionConfig::default_header_band_ratio")]
    pub header_band_ratio: f32,

    /// Zones whose center lies below this fraction of the page height are
    /// footer candidates (default: 0.82).
    #[serde(default = "ZoneDetectionConfig::default_footer_band_ratio")]
    pub footer_band_ratio: f32,

    /// Maximum area fraction for a logo candidate (default: 0.05).
    #[serde(default = "ZoneDetectionConfig::default_logo_max_area_ratio")]
    pub logo_max_area_ratio: f32,

    /// Maximum width/height aspect for a logo candidate (default: 3.0).
    #[serde(default = "ZoneDetectionConfig::default_logo_max_aspect")]
    pub logo_max_aspect: f32,

    /// Minimum width fraction for a table candidate (default: 0.55).
    #[serde(default = "ZoneDetectionConfig::default_table_min_width_ratio")]
    pub table_min_width_ratio: f32,

    /// Minimum height fraction for a table candidate (default: 0.12).
    #[serde(default = "ZoneDetectionConfig::default_table_min_height_ratio")]
    pub table_min_height_ratio: f32,
}

impl ZoneDetectionConfig {
    fn default_fast_downsample() -> u32 {
        4
    }
    fn default_merge_radius_ratio() -> f32 {
        0.012
    }
    fn default_min_zone_area_ratio() -> f32 {
        0.0005
    }
    fn default_header_band_ratio() -> f32 {
        0.18
    }
    fn default_footer_band_ratio() -> f32 {
        0.82
    }
    fn default_logo_max_area_ratio() -> f32 {
        0.05
    }
    fn default_logo_max_aspect() -> f32 {
        3.0
    }
    fn default_table_min_width_ratio() -> f32 {
        0.55
    }
    fn default_table_min_height_ratio() -> f32 {
        0.12
    }
}

impl Default for ZoneDetectionConfig {
    fn default() -> Self {
        Self {
            fast_downsample: Self::default_fast_downsample(),
            merge_radius_ratio: Self::default_merge_radius_ratio(),
            min_zone_area_ratio: Self::default_min_zone_area_ratio(),
            header_band_ratio: Self::default_header_band_ratio(),
            footer_band_ratio: Self::default_footer_band_ratio(),
            logo_max_area_ratio: Self::default_logo_max_area_ratio(),
            logo_max_aspect: Self::default_logo_max_aspect(),
            table_min_width_ratio: Self::default_table_min_width_ratio(),
            table_min_height_ratio: Self::default_table_min_height_ratio(),
        }
    }
}

impl_config_validator!(ZoneDetectionConfig {
    fast_downsample: min(1),
    merge_radius_ratio: range(0.0, 0.2),
    min_zone_area_ratio: range(0.0, 1.0),
    header_band_ratio: range(0.0, 1.0),
    footer_band_ratio: range(0.0, 1.0),
    logo_max_area_ratio: range(0.0, 1.0),
    logo_max_aspect: min(1.0),
    table_min_width_ratio: range(0.0, 1.0),
    table_min_height_ratio: range(0.0, 1.0),
});

/// Weights for the coarse fingerprint comparison.
///
/// The four components must sum to one; the comparison result is clipped to
/// [0, 1] regardless.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoarseWeights {
    /// Weight of zone-count similarity (default: 0.3).
    #[serde(default = "CoarseWeights::default_zone_count")]
    pub zone_count: f32,
    /// Weight of total-content-area similarity (default: 0.3).
    #[serde(default = "CoarseWeights::default_content_area")]
    pub content_area: f32,
    /// Weight of aspect-ratio similarity (default: 0.2).
    #[serde(default = "CoarseWeights::default_aspect")]
    pub aspect: f32,
    /// Weight of zone-type-distribution similarity (default: 0.2).
    #[serde(default = "CoarseWeights::default_type_distribution")]
    pub type_distribution: f32,
}

impl CoarseWeights {
    fn default_zone_count() -> f32 {
        0.3
    }
    fn default_content_area() -> f32 {
        0.3
    }
    fn default_aspect() -> f32 {
        0.2
    }
    fn default_type_distribution() -> f32 {
        0.2
    }
}

impl Default for CoarseWeights {
    fn default() -> Self {
        Self {
            zone_count: Self::default_zone_count(),
            content_area: Self::default_content_area(),
            aspect: Self::default_aspect(),
            type_distribution: Self::default_type_distribution(),
        }
    }
}

impl ConfigValidator for CoarseWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("zone_count", self.zone_count),
            ("content_area", self.content_area),
            ("aspect", self.aspect),
            ("type_distribution", self.type_distribution),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid_value(name, "value in [0, 1]", value));
            }
        }
        let sum = self.zone_count + self.content_area + self.aspect + self.type_distribution;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ConfigError::inconsistent(format!(
                "coarse weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Weights for the fine fingerprint comparison.
///
/// The aggregation favors zone-count agreement and total covered area on top
/// of the per-pair positional distances; the exact split is tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FineWeights {
    /// Weight of the matched-pair positional similarity (default: 0.6).
    #[serde(default = "FineWeights::default_pair_distance")]
    pub pair_distance: f32,
    /// Weight of zone-count agreement (default: 0.25).
    #[serde(default = "FineWeights::default_zone_count")]
    pub zone_count: f32,
    /// Weight of total-covered-area agreement (default: 0.15).
    #[serde(default = "FineWeights::default_content_area")]
    pub content_area: f32,
}

impl FineWeights {
    fn default_pair_distance() -> f32 {
        0.6
    }
    fn default_zone_count() -> f32 {
        0.25
    }
    fn default_content_area() -> f32 {
        0.15
    }
}

impl Default for FineWeights {
    fn default() -> Self {
        Self {
            pair_distance: Self::default_pair_distance(),
            zone_count: Self::default_zone_count(),
            content_area: Self::default_content_area(),
        }
    }
}

impl ConfigValidator for FineWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("pair_distance", self.pair_distance),
            ("zone_count", self.zone_count),
            ("content_area", self.content_area),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid_value(name, "value in [0, 1]", value));
            }
        }
        let sum = self.pair_distance + self.zone_count + self.content_area;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ConfigError::inconsistent(format!(
                "fine weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Configuration for the two-phase template matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Weights for the coarse comparison.
    #[serde(default)]
    pub coarse_weights: CoarseWeights,

    /// Weights for the fine comparison.
    #[serde(default)]
    pub fine_weights: FineWeights,

    /// Half-width of the zone-count range filter (default: 2).
    #[serde(default = "MatchingConfig::default_zone_count_tolerance")]
    pub zone_count_tolerance: u32,

    /// Half-width of the content-area range filter (default: 0.15).
    #[serde(default = "MatchingConfig::default_area_ratio_tolerance")]
    pub area_ratio_tolerance: f32,

    /// Number of coarse candidates carried into the fine phase
    /// (default: 10).
    #[serde(default = "MatchingConfig::default_top_n")]
    pub top_n: usize,

    /// Candidates scoring below this coarse floor are discarded even when
    /// the top-N is not full (default: 0.3).
    #[serde(default = "MatchingConfig::default_min_coarse_score")]
    pub min_coarse_score: f32,

    /// Fine scores below this threshold produce a no-match result
    /// (default: 0.5).
    #[serde(default = "MatchingConfig::default_min_fine_score")]
    pub min_fine_score: f32,

    /// Libraries at or below this size skip the range filters and
    /// coarse-score every template directly (default: 32).
    #[serde(default = "MatchingConfig::default_brute_force_limit")]
    pub brute_force_limit: usize,
}

impl MatchingConfig {
    fn default_zone_count_tolerance() -> u32 {
        2
    }
    fn default_area_ratio_tolerance() -> f32 {
        0.15
    }
    fn default_top_n() -> usize {
        10
    }
    fn default_min_coarse_score() -> f32 {
        0.3
    }
    fn default_min_fine_score() -> f32 {
        0.5
    }
    fn default_brute_force_limit() -> usize {
        32
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            coarse_weights: CoarseWeights::default(),
            fine_weights: FineWeights::default(),
            zone_count_tolerance: Self::default_zone_count_tolerance(),
            area_ratio_tolerance: Self::default_area_ratio_tolerance(),
            top_n: Self::default_top_n(),
            min_coarse_score: Self::default_min_coarse_score(),
            min_fine_score: Self::default_min_fine_score(),
            brute_force_limit: Self::default_brute_force_limit(),
        }
    }
}

impl ConfigValidator for MatchingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.coarse_weights.validate()?;
        self.fine_weights.validate()?;
        if !(0.0..=1.0).contains(&self.area_ratio_tolerance) {
            return Err(ConfigError::invalid_value(
                "area_ratio_tolerance",
                "value in [0, 1]",
                self.area_ratio_tolerance,
            ));
        }
        if self.top_n == 0 {
            return Err(ConfigError::invalid_value("top_n", "value >= 1", self.top_n));
        }
        if !(0.0..=1.0).contains(&self.min_coarse_score) {
            return Err(ConfigError::invalid_value(
                "min_coarse_score",
                "value in [0, 1]",
                self.min_coarse_score,
            ));
        }
        if !(0.0..=1.0).contains(&self.min_fine_score) {
            return Err(ConfigError::invalid_value(
                "min_fine_score",
                "value in [0, 1]",
                self.min_fine_score,
            ));
        }
        Ok(())
    }
}

/// Selects the OCR engine used by the zonal extraction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngineKind {
    /// Tesseract via leptess. Requires the `tesseract` cargo feature.
    #[default]
    Tesseract,
    /// No engine; zonal OCR fields degrade to null values. Useful for
    /// layout-only deployments and smoke testing.
    Disabled,
}

/// Configuration for OCR engine construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Which engine to construct (default: tesseract).
    #[serde(default)]
    pub engine: OcrEngineKind,

    /// Language hint passed to the engine (default: "eng").
    #[serde(default = "OcrConfig::default_language")]
    pub language: String,
}

impl OcrConfig {
    fn default_language() -> String {
        "eng".to_string()
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            engine: OcrEngineKind::default(),
            language: Self::default_language(),
        }
    }
}

impl ConfigValidator for OcrConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.language.is_empty() {
            return Err(ConfigError::missing_field("language"));
        }
        Ok(())
    }
}

/// Configuration for field extraction and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// OCR engine configuration.
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Name of the general-purpose zone a field falls back to when it has
    /// no field-specific zone (default: "body").
    #[serde(default = "ExtractionConfig::default_fallback_zone")]
    pub fallback_zone: String,

    /// Fields below this confidence are reported as low-confidence by the
    /// validator regardless of validity (default: 0.5).
    #[serde(default = "ExtractionConfig::default_low_confidence_threshold")]
    pub low_confidence_threshold: f32,

    /// Confidence added when the declared type parser accepts the raw value
    /// (default: 0.1).
    #[serde(default = "ExtractionConfig::default_type_parse_bonus")]
    pub type_parse_bonus: f32,

    /// Confidence subtracted when the declared type parser rejects the raw
    /// value (default: 0.3).
    #[serde(default = "ExtractionConfig::default_type_parse_penalty")]
    pub type_parse_penalty: f32,

    /// Ink coverage above which the contour strategy reports a region as
    /// marked (default: 0.02).
    #[serde(default = "ExtractionConfig::default_mark_ink_threshold")]
    pub mark_ink_threshold: f32,
}

impl ExtractionConfig {
    fn default_fallback_zone() -> String {
        "body".to_string()
    }
    fn default_low_confidence_threshold() -> f32 {
        0.5
    }
    fn default_type_parse_bonus() -> f32 {
        0.1
    }
    fn default_type_parse_penalty() -> f32 {
        0.3
    }
    fn default_mark_ink_threshold() -> f32 {
        0.02
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            ocr: OcrConfig::default(),
            fallback_zone: Self::default_fallback_zone(),
            low_confidence_threshold: Self::default_low_confidence_threshold(),
            type_parse_bonus: Self::default_type_parse_bonus(),
            type_parse_penalty: Self::default_type_parse_penalty(),
            mark_ink_threshold: Self::default_mark_ink_threshold(),
        }
    }
}

impl ConfigValidator for ExtractionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.ocr.validate()?;
        if self.fallback_zone.is_empty() {
            return Err(ConfigError::missing_field("fallback_zone"));
        }
        for (name, value) in [
            ("low_confidence_threshold", self.low_confidence_threshold),
            ("type_parse_bonus", self.type_parse_bonus),
            ("type_parse_penalty", self.type_parse_penalty),
            ("mark_ink_threshold", self.mark_ink_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::invalid_value(name, "value in [0, 1]", value));
            }
        }
        Ok(())
    }
}

/// Top-level configuration for the full document pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Preprocessing configuration.
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    /// Zone detection configuration.
    #[serde(default)]
    pub zones: ZoneDetectionConfig,
    /// Template matching configuration.
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Field extraction configuration.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Worker-pool parallelism policy.
    #[serde(default)]
    pub parallel: ParallelPolicy,
}

impl PipelineConfig {
    /// Creates a config with every tunable at its default and the given
    /// target resolution, the single value with no default.
    pub fn with_target_dpi(target_dpi: u32) -> Self {
        Self {
            preprocess: PreprocessConfig::with_target_dpi(target_dpi),
            ..Self::default()
        }
    }
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.preprocess.validate()?;
        self.zones.validate()?;
        self.matching.validate()?;
        self.extraction.validate()?;
        Ok(())
    }
}
