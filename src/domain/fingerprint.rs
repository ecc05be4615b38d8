//! Structural fingerprints and their comparison functions.
//!
//! A fingerprint summarizes a document's layout independently of scan
//! resolution. Two fidelity tiers exist: the coarse fingerprint is a cheap
//! scalar summary used only for candidate filtering, while the fine
//! fingerprint carries per-zone geometry and produces the authoritative
//! match score.
//!
//! This module is the single place where pixel geometry becomes ratios.
//! Nothing downstream of a fingerprint may see absolute pixels; a leak here
//! breaks matching across scans taken at different resolutions.

use super::zone::{Zone, ZoneShape, ZoneType};
use crate::core::config::{CoarseWeights, FineWeights};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Largest possible Euclidean distance between two ratio vectors
/// (x, y, width, height), each component differing by at most 1.
const MAX_PAIR_DISTANCE: f32 = 2.0;

/// Cheap scalar summary of a document layout.
///
/// Compared in Phase 1 of matching to narrow a large template library down
/// to a handful of candidates. Never used for the final accept/reject
/// decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseFingerprint {
    /// Number of detected zones.
    pub zone_count: u32,
    /// Fraction of the page covered by zone content, in [0, 1].
    pub total_content_area_ratio: f32,
    /// Page width divided by page height.
    pub aspect_ratio: f32,
    /// How many zones of each type were detected. Types with zero zones
    /// are omitted.
    #[serde(default)]
    pub zone_type_distribution: BTreeMap<ZoneType, u32>,
}

impl CoarseFingerprint {
    /// Builds a coarse fingerprint from detected zones and the dimensions
    /// of the image they were detected on.
    pub fn from_zones(zones: &[Zone], page_width: u32, page_height: u32) -> Self {
        let mut distribution = BTreeMap::new();
        let mut total_area = 0.0f32;
        for zone in zones {
            *distribution.entry(zone.kind).or_insert(0) += 1;
            total_area += zone.ratios.area();
        }
        Self {
            zone_count: zones.len() as u32,
            total_content_area_ratio: total_area.min(1.0),
            aspect_ratio: if page_height == 0 {
                0.0
            } else {
                page_width as f32 / page_height as f32
            },
            zone_type_distribution: distribution,
        }
    }

    /// Compares two coarse fingerprints, returning a similarity in [0, 1].
    ///
    /// The score is a weighted combination of zone-count, content-area,
    /// aspect-ratio, and type-distribution similarity. Symmetric, and 1.0
    /// for identical fingerprints.
    pub fn compare(&self, other: &Self, weights: &CoarseWeights) -> f32 {
        let count_sim = count_similarity(self.zone_count, other.zone_count);
        let area_sim = 1.0
            - (self.total_content_area_ratio - other.total_content_area_ratio)
                .abs()
                .min(1.0);
        let aspect_sim = 1.0 - (self.aspect_ratio - other.aspect_ratio).abs().min(1.0);
        let type_sim = self.type_distribution_similarity(other);

        let score = weights.zone_count * count_sim
            + weights.content_area * area_sim
            + weights.aspect * aspect_sim
            + weights.type_distribution * type_sim;
        score.clamp(0.0, 1.0)
    }

    /// Mean per-type count agreement over all zone types.
    ///
    /// A type absent from both fingerprints agrees perfectly; a type
    /// present in only one contributes zero.
    fn type_distribution_similarity(&self, other: &Self) -> f32 {
        let per_type: f32 = ZoneType::ALL
            .iter()
            .map(|kind| {
                let a = self.zone_type_distribution.get(kind).copied().unwrap_or(0);
                let b = other.zone_type_distribution.get(kind).copied().unwrap_or(0);
                count_similarity(a, b)
            })
            .sum();
        per_type / ZoneType::ALL.len() as f32
    }
}

/// Detailed layout description: the ordered zones themselves in ratio form.
///
/// Compared in Phase 2 of matching, only against the candidates the coarse
/// phase let through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FineFingerprint {
    /// Zones in detection order (top-to-bottom, left-to-right), ratio form.
    pub zones: Vec<ZoneShape>,
    /// Number of zones; duplicated out of `zones` so stored fingerprints
    /// can be filtered without deserializing the zone list.
    pub zone_count: u32,
    /// Page width divided by page height.
    pub aspect_ratio: f32,
}

impl FineFingerprint {
    /// Builds a fine fingerprint from detected zones and the dimensions of
    /// the image they were detected on.
    pub fn from_zones(zones: &[Zone], page_width: u32, page_height: u32) -> Self {
        Self {
            zones: zones.iter().map(ZoneShape::from).collect(),
            zone_count: zones.len() as u32,
            aspect_ratio: if page_height == 0 {
                0.0
            } else {
                page_width as f32 / page_height as f32
            },
        }
    }

    /// Total fractional page area covered by the fingerprint's zones.
    pub fn total_content_area_ratio(&self) -> f32 {
        self.zones
            .iter()
            .map(|z| z.rect.area())
            .sum::<f32>()
            .min(1.0)
    }

    /// Checks that every zone satisfies the ratio invariants.
    pub fn zones_within_bounds(&self) -> bool {
        self.zones.iter().all(|z| z.rect.is_within_bounds())
    }

    /// Compares two fine fingerprints, returning a similarity in [0, 1].
    ///
    /// Zones are paired greedily: all same-type cross pairs are ranked by
    /// Euclidean distance over their (x, y, width, height) ratio vectors
    /// and consumed nearest-first. Matched pairs score by proximity;
    /// unmatched zones on either side dilute the score. The aggregate
    /// additionally weighs zone-count agreement and total covered area.
    /// Symmetric, and 1.0 for identical fingerprints.
    pub fn compare(&self, other: &Self, weights: &FineWeights) -> f32 {
        let pair_sim = self.paired_zone_similarity(other);
        let count_sim = count_similarity(self.zone_count, other.zone_count);
        let area_sim = 1.0
            - (self.total_content_area_ratio() - other.total_content_area_ratio())
                .abs()
                .min(1.0);

        let score = weights.pair_distance * pair_sim
            + weights.zone_count * count_sim
            + weights.content_area * area_sim;
        score.clamp(0.0, 1.0)
    }

    /// Greedy nearest-by-type-then-position pairing score.
    fn paired_zone_similarity(&self, other: &Self) -> f32 {
        if self.zones.is_empty() && other.zones.is_empty() {
            return 1.0;
        }
        if self.zones.is_empty() || other.zones.is_empty() {
            return 0.0;
        }

        let mut candidates: Vec<(f32, usize, usize)> = Vec::new();
        for (i, a) in self.zones.iter().enumerate() {
            for (j, b) in other.zones.iter().enumerate() {
                if a.kind == b.kind {
                    candidates.push((rect_distance(a, b), i, j));
                }
            }
        }
        candidates.sort_by(|x, y| {
            x.0.total_cmp(&y.0)
                .then_with(|| x.1.cmp(&y.1))
                .then_with(|| x.2.cmp(&y.2))
        });

        let mut used_a = vec![false; self.zones.len()];
        let mut used_b = vec![false; other.zones.len()];
        let mut matched_score = 0.0f32;
        for (dist, i, j) in candidates {
            if used_a[i] || used_b[j] {
                continue;
            }
            used_a[i] = true;
            used_b[j] = true;
            matched_score += 1.0 - (dist / MAX_PAIR_DISTANCE).min(1.0);
        }

        matched_score / self.zones.len().max(other.zones.len()) as f32
    }
}

/// Euclidean distance between two zones' ratio vectors.
fn rect_distance(a: &ZoneShape, b: &ZoneShape) -> f32 {
    let dx = a.rect.x - b.rect.x;
    let dy = a.rect.y - b.rect.y;
    let dw = a.rect.width - b.rect.width;
    let dh = a.rect.height - b.rect.height;
    (dx * dx + dy * dy + dw * dw + dh * dh).sqrt()
}

/// Count agreement as `1 - |a - b| / max(a, b, 1)`.
///
/// Zero against zero is a perfect match.
fn count_similarity(a: u32, b: u32) -> f32 {
    let max = a.max(b).max(1) as f32;
    1.0 - (a as f32 - b as f32).abs() / max
}
