//! Two-phase template matching.
//!
//! Phase 1 narrows the library with cheap operations: an optional
//! calling-app scope, indexed range filters on the two coarse scalars, and
//! coarse fingerprint scoring that keeps only the top-N candidates above a
//! floor. Phase 2 runs the expensive fine comparison against those few
//! candidates and picks the winner.
//!
//! Brute force costs O(n) fine comparisons; the two phases cost O(n) cheap
//! coarse comparisons plus O(N) fine ones with N much smaller than n. The
//! result is the same, only the latency changes, which is why small
//! libraries skip the filtering entirely.

use super::library::LibrarySnapshot;
use crate::core::config::MatchingConfig;
use crate::domain::fingerprint::{CoarseFingerprint, FineFingerprint};
use crate::domain::record::MatchResult;
use crate::domain::template::Template;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, warn};

/// Two-phase matcher over a library snapshot.
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    config: MatchingConfig,
}

impl TemplateMatcher {
    /// Builds a matcher from the matching configuration.
    pub fn from_config(config: &MatchingConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Matches a document's fingerprints against a library snapshot.
    ///
    /// Returns the match outcome and, when a template won, a handle to it
    /// for the extraction stage. Finding no template above the fine-score
    /// threshold is a normal outcome, not an error.
    pub fn match_document(
        &self,
        coarse: &CoarseFingerprint,
        fine: &FineFingerprint,
        library: &LibrarySnapshot,
        calling_app_id: Option<&str>,
    ) -> (MatchResult, Option<Arc<Template>>) {
        let scoped: Vec<&Arc<Template>> = library
            .templates()
            .iter()
            .filter(|t| t.matches_calling_app(calling_app_id))
            .collect();
        if scoped.is_empty() {
            debug!(?calling_app_id, "no templates in scope");
            return (MatchResult::no_match(0), None);
        }

        let pool = self.candidate_pool(coarse, library, &scoped, calling_app_id);
        let candidates_considered = pool.len();

        // Phase 1: coarse scoring, floor, top-N. Ties order by id so the
        // carried set is deterministic.
        let shortlist: Vec<(f32, &Arc<Template>)> = pool
            .iter()
            .map(|t| (coarse.compare(&t.coarse, &self.config.coarse_weights), *t))
            .filter(|(score, _)| *score >= self.config.min_coarse_score)
            .sorted_by(|a, b| {
                b.0.total_cmp(&a.0)
                    .then_with(|| a.1.template_id.cmp(&b.1.template_id))
            })
            .take(self.config.top_n)
            .collect();
        if shortlist.is_empty() {
            debug!(
                candidates_considered,
                "no candidate cleared the coarse floor"
            );
            return (MatchResult::no_match(candidates_considered), None);
        }

        // Phase 2: fine comparison over the shortlist only.
        let best = shortlist
            .iter()
            .map(|(_, t)| (fine.compare(&t.fine, &self.config.fine_weights), *t))
            .sorted_by(|a, b| {
                b.0.total_cmp(&a.0)
                    .then_with(|| a.1.template_id.cmp(&b.1.template_id))
            })
            .next();

        match best {
            Some((score, template)) if score >= self.config.min_fine_score => {
                debug!(
                    template_id = %template.template_id,
                    score,
                    candidates_considered,
                    "matched"
                );
                (
                    MatchResult {
                        matched_template_id: Some(template.template_id.clone()),
                        match_score: score,
                        candidates_considered,
                    },
                    Some(Arc::clone(template)),
                )
            }
            Some((score, _)) => {
                debug!(score, "best fine score below threshold");
                (MatchResult::no_match(candidates_considered), None)
            }
            None => (MatchResult::no_match(candidates_considered), None),
        }
    }

    /// Selects the set of templates Phase 1 will coarse-score.
    ///
    /// Small scoped sets are scored whole: the range indexes only pay off
    /// once the library is large. An empty filter result falls back to the
    /// whole scoped set rather than reporting no match, so an overly tight
    /// tolerance degrades latency instead of silently breaking matching.
    fn candidate_pool<'a>(
        &self,
        coarse: &CoarseFingerprint,
        library: &'a LibrarySnapshot,
        scoped: &[&'a Arc<Template>],
        calling_app_id: Option<&str>,
    ) -> Vec<&'a Arc<Template>> {
        if scoped.len() <= self.config.brute_force_limit {
            debug!(size = scoped.len(), "library small; scoring whole scope");
            return scoped.to_vec();
        }

        let count_lo = coarse
            .zone_count
            .saturating_sub(self.config.zone_count_tolerance);
        let count_hi = coarse
            .zone_count
            .saturating_add(self.config.zone_count_tolerance);
        let area_lo = coarse.total_content_area_ratio - self.config.area_ratio_tolerance;
        let area_hi = coarse.total_content_area_ratio + self.config.area_ratio_tolerance;

        let filtered: Vec<&Arc<Template>> = library
            .candidates_in_range(count_lo..=count_hi, area_lo..=area_hi)
            .into_iter()
            .filter(|t| t.matches_calling_app(calling_app_id))
            .collect();
        if filtered.is_empty() {
            warn!(
                zone_count = coarse.zone_count,
                area_ratio = coarse.total_content_area_ratio,
                "range filters excluded every template; falling back to full scan"
            );
            return scoped.to_vec();
        }
        debug!(
            filtered = filtered.len(),
            scoped = scoped.len(),
            "range filters narrowed the pool"
        );
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::zone::{PixelRect, Zone, ZoneType};
    use crate::matching::library::TemplateLibrary;
    use std::collections::{BTreeMap, BTreeSet};

    fn zones_for(count: u32) -> Vec<Zone> {
        let band_height = 900 / count.max(1);
        (0..count)
            .map(|i| {
                Zone::from_pixels(
                    ZoneType::Other,
                    PixelRect::new(100, 50 + i * band_height, 800, band_height - 20),
                    1000,
                    1000,
                )
            })
            .collect()
    }

    fn template_from_zones(id: &str, zones: &[Zone]) -> Template {
        Template {
            template_id: id.to_string(),
            calling_app_id: None,
            coarse: CoarseFingerprint::from_zones(zones, 1000, 1000),
            fine: FineFingerprint::from_zones(zones, 1000, 1000),
            field_mappings: BTreeMap::new(),
            zone_definitions: BTreeMap::new(),
            required_fields: BTreeSet::new(),
            optional_fields: BTreeSet::new(),
            field_types: BTreeMap::new(),
            extraction_strategies: BTreeMap::new(),
        }
    }

    fn banded_template(id: &str, count: u32) -> Template {
        template_from_zones(id, &zones_for(count))
    }

    fn fingerprints_for(count: u32) -> (CoarseFingerprint, FineFingerprint) {
        let zones = zones_for(count);
        (
            CoarseFingerprint::from_zones(&zones, 1000, 1000),
            FineFingerprint::from_zones(&zones, 1000, 1000),
        )
    }

    #[test]
    fn test_exact_layout_matches() {
        let library = TemplateLibrary::from_templates(vec![
            banded_template("three", 3),
            banded_template("six", 6),
        ])
        .expect("load");
        let (coarse, fine) = fingerprints_for(3);
        let matcher = TemplateMatcher::from_config(&MatchingConfig::default());
        let (result, template) =
            matcher.match_document(&coarse, &fine, &library.snapshot(), None);
        assert_eq!(result.matched_template_id.as_deref(), Some("three"));
        assert!(result.match_score > 0.99);
        assert_eq!(template.expect("handle").template_id, "three");
    }

    #[test]
    fn test_tight_zone_count_tolerance_excludes_distant_template() {
        // Library of zone counts 4, 5, 9; document has 5; tolerance 1.
        let library = TemplateLibrary::from_templates(vec![
            banded_template("four", 4),
            banded_template("five", 5),
            banded_template("nine", 9),
        ])
        .expect("load");
        let (coarse, fine) = fingerprints_for(5);
        let config = MatchingConfig {
            zone_count_tolerance: 1,
            area_ratio_tolerance: 1.0,
            brute_force_limit: 0,
            ..MatchingConfig::default()
        };
        let matcher = TemplateMatcher::from_config(&config);
        let (result, _) = matcher.match_document(&coarse, &fine, &library.snapshot(), None);
        assert_eq!(
            result.candidates_considered, 2,
            "phase 1 should keep exactly the 4- and 5-zone templates"
        );
        assert_eq!(result.matched_template_id.as_deref(), Some("five"));
    }

    #[test]
    fn test_two_phase_agrees_with_brute_force() {
        let templates: Vec<Template> = (2..10)
            .map(|count| banded_template(&format!("t{count}"), count))
            .collect();
        let library = TemplateLibrary::from_templates(templates).expect("load");
        let snapshot = library.snapshot();

        let brute = TemplateMatcher::from_config(&MatchingConfig {
            brute_force_limit: usize::MAX,
            ..MatchingConfig::default()
        });
        let two_phase = TemplateMatcher::from_config(&MatchingConfig {
            brute_force_limit: 0,
            ..MatchingConfig::default()
        });

        for count in 2..10 {
            let (coarse, fine) = fingerprints_for(count);
            let (a, _) = brute.match_document(&coarse, &fine, &snapshot, None);
            let (b, _) = two_phase.match_document(&coarse, &fine, &snapshot, None);
            assert_eq!(
                a.matched_template_id, b.matched_template_id,
                "disagreement at zone count {count}"
            );
        }
    }

    #[test]
    fn test_empty_filter_falls_back_to_full_scan() {
        let library = TemplateLibrary::from_templates(vec![
            banded_template("three", 3),
            banded_template("four", 4),
        ])
        .expect("load");
        // Document with far more zones than anything stored, zero tolerance,
        // and filtering forced on: the fallback must still score the library.
        let (coarse, fine) = fingerprints_for(9);
        let config = MatchingConfig {
            zone_count_tolerance: 0,
            area_ratio_tolerance: 0.0,
            brute_force_limit: 0,
            min_coarse_score: 0.0,
            min_fine_score: 0.0,
            ..MatchingConfig::default()
        };
        let matcher = TemplateMatcher::from_config(&config);
        let (result, _) = matcher.match_document(&coarse, &fine, &library.snapshot(), None);
        assert_eq!(result.candidates_considered, 2);
        assert!(result.matched_template_id.is_some());
    }

    #[test]
    fn test_blank_page_produces_no_match_without_error() {
        let library = TemplateLibrary::from_templates(vec![
            banded_template("three", 3),
            banded_template("six", 6),
        ])
        .expect("load");
        let coarse = CoarseFingerprint::from_zones(&[], 1000, 1000);
        let fine = FineFingerprint::from_zones(&[], 1000, 1000);
        let matcher = TemplateMatcher::from_config(&MatchingConfig::default());
        let (result, template) =
            matcher.match_document(&coarse, &fine, &library.snapshot(), None);
        assert!(result.matched_template_id.is_none());
        assert!(result.match_score < 0.1);
        assert!(template.is_none());
    }

    #[test]
    fn test_equal_scores_tie_break_on_lower_id() {
        // Two identical layouts under different ids; the lexicographically
        // lower id must win, deterministically.
        let library = TemplateLibrary::from_templates(vec![
            banded_template("vendor-b", 4),
            banded_template("vendor-a", 4),
        ])
        .expect("load");
        let (coarse, fine) = fingerprints_for(4);
        let matcher = TemplateMatcher::from_config(&MatchingConfig::default());
        for _ in 0..5 {
            let (result, _) = matcher.match_document(&coarse, &fine, &library.snapshot(), None);
            assert_eq!(result.matched_template_id.as_deref(), Some("vendor-a"));
        }
    }

    #[test]
    fn test_calling_app_scopes_search() {
        let mut scoped = banded_template("scoped", 4);
        scoped.calling_app_id = Some("retail-pos".to_string());
        let library = TemplateLibrary::from_templates(vec![scoped, banded_template("open", 4)])
            .expect("load");
        let (coarse, fine) = fingerprints_for(4);
        let matcher = TemplateMatcher::from_config(&MatchingConfig::default());

        let (result, _) =
            matcher.match_document(&coarse, &fine, &library.snapshot(), Some("retail-pos"));
        assert_eq!(result.matched_template_id.as_deref(), Some("scoped"));
        assert_eq!(result.candidates_considered, 1);

        let (result, _) =
            matcher.match_document(&coarse, &fine, &library.snapshot(), Some("unknown-app"));
        assert!(result.matched_template_id.is_none());
        assert_eq!(result.candidates_considered, 0);
    }

    #[test]
    fn test_below_fine_threshold_is_no_match() {
        let library =
            TemplateLibrary::from_templates(vec![banded_template("five", 5)]).expect("load");
        let (coarse, fine) = fingerprints_for(4);
        let config = MatchingConfig {
            min_coarse_score: 0.0,
            min_fine_score: 0.999,
            ..MatchingConfig::default()
        };
        let matcher = TemplateMatcher::from_config(&config);
        let (result, template) =
            matcher.match_document(&coarse, &fine, &library.snapshot(), None);
        assert!(result.matched_template_id.is_none());
        assert!(template.is_none());
        assert_eq!(result.candidates_considered, 1);
    }

    #[test]
    fn test_coarse_floor_discards_weak_candidates() {
        let library = TemplateLibrary::from_templates(vec![banded_template("nine", 9)])
            .expect("load");
        let (coarse, fine) = fingerprints_for(2);
        let config = MatchingConfig {
            min_coarse_score: 0.9,
            ..MatchingConfig::default()
        };
        let matcher = TemplateMatcher::from_config(&config);
        let (result, _) = matcher.match_document(&coarse, &fine, &library.snapshot(), None);
        assert!(result.matched_template_id.is_none());
        // The candidate was considered, then dropped at the floor.
        assert_eq!(result.candidates_considered, 1);
    }
}
