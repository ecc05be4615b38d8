//! The in-memory template library.
//!
//! Templates are read-only during matching. The library hands out immutable
//! snapshots: a matcher in flight keeps the snapshot it started with, so a
//! concurrent insert or removal is observed either entirely or not at all,
//! never partially.
//!
//! Each snapshot carries the two range indexes Phase 1 filtering needs,
//! keyed on `zone_count` and `total_content_area_ratio`, so candidate
//! selection does not scan every stored fine fingerprint.

use crate::core::errors::PipelineResult;
use crate::domain::template::Template;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;
use std::sync::{Arc, RwLock};
use tracing::info;

/// An immutable view of the template set at one point in time.
#[derive(Debug)]
pub struct LibrarySnapshot {
    /// Templates sorted by id.
    templates: Vec<Arc<Template>>,
    /// Template indexes keyed by coarse zone count.
    by_zone_count: BTreeMap<u32, Vec<usize>>,
    /// Template indexes sorted by coarse content-area ratio.
    by_area: Vec<(f32, usize)>,
}

impl LibrarySnapshot {
    fn build(templates: Vec<Arc<Template>>) -> Self {
        let mut by_zone_count: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        let mut by_area: Vec<(f32, usize)> = Vec::with_capacity(templates.len());
        for (index, template) in templates.iter().enumerate() {
            by_zone_count
                .entry(template.coarse.zone_count)
                .or_default()
                .push(index);
            by_area.push((template.coarse.total_content_area_ratio, index));
        }
        by_area.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Self {
            templates,
            by_zone_count,
            by_area,
        }
    }

    /// All templates, sorted by id.
    pub fn templates(&self) -> &[Arc<Template>] {
        &self.templates
    }

    /// Number of templates in this snapshot.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether this snapshot holds no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Looks up a template by id.
    pub fn get(&self, template_id: &str) -> Option<&Arc<Template>> {
        self.templates
            .binary_search_by(|t| t.template_id.as_str().cmp(template_id))
            .ok()
            .map(|index| &self.templates[index])
    }

    /// Templates whose coarse zone count and content-area ratio both fall
    /// in the given ranges, via the indexes. Results are ordered by id.
    pub fn candidates_in_range(
        &self,
        zone_count: RangeInclusive<u32>,
        area_ratio: RangeInclusive<f32>,
    ) -> Vec<&Arc<Template>> {
        let by_count: BTreeSet<usize> = self
            .by_zone_count
            .range(zone_count)
            .flat_map(|(_, indexes)| indexes.iter().copied())
            .collect();

        let lo = self
            .by_area
            .partition_point(|(area, _)| area.total_cmp(area_ratio.start()).is_lt());
        let hi = self
            .by_area
            .partition_point(|(area, _)| area.total_cmp(area_ratio.end()).is_le());

        let mut selected: Vec<usize> = self.by_area[lo..hi]
            .iter()
            .map(|&(_, index)| index)
            .filter(|index| by_count.contains(index))
            .collect();
        selected.sort_unstable();
        selected
            .into_iter()
            .map(|index| &self.templates[index])
            .collect()
    }
}

/// Thread-safe template store with copy-on-read snapshot semantics.
#[derive(Debug)]
pub struct TemplateLibrary {
    snapshot: RwLock<Arc<LibrarySnapshot>>,
}

impl TemplateLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(LibrarySnapshot::build(Vec::new()))),
        }
    }

    /// Creates a library from a template collection.
    ///
    /// Every template is validated; a single corrupt template rejects the
    /// whole load so a partially-usable library never exists. Duplicate
    /// ids keep the last occurrence.
    pub fn from_templates(templates: Vec<Template>) -> PipelineResult<Self> {
        let library = Self::new();
        let mut by_id: BTreeMap<String, Arc<Template>> = BTreeMap::new();
        for template in templates {
            template.validate()?;
            by_id.insert(template.template_id.clone(), Arc::new(template));
        }
        let count = by_id.len();
        *library.snapshot.write().expect("library lock poisoned") =
            Arc::new(LibrarySnapshot::build(by_id.into_values().collect()));
        info!(count, "template library loaded");
        Ok(library)
    }

    /// Inserts or replaces a template, publishing a new snapshot.
    ///
    /// Matchers holding an older snapshot are unaffected.
    pub fn insert(&self, template: Template) -> PipelineResult<()> {
        template.validate()?;
        let mut guard = self.snapshot.write().expect("library lock poisoned");
        let mut templates: Vec<Arc<Template>> = guard
            .templates
            .iter()
            .filter(|t| t.template_id != template.template_id)
            .cloned()
            .collect();
        templates.push(Arc::new(template));
        templates.sort_by(|a, b| a.template_id.cmp(&b.template_id));
        *guard = Arc::new(LibrarySnapshot::build(templates));
        Ok(())
    }

    /// Removes a template by id, publishing a new snapshot. Returns whether
    /// anything was removed.
    pub fn remove(&self, template_id: &str) -> bool {
        let mut guard = self.snapshot.write().expect("library lock poisoned");
        if guard.get(template_id).is_none() {
            return false;
        }
        let templates: Vec<Arc<Template>> = guard
            .templates
            .iter()
            .filter(|t| t.template_id != template_id)
            .cloned()
            .collect();
        *guard = Arc::new(LibrarySnapshot::build(templates));
        true
    }

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<LibrarySnapshot> {
        self.snapshot.read().expect("library lock poisoned").clone()
    }

    /// Number of templates currently stored.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the library currently holds no templates.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl Default for TemplateLibrary {
    fn default() -> Self {
        Self::new()
    }
}
