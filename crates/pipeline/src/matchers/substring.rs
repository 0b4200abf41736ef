//! Case-insensitive title substring matching.
//!
//! ## Algorithm
//! 1. Lowercase the narrative once
//! 2. For every course in catalog order, keep it if its lowercased title
//!    occurs anywhere in the lowercased narrative
//! 3. Drop repeated course ids, keeping the first
//!
//! An empty title is skipped rather than treated as contained in every
//! narrative. The catalog rejects empty titles on load, so this only
//! matters for stores that skip that validation.
//!
//! No fuzzy matching and no punctuation or whitespace normalization. Short,
//! generic titles can match unrelated prose; that precision loss is part of
//! the contract. Results keep catalog order, not the model's ranking, and
//! are never truncated to the requested pick count.

use std::collections::HashSet;

use catalog::Course;
use rayon::prelude::*;
use tracing::debug;

use crate::traits::Reconciler;

/// Keeps catalog courses whose title appears in the narrative
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringMatcher;

impl SubstringMatcher {
    /// Catalog indices of matching courses, ascending.
    ///
    /// Empty titles never match.
    pub(crate) fn matching_indices(narrative: &str, catalog: &[Course]) -> Vec<usize> {
        let haystack = narrative.to_lowercase();

        catalog
            .par_iter()
            .enumerate()
            .filter(|(_, course)| {
                !course.title.is_empty() && haystack.contains(&course.title.to_lowercase())
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Drop courses whose id was already seen, preserving order
    pub(crate) fn dedup_by_id(courses: impl IntoIterator<Item = Course>) -> Vec<Course> {
        let mut seen = HashSet::new();
        courses
            .into_iter()
            .filter(|course| seen.insert(course.id.clone()))
            .collect()
    }
}

impl Reconciler for SubstringMatcher {
    fn name(&self) -> &str {
        "SubstringMatcher"
    }

    fn reconcile(&self, narrative: &str, catalog: &[Course]) -> Vec<Course> {
        let indices = Self::matching_indices(narrative, catalog);
        let matched = Self::dedup_by_id(indices.into_iter().map(|i| catalog[i].clone()));

        debug!(
            "{} matched {} of {} catalog courses",
            self.name(),
            matched.len(),
            catalog.len()
        );
        matched
    }
}
