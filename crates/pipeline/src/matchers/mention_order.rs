//! Substring matching ordered by first mention.
//!
//! Matches exactly the same courses as [`SubstringMatcher`] but sorts them
//! by the position of their first occurrence in the narrative, which tracks
//! the ranking the model was asked to produce. Ties keep catalog order.

use catalog::Course;
use tracing::debug;

use super::substring::SubstringMatcher;
use crate::traits::Reconciler;

/// Keeps mentioned courses, ordered by where they first appear
#[derive(Debug, Clone, Copy, Default)]
pub struct MentionOrderMatcher;

impl Reconciler for MentionOrderMatcher {
    fn name(&self) -> &str {
        "MentionOrderMatcher"
    }

    fn reconcile(&self, narrative: &str, catalog: &[Course]) -> Vec<Course> {
        let haystack = narrative.to_lowercase();

        let mut positioned: Vec<(usize, usize)> =
            SubstringMatcher::matching_indices(narrative, catalog)
                .into_iter()
                .filter_map(|i| {
                    haystack
                        .find(&catalog[i].title.to_lowercase())
                        .map(|position| (position, i))
                })
                .collect();

        // indices are ascending, so a stable sort leaves ties in catalog order
        positioned.sort_by_key(|(position, _)| *position);

        let matched =
            SubstringMatcher::dedup_by_id(positioned.into_iter().map(|(_, i)| catalog[i].clone()));

        debug!(
            "{} matched {} of {} catalog courses",
            self.name(),
            matched.len(),
            catalog.len()
        );
        matched
    }
}
