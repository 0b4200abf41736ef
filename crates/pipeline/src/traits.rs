//! Core traits for turning model output back into catalog entries.
//!
//! The model answers in prose and cannot be trusted to return identifiers,
//! so something has to decide which real courses that prose refers to.
//! The `Reconciler` trait is that decision point; the engine only ever
//! sees this trait.

use catalog::Course;

/// Maps a free-text narrative onto courses from a catalog snapshot.
///
/// ## Contract
/// - Output is a subset of `catalog` with no course id repeated
/// - Pure: same narrative and catalog always give the same output
/// - Cannot fail; "nothing matched" is an empty Vec
pub trait Reconciler: Send + Sync {
    /// Returns the name of this reconciler (for logging/debugging)
    fn name(&self) -> &str;

    /// Recover the courses the narrative refers to.
    ///
    /// # Arguments
    /// * `narrative` - The model's unstructured answer
    /// * `catalog` - The catalog snapshot the prompt was built from
    fn reconcile(&self, narrative: &str, catalog: &[Course]) -> Vec<Course>;
}
