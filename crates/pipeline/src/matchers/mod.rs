//! Reconciler implementations.
//!
//! `SubstringMatcher` is the default and defines the observable behavior.
//! `MentionOrderMatcher` matches the same set but orders it by where the
//! narrative first mentions each course.

pub mod mention_order;
pub mod substring;

// Re-export for convenience
pub use mention_order::MentionOrderMatcher;
pub use substring::SubstringMatcher;
