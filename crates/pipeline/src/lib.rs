//! Prompt construction and reconciliation for course recommendations.
//!
//! This crate provides:
//! - `PromptBuilder` to render the catalog into the model's instructions
//! - `Reconciler` trait and implementations that map the model's prose
//!   back onto real catalog courses
//!
//! ## Architecture
//! A recommendation passes through this crate twice:
//! 1. Before the model call, the catalog snapshot becomes a system instruction
//! 2. After the model call, the narrative is reconciled against that same snapshot
//!
//! Both steps are synchronous and pure; all I/O happens in the caller.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{PromptBuilder, Reconciler, SubstringMatcher};
//!
//! let prompt = PromptBuilder::new().build(&courses, "I want to work in cloud infrastructure");
//! let narrative = model.complete(/* prompt.system_instruction, prompt.user_prompt */).await?;
//! let matched = SubstringMatcher.reconcile(&narrative, &courses);
//! ```

pub mod matchers;
pub mod prompt;
pub mod traits;

// Re-export main types
pub use matchers::{MentionOrderMatcher, SubstringMatcher};
pub use prompt::{DEFAULT_RECOMMENDATION_COUNT, PromptBuilder, PromptPair};
pub use traits::Reconciler;
