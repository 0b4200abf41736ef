//! Error types for the catalog crate.
//!
//! Every failure carries enough context to point at the offending file,
//! course, or field, so seed problems can be fixed without a debugger.

use thiserror::Error;

/// Errors that can occur while loading, validating or querying the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Seed file could not be found or opened
    #[error("Failed to open catalog file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading the seed file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Seed document is not valid JSON or does not match the course schema
    #[error("Malformed catalog document: {0}")]
    ParseError(#[from] serde_json::Error),

    /// A course violated one of the field rules
    #[error("Invalid course '{course}': {field} {reason}")]
    InvalidCourse {
        course: String,
        field: &'static str,
        reason: String,
    },

    /// Two courses share the same identifier
    #[error("Duplicate course id: {id}")]
    DuplicateId { id: String },

    /// Backing store could not serve the query
    #[error("Catalog store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogError>;
