//! # Catalog Crate
//!
//! Course records for the marketplace and the read-only boundary the
//! recommendation service queries them through.
//!
//! ## Main Components
//!
//! - **types**: Course, Level, InstructorRef and the field limits
//! - **loader**: Parse and validate a JSON seed file
//! - **store**: `CatalogStore` trait and the `InMemoryCatalog` implementation
//! - **error**: Error types for loading and querying
//!
//! ## Example Usage
//!
//! ```ignore
//! use catalog::{CatalogStore, InMemoryCatalog};
//! use std::path::Path;
//!
//! let catalog = InMemoryCatalog::load_from_file(Path::new("data/catalog.json"))?;
//! let courses = catalog.fetch_all_courses().await?;
//! println!("{} courses available", courses.len());
//! ```

pub mod error;
pub mod loader;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{CatalogError, Result};
pub use store::{CatalogStore, InMemoryCatalog};
pub use types::{
    Course, CourseId, InstructorRef, Level, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN, UserId,
};
