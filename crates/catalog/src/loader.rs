//! Seed loading and validation.
//!
//! The seed file is a JSON document of the form `{ "courses": [ ... ] }`.
//! Loading happens in three steps:
//! 1. Read and deserialize the document
//! 2. Trim stored fields, then validate every course in parallel (Rayon)
//! 3. Reject duplicate identifiers
//!
//! Course order in the file is preserved; it becomes the catalog order.

use crate::error::{CatalogError, Result};
use crate::types::Course;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct SeedDocument {
    courses: Vec<Course>,
}

/// Load and validate all courses from a seed file
pub fn load_from_file(path: &Path) -> Result<Vec<Course>> {
    info!("Loading course catalog from {:?}", path);

    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => CatalogError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => CatalogError::IoError(e),
    })?;

    let courses = parse_courses(&raw)?;
    info!("Loaded {} courses", courses.len());
    Ok(courses)
}

/// Parse and validate a seed document held in memory
pub fn parse_courses(raw: &str) -> Result<Vec<Course>> {
    let document: SeedDocument = serde_json::from_str(raw)?;
    prepare_courses(document.courses)
}

/// Normalize then validate courses, returning them in the same order
pub fn prepare_courses(mut courses: Vec<Course>) -> Result<Vec<Course>> {
    courses.par_iter_mut().for_each(Course::normalize);
    validate_courses(&courses)?;
    Ok(courses)
}

/// Validate field rules and id uniqueness across a set of courses.
///
/// Field validation runs in parallel; the first failure in catalog order
/// is the one reported.
pub fn validate_courses(courses: &[Course]) -> Result<()> {
    let failures: Vec<CatalogError> = courses
        .par_iter()
        .filter_map(|course| course.validate().err())
        .collect();

    if let Some(first) = failures.into_iter().next() {
        return Err(first);
    }

    let mut seen = HashSet::with_capacity(courses.len());
    for course in courses {
        if !seen.insert(course.id.as_str()) {
            return Err(CatalogError::DuplicateId {
                id: course.id.clone(),
            });
        }
    }

    debug!("Validated {} courses", courses.len());
    Ok(())
}
