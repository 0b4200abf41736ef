//! The catalog store boundary and its in-memory implementation.
//!
//! `CatalogStore` is the only way the recommendation side reads courses.
//! It is async because real stores sit behind I/O; the in-memory store
//! answers immediately.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;
use crate::loader;
use crate::types::Course;

/// Read access to durable course records.
///
/// `Send + Sync` so one store can be shared across request handlers
/// behind an `Arc<dyn CatalogStore>`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every course, in catalog order
    async fn fetch_all_courses(&self) -> Result<Vec<Course>>;

    /// A single course by id
    async fn get_course(&self, id: &str) -> Result<Option<Course>>;
}

/// Catalog held entirely in memory, in seed order
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    courses: Vec<Course>,
}

impl InMemoryCatalog {
    /// Creates a new, empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from courses, trimming and validating them
    pub fn from_courses(courses: Vec<Course>) -> Result<Self> {
        let courses = loader::prepare_courses(courses)?;
        Ok(Self { courses })
    }

    /// Load and validate a JSON seed file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let courses = loader::load_from_file(path)?;
        Ok(Self { courses })
    }

    /// All courses, borrowed
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Find a course by id
    pub fn find(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|course| course.id == id)
    }

    /// Case-insensitive title search.
    ///
    /// Exact title matches come first, then substring matches; both groups
    /// keep catalog order.
    pub fn search_by_title(&self, query: &str) -> Vec<&Course> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<(u8, &Course)> = self
            .courses
            .iter()
            .filter_map(|course| {
                let title = course.title.to_lowercase();
                if title == needle {
                    Some((0, course))
                } else if title.contains(&needle) {
                    Some((1, course))
                } else {
                    None
                }
            })
            .collect();

        // stable sort keeps catalog order inside each group
        matches.sort_by_key(|(rank, _)| *rank);
        matches.into_iter().map(|(_, course)| course).collect()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn fetch_all_courses(&self) -> Result<Vec<Course>> {
        Ok(self.courses.clone())
    }

    async fn get_course(&self, id: &str) -> Result<Option<Course>> {
        Ok(self.find(id).cloned())
    }
}
