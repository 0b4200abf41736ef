//! Core domain types for the course catalog.
//!
//! Courses are owned by the catalog and handed out as read-only snapshots.
//! The recommendation side never mutates them; it only reads titles and the
//! fields it renders into prompts and responses.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CatalogError, Result};

// =============================================================================
// Identifiers and limits
// =============================================================================

/// Unique identifier for a course
pub type CourseId = String;

/// Unique identifier for a user (instructor or student)
pub type UserId = String;

/// Maximum title length, in characters
pub const MAX_TITLE_LEN: usize = 100;

/// Maximum description length, in characters
pub const MAX_DESCRIPTION_LEN: usize = 1000;

// =============================================================================
// Course-related Types
// =============================================================================

/// Difficulty level of a course
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
        };
        f.write_str(name)
    }
}

/// The instructor a course belongs to, as exposed to students
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructorRef {
    pub id: UserId,
    pub full_name: String,
}

/// A published course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    /// Sole key used when reconciling model output back to courses
    pub title: String,
    pub description: String,
    pub content: String,
    #[serde(default)]
    pub level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    pub instructor: InstructorRef,
}

impl Course {
    /// Check the field rules every stored course must satisfy.
    ///
    /// Title and description are measured in characters, not bytes.
    pub fn validate(&self) -> Result<()> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(self.invalid("title", "is required"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(self.invalid(
                "title",
                format!("cannot exceed {MAX_TITLE_LEN} characters"),
            ));
        }

        let description = self.description.trim();
        if description.is_empty() {
            return Err(self.invalid("description", "is required"));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(self.invalid(
                "description",
                format!("cannot exceed {MAX_DESCRIPTION_LEN} characters"),
            ));
        }

        if self.content.trim().is_empty() {
            return Err(self.invalid("content", "is required"));
        }

        Ok(())
    }

    /// Trim the fields that are stored trimmed: title, category and duration.
    ///
    /// Titles are the reconciliation key, so surrounding whitespace would
    /// otherwise keep a course from ever matching.
    pub fn normalize(&mut self) {
        trim_in_place(&mut self.title);
        if let Some(category) = self.category.as_mut() {
            trim_in_place(category);
        }
        if let Some(duration) = self.duration.as_mut() {
            trim_in_place(duration);
        }
    }

    /// Category as shown to students and to the model
    pub fn category_or_default(&self) -> &str {
        match self.category.as_deref().map(str::trim) {
            Some(category) if !category.is_empty() => category,
            _ => "General",
        }
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> CatalogError {
        CatalogError::InvalidCourse {
            course: self.id.clone(),
            field,
            reason: reason.into(),
        }
    }
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}
