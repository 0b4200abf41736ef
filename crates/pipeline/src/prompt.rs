//! Prompt construction.
//!
//! Renders the catalog snapshot into a numbered listing and wraps it in the
//! advisor policy text. The result, together with the student's prompt
//! passed through verbatim, is everything the model sees.
//!
//! Listing line format:
//! `<index>. <title> - <description> (Level: <level>, Category: <category or General>)`

use catalog::Course;

/// How many picks the model is told to make
pub const DEFAULT_RECOMMENDATION_COUNT: usize = 3;

const ADVISOR_PREAMBLE: &str = "You are an educational advisor for an online learning platform. \
Based on the user's career goals or learning interests, recommend relevant courses from the \
available course list.";

/// The two texts handed to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system_instruction: String,
    pub user_prompt: String,
}

/// Builds the system instruction from a catalog snapshot.
///
/// Pure: no hidden state, so equal inputs give byte-identical output.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    recommendation_count: usize,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            recommendation_count: DEFAULT_RECOMMENDATION_COUNT,
        }
    }

    /// Configure the number of picks requested (default: 3, minimum 1)
    pub fn with_recommendation_count(mut self, count: usize) -> Self {
        self.recommendation_count = count.max(1);
        self
    }

    pub fn recommendation_count(&self) -> usize {
        self.recommendation_count
    }

    /// One numbered line per course, 1-based, joined by newlines.
    ///
    /// An empty catalog gives an empty string.
    pub fn course_listing(&self, catalog: &[Course]) -> String {
        catalog
            .iter()
            .enumerate()
            .map(|(i, course)| {
                format!(
                    "{}. {} - {} (Level: {}, Category: {})",
                    i + 1,
                    course.title,
                    course.description,
                    course.level,
                    course.category_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Full system instruction: preamble, listing, then the policy rules
    pub fn system_instruction(&self, catalog: &[Course]) -> String {
        let count = self.recommendation_count;
        let plural = if count == 1 { "course" } else { "courses" };

        format!(
            "{ADVISOR_PREAMBLE}\n\n\
             Available Courses:\n\
             {listing}\n\n\
             Instructions:\n\
             - Analyze the user's query carefully\n\
             - Recommend exactly {count} of the most relevant {plural} from the list above\n\
             - Refer to each course by its exact title as written in the list\n\
             - For each recommendation, explain WHY it's relevant to their goal\n\
             - Order recommendations by relevance (most relevant first)\n\
             - Only recommend courses that actually exist in the list\n\
             - Be encouraging and provide a brief learning path if appropriate\n\
             - Format your response in a clear, structured way",
            listing = self.course_listing(catalog),
        )
    }

    /// Pair the system instruction with the student's prompt, untouched
    pub fn build(&self, catalog: &[Course], student_prompt: &str) -> PromptPair {
        PromptPair {
            system_instruction: self.system_instruction(catalog),
            user_prompt: student_prompt.to_string(),
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}
