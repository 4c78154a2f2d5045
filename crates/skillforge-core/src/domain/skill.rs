//! Skill drafts and their test scenarios.

use serde::{Deserialize, Serialize};

/// Name used when the content model omits one.
pub const UNTITLED_SKILL: &str = "Untitled Skill";
/// Description used when the content model omits one.
pub const DEFAULT_DESCRIPTION: &str = "Generated skill";

/// A drafted skill artifact. Immutable once produced by a generation round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillSpec {
    pub name: String,
    pub description: String,
    /// Insertion-ordered, duplicate-free.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: String,
}

impl SkillSpec {
    pub fn new<T: Into<String>>(
        name: impl Into<String>,
        description: impl Into<String>,
        tags: impl IntoIterator<Item = T>,
        content: impl Into<String>,
    ) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.into();
            if !tag.is_empty() && !unique.contains(&tag) {
                unique.push(tag);
            }
        }
        Self {
            name: name.into(),
            description: description.into(),
            tags: unique,
            content: content.into(),
        }
    }

    /// Empty-bodied draft standing in for a failed generation call.
    ///
    /// The validator rejects it like any other poor draft, so the round
    /// is retried with feedback.
    pub fn placeholder() -> Self {
        Self::new(UNTITLED_SKILL, DEFAULT_DESCRIPTION, Vec::<String>::new(), "")
    }
}

/// One test scenario for a drafted skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected: String,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub edge_cases: Vec<String>,
}

impl TestCaseSpec {
    /// The canned happy-path case used when the content model produces none.
    pub fn fallback(task: &str) -> Self {
        Self {
            name: "Basic happy path".to_string(),
            input: task.to_string(),
            expected: "Skill produces the desired outcome.".to_string(),
            environment: "local".to_string(),
            edge_cases: vec!["missing dependency".to_string(), "invalid input".to_string()],
        }
    }

    /// Both input and expected carry non-whitespace text.
    pub fn is_complete(&self) -> bool {
        !self.input.trim().is_empty() && !self.expected.trim().is_empty()
    }
}
