//! Error taxonomy for SkillForge.
//!
//! - [`ToolError`]: the only failure channel out of the tool facade
//! - [`ValidationIssue`]: a structured quality-gate rule violation
//! - [`ForgeError`]: configuration, fixture and store failures

use serde::{Deserialize, Serialize};

/// Named tool-facade operations, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOperation {
    SearchMarketplace,
    SearchRepositories,
    ExtractVideo,
    GenerateArtifact,
    GenerateTestCases,
    WebSearch,
}

impl ToolOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolOperation::SearchMarketplace => "search_marketplace",
            ToolOperation::SearchRepositories => "search_repositories",
            ToolOperation::ExtractVideo => "extract_video",
            ToolOperation::GenerateArtifact => "generate_artifact",
            ToolOperation::GenerateTestCases => "generate_test_cases",
            ToolOperation::WebSearch => "web_search",
        }
    }
}

impl std::fmt::Display for ToolOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed tool-facade call.
///
/// Displays as the bare message so stages can embed it in issue strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ToolError {
    pub operation: ToolOperation,
    pub message: String,
}

impl ToolError {
    pub fn new(operation: ToolOperation, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }

    pub fn unavailable(operation: ToolOperation) -> Self {
        Self::new(operation, format!("{operation} unavailable: no collaborator configured"))
    }

    pub fn timeout(operation: ToolOperation, after: std::time::Duration) -> Self {
        Self::new(operation, format!("{operation} timed out after {}ms", after.as_millis()))
    }
}

/// Quality-gate rules checked by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    EmptyContent,
    TooShort,
    NoTestCases,
    MissingStructure,
    IncompleteTestCase,
}

/// One rule violation found by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub rule: ValidationRule,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
}

impl ValidationIssue {
    pub fn new(rule: ValidationRule) -> Self {
        let message = match rule {
            ValidationRule::EmptyContent => "Skill content is empty.",
            ValidationRule::TooShort => "Skill content is too short to be executable.",
            ValidationRule::NoTestCases => "No test cases generated.",
            ValidationRule::MissingStructure => "Skill content lacks step-by-step structure.",
            ValidationRule::IncompleteTestCase => "Test case missing input/expected.",
        };
        Self {
            rule,
            message: message.to_string(),
            test_name: None,
        }
    }

    pub fn incomplete_test(name: &str) -> Self {
        Self {
            rule: ValidationRule::IncompleteTestCase,
            message: format!("Test '{name}' missing input/expected."),
            test_name: Some(name.to_string()),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// SkillForge library errors.
#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("invalid fixture: {0}")]
    Fixture(String),

    #[error("store error: {0}")]
    Store(#[from] skillforge_store::StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_displays_message_only() {
        let err = ToolError::new(ToolOperation::WebSearch, "HTTP 503");
        assert_eq!(err.to_string(), "HTTP 503");
        assert_eq!(err.operation.as_str(), "web_search");
    }

    #[test]
    fn unavailable_names_operation() {
        let err = ToolError::unavailable(ToolOperation::ExtractVideo);
        assert!(err.message.starts_with("extract_video unavailable"));
    }

    #[test]
    fn incomplete_test_message_names_case() {
        let issue = ValidationIssue::incomplete_test("edge");
        assert_eq!(issue.to_string(), "Test 'edge' missing input/expected.");
        assert_eq!(issue.test_name.as_deref(), Some("edge"));
    }
}
