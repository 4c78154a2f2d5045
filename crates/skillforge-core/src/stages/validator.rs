//! Validator stage: deterministic quality gate over a draft and its tests.
//!
//! Every rule is evaluated; nothing short-circuits. The gate never calls
//! the tool facade, so the same draft always gets the same verdict.

use serde_json::{json, Map};
use tracing::instrument;

use crate::domain::{ExecutionReport, SkillSpec, TestCaseSpec, ValidationIssue, ValidationRule};
use crate::events::Emitter;

const MIN_LINES: usize = 3;

/// Numbered, bulleted, or explicit step markers.
const STEP_MARKERS: [&str; 4] = ["1.", "- ", "* ", "步骤"];

fn has_step_structure(content: &str) -> bool {
    STEP_MARKERS.iter().any(|m| content.contains(m)) || content.to_lowercase().contains("step")
}

/// Every rule violation for `skill` and `tests`, in rule order.
pub fn check_skill(skill: &SkillSpec, tests: &[TestCaseSpec]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if skill.content.trim().is_empty() {
        issues.push(ValidationIssue::new(ValidationRule::EmptyContent));
    }
    if skill.content.lines().count() < MIN_LINES {
        issues.push(ValidationIssue::new(ValidationRule::TooShort));
    }
    if tests.is_empty() {
        issues.push(ValidationIssue::new(ValidationRule::NoTestCases));
    }
    if !has_step_structure(&skill.content) {
        issues.push(ValidationIssue::new(ValidationRule::MissingStructure));
    }
    for test in tests.iter().filter(|t| !t.is_complete()) {
        issues.push(ValidationIssue::incomplete_test(&test.name));
    }
    issues
}

/// Gate verdict as a report; `outputs.rules` lists the violated rules.
pub fn validate(skill: &SkillSpec, tests: &[TestCaseSpec]) -> ExecutionReport {
    let violations = check_skill(skill, tests);
    let mut outputs = Map::new();
    if !violations.is_empty() {
        outputs.insert(
            "rules".to_string(),
            json!(violations.iter().map(|v| v.rule).collect::<Vec<_>>()),
        );
    }
    ExecutionReport::from_issues(
        violations.iter().map(ToString::to_string).collect(),
        outputs,
        "Skill validation passed.",
        "Skill validation failed.",
    )
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ValidatorStage;

impl ValidatorStage {
    pub const NAME: &'static str = "validator";

    pub fn new() -> Self {
        Self
    }

    #[instrument(skip_all, fields(trace_id = %emit.trace_id()))]
    pub async fn run(
        &self,
        skill: &SkillSpec,
        tests: &[TestCaseSpec],
        emit: &Emitter<'_>,
    ) -> ExecutionReport {
        let log = emit.agent(Self::NAME);
        log.plan("Validate skill quality and test completeness.").await;
        let report = validate(skill, tests);
        log.observe(report.notes.clone(), json!({ "issues": report.issues }))
            .await;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill(content: &str) -> SkillSpec {
        SkillSpec::new("s", "d", Vec::<String>::new(), content)
    }

    fn case(name: &str, input: &str, expected: &str) -> TestCaseSpec {
        TestCaseSpec {
            name: name.into(),
            input: input.into(),
            expected: expected.into(),
            environment: String::new(),
            edge_cases: Vec::new(),
        }
    }

    #[test]
    fn short_unstructured_content_without_tests() {
        let report = validate(&skill("abc"), &[]);
        assert!(!report.passed);
        assert_eq!(
            report.issues,
            vec![
                "Skill content is too short to be executable.",
                "No test cases generated.",
                "Skill content lacks step-by-step structure.",
            ]
        );
    }

    #[test]
    fn empty_content_trips_every_content_rule() {
        let rules: Vec<_> = check_skill(&skill("  "), &[case("a", "i", "e")])
            .into_iter()
            .map(|i| i.rule)
            .collect();
        assert_eq!(
            rules,
            vec![
                ValidationRule::EmptyContent,
                ValidationRule::TooShort,
                ValidationRule::MissingStructure,
            ]
        );
    }

    #[test]
    fn well_formed_draft_passes() {
        let report = validate(
            &skill("# Scrape\n1. Open the page\n2. Read the table\n3. Save rows"),
            &[case("happy", "a url", "rows saved")],
        );
        assert!(report.passed, "{:?}", report.issues);
        assert_eq!(report.notes, "Skill validation passed.");
        assert!(report.outputs.is_empty());
    }

    #[test]
    fn step_keyword_counts_in_either_language() {
        assert!(has_step_structure("Step one: do it"));
        assert!(has_step_structure("第一步骤：打开"));
        assert!(!has_step_structure("just prose"));
    }

    #[test]
    fn every_incomplete_test_is_reported_by_name() {
        let issues: Vec<String> = validate(
            &skill("1. a\n2. b\n3. c"),
            &[case("no-input", " ", "x"), case("ok", "i", "e"), case("no-expected", "i", "")],
        )
        .issues;
        assert_eq!(
            issues,
            vec![
                "Test 'no-input' missing input/expected.",
                "Test 'no-expected' missing input/expected.",
            ]
        );
    }

    #[test]
    fn validation_is_idempotent() {
        let draft = skill("abc\n- x");
        let tests = [case("t", "", "")];
        assert_eq!(validate(&draft, &tests), validate(&draft, &tests));
    }
}
