//! Stage verdicts and the terminal run result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Pass/fail verdict of one executor or validator invocation.
///
/// `passed` is always the absence of issues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub passed: bool,
    pub issues: Vec<String>,
    pub notes: String,
    #[serde(default)]
    pub outputs: Map<String, Value>,
}

impl ExecutionReport {
    /// Build a report whose verdict follows from `issues`.
    pub fn from_issues(
        issues: Vec<String>,
        outputs: Map<String, Value>,
        pass_note: &str,
        fail_note: &str,
    ) -> Self {
        let passed = issues.is_empty();
        Self {
            passed,
            issues,
            notes: if passed { pass_note } else { fail_note }.to_string(),
            outputs,
        }
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Fail,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Ok => write!(f, "ok"),
            RunStatus::Fail => write!(f, "fail"),
        }
    }
}

/// The single result returned by an orchestrator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_agent: Option<String>,
    pub payload: Map<String, Value>,
    pub errors: Vec<String>,
    pub trace_id: String,
}

impl AgentOutput {
    pub fn ok(trace_id: impl Into<String>, next_agent: &str, payload: Map<String, Value>) -> Self {
        Self {
            status: RunStatus::Ok,
            next_agent: Some(next_agent.to_string()),
            payload,
            errors: Vec::new(),
            trace_id: trace_id.into(),
        }
    }

    pub fn fail(
        trace_id: impl Into<String>,
        payload: Map<String, Value>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            status: RunStatus::Fail,
            next_agent: None,
            payload,
            errors,
            trace_id: trace_id.into(),
        }
    }
}
