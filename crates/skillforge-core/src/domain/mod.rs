//! Domain models for SkillForge.
//!
//! Canonical definitions for the values flowing through a run:
//! - `SkillSpec` / `TestCaseSpec`: the drafted artifact and its scenarios
//! - `ExecutionReport`: pass/fail verdict of the executor and validator
//! - `AgentOutput`: the single terminal result of a run
//! - `Event`: one entry of the live activity stream
//! - `Source` / `SourceSet`: content sources a task may draw from

pub mod error;
pub mod event;
pub mod report;
pub mod skill;
pub mod source;

pub use error::{ForgeError, Result, ToolError, ToolOperation, ValidationIssue, ValidationRule};
pub use event::{stage, Event, EventKind, RawEvent, TraceId};
pub use report::{AgentOutput, ExecutionReport, RunStatus};
pub use skill::{SkillSpec, TestCaseSpec};
pub use source::{Source, SourceSet};
