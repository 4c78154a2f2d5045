//! Structured tracing hooks for the run lifecycle.
//!
//! - `RunSpan`: RAII guard entering a span tagged with the trace id
//! - `emit_*`: one structured event per lifecycle step
//!
//! These go to the process log (via `tracing`), not to the run's event
//! stream.

use tracing::{info, warn};

/// RAII guard that keeps a run-scoped span entered.
///
/// Only for synchronous sections; async code should use
/// [`RunSpan::span`] with `Instrument` instead, since an entered guard
/// must not be held across an `.await`.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(trace_id: &str) -> Self {
        Self {
            _span: Self::span(trace_id).entered(),
        }
    }

    pub fn span(trace_id: &str) -> tracing::Span {
        tracing::info_span!("skillforge.run", trace_id = %trace_id)
    }
}

pub fn emit_run_started(trace_id: &str, task: &str, sources: &[&str]) {
    info!(
        event = "run.started",
        trace_id = %trace_id,
        task_chars = task.chars().count(),
        sources = ?sources,
    );
}

pub fn emit_stage_finished(trace_id: &str, stage: &str, passed: bool, issues: usize) {
    info!(
        event = "stage.finished",
        trace_id = %trace_id,
        stage = %stage,
        passed = passed,
        issues = issues,
    );
}

pub fn emit_round_finished(trace_id: &str, round: u32, max_rounds: u32, passed: bool) {
    info!(
        event = "round.finished",
        trace_id = %trace_id,
        round = round,
        max_rounds = max_rounds,
        passed = passed,
    );
}

pub fn emit_run_finished(trace_id: &str, status: &str, rounds: u32, duration_ms: u64) {
    info!(
        event = "run.finished",
        trace_id = %trace_id,
        status = %status,
        rounds = rounds,
        duration_ms = duration_ms,
    );
}

pub fn emit_artifact_saved(trace_id: &str, name: &str, path: &str) {
    info!(event = "artifact.saved", trace_id = %trace_id, name = %name, path = %path);
}

/// Warn level.
pub fn emit_tool_failed(operation: &str, error: &dyn std::fmt::Display) {
    warn!(event = "tool.failed", operation = %operation, error = %error);
}

/// Warn level.
pub fn emit_run_aborted(trace_id: &str, reason: &str) {
    warn!(event = "run.aborted", trace_id = %trace_id, reason = %reason);
}
