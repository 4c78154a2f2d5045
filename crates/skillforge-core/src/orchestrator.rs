//! Orchestrator: sequences the stages into a bounded retry loop.
//!
//! ```text
//! Init -> Executing -> { Drafting -> Testing -> Validating } x <= max_rounds -> Done(ok | fail)
//! ```
//!
//! The executor runs exactly once. A failed execution ends the run before
//! any drafting. Each failing round feeds its validation issues, joined with
//! `"; "`, into the next round's generator. The first passing round is
//! persisted and ends the run.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};
use skillforge_store::{NewSkill, SkillStore};
use tracing::{debug, Instrument};

use crate::config::ForgeConfig;
use crate::domain::{
    AgentOutput, ExecutionReport, RunStatus, SkillSpec, SourceSet, TestCaseSpec, TraceId,
};
use crate::events::{Emitter, EventSink};
use crate::metrics::METRICS;
use crate::obs;
use crate::sources::SourceRegistry;
use crate::stages::{
    ExecutorConfig, ExecutorStage, ScenarioSimulatorStage, SkillGeneratorStage, ValidatorStage,
};
use crate::tooling::ToolFacade;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Executing,
    Drafting { round: u32 },
    Testing { round: u32 },
    Validating { round: u32 },
    Done(RunStatus),
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Init => write!(f, "init"),
            Phase::Executing => write!(f, "executing"),
            Phase::Drafting { round } => write!(f, "drafting[{round}]"),
            Phase::Testing { round } => write!(f, "testing[{round}]"),
            Phase::Validating { round } => write!(f, "validating[{round}]"),
            Phase::Done(status) => write!(f, "done[{status}]"),
        }
    }
}

/// Round counter and feedback carried between rounds.
#[derive(Debug, Clone)]
pub struct RoundLoop {
    max_rounds: u32,
    round: u32,
    feedback: Option<String>,
}

impl RoundLoop {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
            round: 0,
            feedback: None,
        }
    }

    /// Start the next round, or `None` once the budget is spent.
    pub fn next_round(&mut self) -> Option<u32> {
        (self.round < self.max_rounds).then(|| {
            self.round += 1;
            self.round
        })
    }

    pub fn has_next(&self) -> bool {
        self.round < self.max_rounds
    }

    pub fn rounds_started(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Feedback from the previous failing round.
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Record a failing round; its issues become the next round's feedback.
    pub fn record_failure(&mut self, issues: &[String]) -> &str {
        self.feedback.insert(issues.join("; "))
    }
}

struct Tracker<'a> {
    trace_id: &'a TraceId,
    phase: Phase,
}

impl Tracker<'_> {
    fn enter(&mut self, next: Phase) {
        debug!(trace_id = %self.trace_id, from = %self.phase, to = %next, "phase transition");
        self.phase = next;
    }
}

fn round_payload(
    execution: &ExecutionReport,
    skill: Option<&SkillSpec>,
    tests: Option<&[TestCaseSpec]>,
    validation: Option<&ExecutionReport>,
) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("execution".into(), json!(execution));
    if let Some(skill) = skill {
        payload.insert("skill".into(), json!(skill));
    }
    if let Some(tests) = tests {
        payload.insert("tests".into(), json!(tests));
    }
    if let Some(validation) = validation {
        payload.insert("validation".into(), json!(validation));
    }
    payload
}

/// Runs the executor once, then up to `max_rounds` draft/test/validate
/// rounds.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn SkillStore>,
    registry: SourceRegistry,
    executor_config: ExecutorConfig,
    local_context_limit: usize,
    max_rounds: u32,
}

impl Orchestrator {
    pub const NAME: &'static str = "orchestrator";
    pub const DEFAULT_MAX_ROUNDS: u32 = 2;
    /// `next_agent` of a successful run.
    pub const NEXT_AGENT: &'static str = "final";

    pub fn new(store: Arc<dyn SkillStore>) -> Self {
        Self {
            store,
            registry: SourceRegistry::builtin(),
            executor_config: ExecutorConfig::default(),
            local_context_limit: 3,
            max_rounds: Self::DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn from_config(config: &ForgeConfig, store: Arc<dyn SkillStore>) -> Self {
        Self::new(store)
            .with_executor_config(config.executor_config())
            .with_local_context_limit(config.local_context_limit)
            .with_max_rounds(config.max_rounds)
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_executor_config(mut self, config: ExecutorConfig) -> Self {
        self.executor_config = config;
        self
    }

    pub fn with_local_context_limit(mut self, limit: usize) -> Self {
        self.local_context_limit = limit;
        self
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Run one task to completion, emitting progress into `sink`.
    ///
    /// Always returns exactly one [`AgentOutput`]; stage failures are
    /// reflected in its status and errors.
    pub async fn run(
        &self,
        task: &str,
        sources: &SourceSet,
        tools: &dyn ToolFacade,
        sink: &dyn EventSink,
    ) -> AgentOutput {
        self.run_with_trace(TraceId::new(), task, sources, tools, sink)
            .await
    }

    /// [`Orchestrator::run`] under a caller-assigned trace id.
    pub async fn run_with_trace(
        &self,
        trace_id: TraceId,
        task: &str,
        sources: &SourceSet,
        tools: &dyn ToolFacade,
        sink: &dyn EventSink,
    ) -> AgentOutput {
        let span = obs::RunSpan::span(trace_id.as_str());
        self.run_inner(trace_id, task, sources, tools, sink)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        trace_id: TraceId,
        task: &str,
        sources: &SourceSet,
        tools: &dyn ToolFacade,
        sink: &dyn EventSink,
    ) -> AgentOutput {
        let started = Instant::now();
        METRICS.inc_runs_started();
        obs::emit_run_started(trace_id.as_str(), task, &sources.names());

        let emit = Emitter::new(sink, trace_id.clone());
        let log = emit.agent(Self::NAME);
        let mut tracker = Tracker {
            trace_id: &trace_id,
            phase: Phase::Init,
        };

        tracker.enter(Phase::Executing);
        log.plan("Execute task first, then derive skill.").await;
        let executor = ExecutorStage::new(self.registry.clone(), self.executor_config.clone());
        let execution = executor.run(task, sources, tools, &emit).await;
        obs::emit_stage_finished(
            trace_id.as_str(),
            ExecutorStage::NAME,
            execution.passed,
            execution.issues.len(),
        );
        if !execution.passed {
            let output = AgentOutput::fail(
                trace_id.as_str(),
                round_payload(&execution, None, None, None),
                execution.issues.clone(),
            );
            return self.finish(&mut tracker, output, 0, started);
        }

        let generator = SkillGeneratorStage::new(
            self.store.clone(),
            self.registry.clone(),
            self.local_context_limit,
        );
        let simulator = ScenarioSimulatorStage::new();
        let validator = ValidatorStage::new();

        let mut rounds = RoundLoop::new(self.max_rounds);
        let mut last: Option<(SkillSpec, Vec<TestCaseSpec>, ExecutionReport)> = None;

        while let Some(round) = rounds.next_round() {
            METRICS.inc_rounds();
            tracker.enter(Phase::Drafting { round });
            log.action(format!("Skill draft round {round}/{}.", rounds.max_rounds()))
                .await;
            let skill = generator
                .run(task, sources, rounds.feedback(), &execution, tools, &emit)
                .await;

            tracker.enter(Phase::Testing { round });
            let tests = simulator.run(task, &skill, tools, &emit).await;

            tracker.enter(Phase::Validating { round });
            let validation = validator.run(&skill, &tests, &emit).await;
            obs::emit_round_finished(
                trace_id.as_str(),
                round,
                rounds.max_rounds(),
                validation.passed,
            );

            if validation.passed {
                log.observe("Skill validated successfully.", Value::Null)
                    .await;
                let payload =
                    round_payload(&execution, Some(&skill), Some(&tests), Some(&validation));
                let output = self
                    .persist(&emit, &trace_id, &skill, payload)
                    .await;
                return self.finish(&mut tracker, output, round, started);
            }

            let feedback = rounds.record_failure(&validation.issues).to_string();
            if rounds.has_next() {
                log.action_with(
                    "Skill validation failed; retrying with feedback.",
                    json!({ "feedback": feedback }),
                )
                .await;
            }
            last = Some((skill, tests, validation));
        }

        let (payload, errors) = match &last {
            Some((skill, tests, validation)) => (
                round_payload(&execution, Some(skill), Some(tests), Some(validation)),
                validation.issues.clone(),
            ),
            None => (round_payload(&execution, None, None, None), Vec::new()),
        };
        log.observe(
            format!(
                "Skill still failing after {} round(s).",
                rounds.rounds_started()
            ),
            Value::Null,
        )
        .await;
        let output = AgentOutput::fail(trace_id.as_str(), payload, errors);
        self.finish(&mut tracker, output, rounds.rounds_started(), started)
    }

    /// Save the validated skill and build the success output.
    async fn persist(
        &self,
        emit: &Emitter<'_>,
        trace_id: &TraceId,
        skill: &SkillSpec,
        mut payload: Map<String, Value>,
    ) -> AgentOutput {
        let log = emit.agent(Self::NAME);
        if emit.is_cancelled() {
            obs::emit_run_aborted(trace_id.as_str(), "consumer gone before persistence");
            return AgentOutput::fail(
                trace_id.as_str(),
                payload,
                vec!["Run cancelled before the skill was saved.".to_string()],
            );
        }

        let draft = NewSkill::new(
            skill.name.clone(),
            skill.description.clone(),
            skill.content.clone(),
            "generated",
        );
        let mut errors = Vec::new();
        match self.store.save(draft).await {
            Ok(entry) => {
                let path = entry.path.display().to_string();
                obs::emit_artifact_saved(trace_id.as_str(), &entry.name, &path);
                log.observe(
                    format!("Skill saved: {path}"),
                    json!({ "name": entry.name, "path": path }),
                )
                .await;
                payload.insert(
                    "artifact".into(),
                    json!({
                        "id": entry.id,
                        "name": entry.name,
                        "path": path,
                        "digest": entry.digest,
                    }),
                );
            }
            Err(err) => {
                let message = format!("Skill save failed: {err}");
                log.error(message.clone()).await;
                errors.push(message);
            }
        }

        let mut output = AgentOutput::ok(trace_id.as_str(), Self::NEXT_AGENT, payload);
        output.errors = errors;
        output
    }

    fn finish(
        &self,
        tracker: &mut Tracker<'_>,
        output: AgentOutput,
        rounds: u32,
        started: Instant,
    ) -> AgentOutput {
        tracker.enter(Phase::Done(output.status));
        obs::emit_run_finished(
            &output.trace_id,
            &output.status.to_string(),
            rounds,
            started.elapsed().as_millis() as u64,
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_loop_is_bounded() {
        let mut rounds = RoundLoop::new(2);
        assert_eq!(rounds.next_round(), Some(1));
        assert!(rounds.has_next());
        assert_eq!(rounds.next_round(), Some(2));
        assert!(!rounds.has_next());
        assert_eq!(rounds.next_round(), None);
        assert_eq!(rounds.rounds_started(), 2);
    }

    #[test]
    fn zero_budget_still_allows_one_round() {
        let mut rounds = RoundLoop::new(0);
        assert_eq!(rounds.next_round(), Some(1));
        assert_eq!(rounds.next_round(), None);
    }

    #[test]
    fn feedback_joins_previous_issues() {
        let mut rounds = RoundLoop::new(3);
        assert_eq!(rounds.feedback(), None);
        rounds.record_failure(&["a".to_string(), "b".to_string()]);
        assert_eq!(rounds.feedback(), Some("a; b"));
        rounds.record_failure(&["c".to_string()]);
        assert_eq!(rounds.feedback(), Some("c"));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn finished_run_leaves_process_totals_alone() {
        let store = Arc::new(skillforge_store::fakes::MemorySkillStore::new());
        let sink = crate::events::RecordingSink::new();
        let tools = crate::tooling::ToolRegistry::new();

        let output = Orchestrator::new(store)
            .run("summarize my week", &SourceSet::new(), &tools, &sink)
            .await;

        assert_eq!(output.status, RunStatus::Fail);
        assert!(logs_contain("run.finished"));
        assert!(!logs_contain("process_totals"));
    }

    #[test]
    fn phases_display_round() {
        assert_eq!(Phase::Validating { round: 2 }.to_string(), "validating[2]");
        assert_eq!(Phase::Done(RunStatus::Ok).to_string(), "done[ok]");
    }
}
