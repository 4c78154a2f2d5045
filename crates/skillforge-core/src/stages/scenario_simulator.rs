//! Scenario-simulator stage: derive test cases for a drafted skill.

use serde_json::{json, Value};
use tracing::instrument;

use crate::domain::{SkillSpec, TestCaseSpec};
use crate::events::Emitter;
use crate::tooling::ToolFacade;

#[derive(Debug, Default, Clone, Copy)]
pub struct ScenarioSimulatorStage;

impl ScenarioSimulatorStage {
    pub const NAME: &'static str = "scenario_simulator";

    pub fn new() -> Self {
        Self
    }

    /// Ask the facade for test records and keep the well-formed ones.
    ///
    /// Records that are not JSON objects are dropped with an `error` event.
    /// Unnamed cases get a positional name. A failed call yields no cases.
    #[instrument(skip_all, fields(trace_id = %emit.trace_id(), skill = %skill.name))]
    pub async fn run(
        &self,
        task: &str,
        skill: &SkillSpec,
        tools: &dyn ToolFacade,
        emit: &Emitter<'_>,
    ) -> Vec<TestCaseSpec> {
        let log = emit.agent(Self::NAME);
        log.plan("Generate test cases for the skill.").await;
        log.action("Drafting test cases...").await;

        let records = match tools.generate_test_cases(task, skill).await {
            Ok(records) => records,
            Err(err) => {
                log.error(format!("Test case generation failed: {err}")).await;
                return Vec::new();
            }
        };

        let mut tests = Vec::with_capacity(records.len());
        for (idx, record) in records.into_iter().enumerate() {
            if !record.is_object() {
                log.error(format!("Discarded malformed test case #{}", idx + 1))
                    .await;
                continue;
            }
            match serde_json::from_value::<TestCaseSpec>(record) {
                Ok(mut case) => {
                    if case.name.trim().is_empty() {
                        case.name = format!("Case {}", idx + 1);
                    }
                    tests.push(case);
                }
                Err(err) => {
                    log.error(format!("Discarded malformed test case #{}: {err}", idx + 1))
                        .await;
                }
            }
        }

        let names: Vec<Value> = tests.iter().map(|t| json!(t.name)).collect();
        log.observe(
            format!("Test cases generated: {}", tests.len()),
            json!({ "names": names }),
        )
        .await;
        tests
    }
}
