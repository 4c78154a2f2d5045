//! SkillForge Core Library
//!
//! Turns a natural-language task plus a set of content sources into a
//! validated skill artifact:
//!
//! - [`ExecutorStage`] runs the task once against the selected sources
//! - [`SkillGeneratorStage`], [`ScenarioSimulatorStage`] and
//!   [`ValidatorStage`] draft, test and gate a skill, round by round
//! - [`Orchestrator`] sequences the stages with retry-on-feedback
//! - [`AgentService`] exposes one run as a live [`EventStream`]
//!
//! All external services sit behind [`ToolFacade`].

pub mod config;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod service;
pub mod sources;
pub mod stages;
pub mod telemetry;
pub mod tooling;

pub use config::ForgeConfig;

pub use domain::{
    stage, AgentOutput, Event, EventKind, ExecutionReport, ForgeError, RawEvent, Result,
    RunStatus, SkillSpec, Source, SourceSet, TestCaseSpec, ToolError, ToolOperation, TraceId,
    ValidationIssue, ValidationRule,
};

pub use events::{
    BuiltinMiddleware, Emitter, EventMiddleware, EventSink, MiddlewareChain, RecordingSink,
    TerminalMiddleware,
};

pub use metrics::METRICS;

pub use obs::{
    emit_artifact_saved, emit_round_finished, emit_run_aborted, emit_run_finished,
    emit_run_started, emit_stage_finished, emit_tool_failed, RunSpan,
};

pub use orchestrator::{Orchestrator, Phase, RoundLoop};

pub use service::{AgentService, EventStream};

pub use sources::{find_urls, SourceHandler, SourceRegistry, VideoHostHandler};

pub use stages::{
    check_skill, expand_queries, validate, ExecutorConfig, ExecutorStage, ScenarioSimulatorStage,
    SkillGeneratorStage, ValidatorStage,
};

pub use tooling::{
    ContentModel, MarketplaceCatalog, MarketplaceEntry, RecordedResponses, RepoRecord,
    RepositoryCatalog, ToolFacade, ToolRegistry, VideoExtract, VideoExtractor, VideoTarget,
    WebResult, WebSearch,
};

pub use skillforge_store::{FsSkillStore, NewSkill, SkillEntry, SkillStore, StoredSkill};
