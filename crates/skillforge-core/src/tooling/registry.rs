//! Collaborator-backed tool facade.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use super::collaborators::{
    ContentModel, MarketplaceCatalog, RepositoryCatalog, VideoExtractor, WebSearch,
};
use super::{
    MarketplaceEntry, RepoRecord, ToolFacade, VideoExtract, VideoTarget, WebResult,
};
use crate::domain::skill::{DEFAULT_DESCRIPTION, UNTITLED_SKILL};
use crate::domain::{SkillSpec, TestCaseSpec, ToolError, ToolOperation};
use crate::metrics::METRICS;
use crate::obs;

/// [`ToolFacade`] implementation that routes each operation to a pluggable
/// collaborator.
///
/// Operations whose collaborator is not configured fail with an
/// "unavailable" [`ToolError`]. When a timeout is set, every call is bounded
/// by it.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    marketplace: Option<Arc<dyn MarketplaceCatalog>>,
    repositories: Option<Arc<dyn RepositoryCatalog>>,
    video: Option<Arc<dyn VideoExtractor>>,
    model: Option<Arc<dyn ContentModel>>,
    web: Option<Arc<dyn WebSearch>>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route every operation to one object implementing all collaborators.
    pub fn from_shared<T>(all: Arc<T>) -> Self
    where
        T: MarketplaceCatalog
            + RepositoryCatalog
            + VideoExtractor
            + ContentModel
            + WebSearch
            + 'static,
    {
        Self::new()
            .with_marketplace(all.clone())
            .with_repositories(all.clone())
            .with_video(all.clone())
            .with_model(all.clone())
            .with_web(all)
    }

    pub fn with_marketplace(mut self, catalog: Arc<dyn MarketplaceCatalog>) -> Self {
        self.marketplace = Some(catalog);
        self
    }

    pub fn with_repositories(mut self, catalog: Arc<dyn RepositoryCatalog>) -> Self {
        self.repositories = Some(catalog);
        self
    }

    pub fn with_video(mut self, extractor: Arc<dyn VideoExtractor>) -> Self {
        self.video = Some(extractor);
        self
    }

    pub fn with_model(mut self, model: Arc<dyn ContentModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_web(mut self, search: Arc<dyn WebSearch>) -> Self {
        self.web = Some(search);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn call<T, F>(&self, operation: ToolOperation, fut: F) -> Result<T, ToolError>
    where
        F: Future<Output = anyhow::Result<T>> + Send,
    {
        METRICS.inc_tool_calls();
        let started = Instant::now();
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result.map_err(|e| ToolError::new(operation, format!("{e:#}"))),
                Err(_) => Err(ToolError::timeout(operation, limit)),
            },
            None => fut
                .await
                .map_err(|e| ToolError::new(operation, format!("{e:#}"))),
        };
        match &outcome {
            Ok(_) => debug!(
                operation = %operation,
                duration_ms = started.elapsed().as_millis() as u64,
                "tool call succeeded"
            ),
            Err(err) => record_failure(err),
        }
        outcome
    }
}

fn record_failure(err: &ToolError) {
    METRICS.inc_tool_failures();
    obs::emit_tool_failed(err.operation.as_str(), err);
}

fn require<'a, T: ?Sized>(
    slot: &'a Option<Arc<T>>,
    operation: ToolOperation,
) -> Result<&'a T, ToolError> {
    match slot {
        Some(collaborator) => Ok(&**collaborator),
        None => {
            let err = ToolError::unavailable(operation);
            record_failure(&err);
            Err(err)
        }
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Coerce a content-model record into a [`SkillSpec`], defaulting missing
/// fields.
pub fn normalize_skill(record: Value) -> Result<SkillSpec, String> {
    let Value::Object(map) = record else {
        return Err("content model returned a non-object skill record".to_string());
    };
    let tags: Vec<String> = match map.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    Ok(SkillSpec::new(
        text_field(&map, "name").unwrap_or_else(|| UNTITLED_SKILL.to_string()),
        text_field(&map, "description").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        tags,
        map.get("content").and_then(Value::as_str).unwrap_or_default(),
    ))
}

fn fallback_record(task: &str) -> Value {
    let case = TestCaseSpec::fallback(task);
    json!({
        "name": case.name,
        "input": case.input,
        "expected": case.expected,
        "environment": case.environment,
        "edge_cases": case.edge_cases,
    })
}

#[async_trait]
impl ToolFacade for ToolRegistry {
    async fn search_marketplace(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MarketplaceEntry>, ToolError> {
        let op = ToolOperation::SearchMarketplace;
        let catalog = require(&self.marketplace, op)?;
        self.call(op, catalog.search(query, limit)).await
    }

    async fn search_repositories(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RepoRecord>, ToolError> {
        let op = ToolOperation::SearchRepositories;
        let catalog = require(&self.repositories, op)?;
        let mut repos = self.call(op, catalog.search(query, limit)).await?;
        repos.truncate(limit);
        Ok(repos)
    }

    async fn extract_video(&self, target: &VideoTarget) -> Result<VideoExtract, ToolError> {
        let op = ToolOperation::ExtractVideo;
        let extractor = require(&self.video, op)?;
        self.call(op, extractor.extract(target)).await
    }

    async fn generate_artifact(&self, prompt: &str) -> Result<SkillSpec, ToolError> {
        let op = ToolOperation::GenerateArtifact;
        let model = require(&self.model, op)?;
        let record = self.call(op, model.generate_skill(prompt)).await?;
        normalize_skill(record).map_err(|message| {
            let err = ToolError::new(op, message);
            record_failure(&err);
            err
        })
    }

    async fn generate_test_cases(
        &self,
        task: &str,
        skill: &SkillSpec,
    ) -> Result<Vec<Value>, ToolError> {
        let op = ToolOperation::GenerateTestCases;
        let model = require(&self.model, op)?;
        let records = self.call(op, model.generate_tests(task, skill)).await?;
        if records.is_empty() {
            debug!("content model returned no test cases; using fallback case");
            return Ok(vec![fallback_record(task)]);
        }
        Ok(records)
    }

    async fn web_search(&self, query: &str, top_k: usize) -> Result<Vec<WebResult>, ToolError> {
        let op = ToolOperation::WebSearch;
        let search = require(&self.web, op)?;
        self.call(op, search.search(query, top_k)).await
    }
}
