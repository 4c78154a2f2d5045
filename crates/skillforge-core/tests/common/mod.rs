//! Deterministic stub collaborators for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use skillforge_core::{
    ContentModel, MarketplaceCatalog, MarketplaceEntry, RepoRecord, RepositoryCatalog, SkillSpec,
    ToolRegistry, VideoExtract, VideoExtractor, VideoTarget, WebResult, WebSearch,
};

pub const GOOD_CONTENT: &str = "# Collect\n1. Open the source\n2. Extract the rows\n3. Save the result";

pub fn skill_record(name: &str, content: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{name} description"),
        "tags": ["test"],
        "content": content,
    })
}

pub fn good_skill(name: &str) -> Value {
    skill_record(name, GOOD_CONTENT)
}

pub fn bad_skill(name: &str) -> Value {
    skill_record(name, "abc")
}

pub fn good_tests() -> Vec<Value> {
    vec![json!({
        "name": "happy path",
        "input": "a source",
        "expected": "rows saved",
        "environment": "local",
        "edge_cases": ["empty source"],
    })]
}

/// Content model that replays scripted skill drafts (the last repeats) and
/// records every prompt.
#[derive(Default)]
pub struct ScriptedModel {
    skills: Mutex<VecDeque<Value>>,
    tests: Vec<Value>,
    pub prompts: Mutex<Vec<String>>,
    pub skill_calls: AtomicUsize,
    pub test_calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(skills: Vec<Value>, tests: Vec<Value>) -> Self {
        Self {
            skills: Mutex::new(skills.into()),
            tests,
            ..Default::default()
        }
    }

    pub fn skill_calls(&self) -> usize {
        self.skill_calls.load(Ordering::SeqCst)
    }

    pub fn test_calls(&self) -> usize {
        self.test_calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentModel for ScriptedModel {
    async fn generate_skill(&self, prompt: &str) -> anyhow::Result<Value> {
        self.skill_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut skills = self.skills.lock().unwrap();
        match skills.len() {
            0 => Err(anyhow::anyhow!("model offline")),
            1 => Ok(skills[0].clone()),
            _ => Ok(skills.pop_front().unwrap()),
        }
    }

    async fn generate_tests(&self, _task: &str, _skill: &SkillSpec) -> anyhow::Result<Vec<Value>> {
        self.test_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tests.clone())
    }
}

/// Sets its flag when dropped.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Content model whose skill generation never completes.
#[derive(Default)]
pub struct StalledModel {
    pub dropped: Arc<AtomicBool>,
}

#[async_trait]
impl ContentModel for StalledModel {
    async fn generate_skill(&self, _prompt: &str) -> anyhow::Result<Value> {
        let _guard = DropFlag(self.dropped.clone());
        std::future::pending::<()>().await;
        Ok(Value::Null)
    }

    async fn generate_tests(&self, _task: &str, _skill: &SkillSpec) -> anyhow::Result<Vec<Value>> {
        Ok(good_tests())
    }
}

/// Content model that panics while drafting.
pub struct PanickingModel;

#[async_trait]
impl ContentModel for PanickingModel {
    async fn generate_skill(&self, _prompt: &str) -> anyhow::Result<Value> {
        panic!("model exploded");
    }

    async fn generate_tests(&self, _task: &str, _skill: &SkillSpec) -> anyhow::Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

/// Web search returning fixed results, or failing when `error` is set.
#[derive(Default)]
pub struct StaticWeb {
    pub results: Vec<WebResult>,
    pub error: Option<String>,
    pub queries: Mutex<Vec<String>>,
}

impl StaticWeb {
    pub fn with_results(results: Vec<WebResult>) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearch for StaticWeb {
    async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<WebResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.error {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(self.results.iter().take(top_k).cloned().collect()),
        }
    }
}

pub fn web_hit(title: &str, url: &str) -> WebResult {
    WebResult {
        title: title.to_string(),
        content: format!("{title} content"),
        url: url.to_string(),
    }
}

/// Repository catalog returning a fixed list and recording queries.
#[derive(Default)]
pub struct StaticRepos {
    pub repos: Vec<RepoRecord>,
    pub queries: Mutex<Vec<String>>,
}

impl StaticRepos {
    pub fn with_count(n: usize) -> Self {
        let repos = (0..n)
            .map(|i| RepoRecord {
                id: i as u64,
                full_name: format!("org/repo-{i}"),
                description: format!("Repo number {i}"),
                stars: 100 + i as u64,
                forks: i as u64,
                language: "Rust".to_string(),
                url: format!("https://github.com/org/repo-{i}"),
            })
            .collect();
        Self {
            repos,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepositoryCatalog for StaticRepos {
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<RepoRecord>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.repos.iter().take(limit).cloned().collect())
    }
}

/// Marketplace that answers queries from a queue. `Err` entries fail the
/// call; an exhausted queue answers with no hits.
#[derive(Default)]
pub struct QueuedMarketplace {
    answers: Mutex<VecDeque<Result<Vec<MarketplaceEntry>, String>>>,
    queries: Mutex<Vec<String>>,
}

impl QueuedMarketplace {
    pub fn new(answers: Vec<Result<Vec<MarketplaceEntry>, String>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketplaceCatalog for QueuedMarketplace {
    async fn search(&self, query: &str, _limit: usize) -> anyhow::Result<Vec<MarketplaceEntry>> {
        self.queries.lock().unwrap().push(query.to_string());
        match self.answers.lock().unwrap().pop_front() {
            Some(Ok(hits)) => Ok(hits),
            Some(Err(message)) => Err(anyhow::anyhow!("{message}")),
            None => Ok(Vec::new()),
        }
    }
}

pub fn listing(name: &str) -> MarketplaceEntry {
    MarketplaceEntry {
        id: name.to_lowercase().replace(' ', "-"),
        name: name.to_string(),
        description: format!("{name} listing"),
        ..Default::default()
    }
}

/// Video extractor that answers every URL with the same transcript.
#[derive(Default)]
pub struct StaticVideo {
    pub calls: AtomicUsize,
}

#[async_trait]
impl VideoExtractor for StaticVideo {
    async fn extract(&self, target: &VideoTarget) -> anyhow::Result<VideoExtract> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(VideoExtract {
            title: format!("Video at {target}"),
            transcript: "step one then step two".repeat(500),
            extracted_skills: vec![json!("editing")],
        })
    }
}

/// Registry with web search answering one plain result.
pub fn registry_with_model(model: Arc<dyn ContentModel>) -> ToolRegistry {
    ToolRegistry::new()
        .with_model(model)
        .with_web(Arc::new(StaticWeb::with_results(vec![web_hit(
            "Guide",
            "https://example.com/guide",
        )])))
}

/// Context JSON embedded in a generator prompt.
pub fn prompt_context(prompt: &str) -> Value {
    let (_, context) = prompt
        .split_once("\nContext: ")
        .expect("prompt has a context section");
    serde_json::from_str(context).expect("context is JSON")
}
