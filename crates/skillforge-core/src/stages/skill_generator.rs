//! Skill-generator stage: assemble context and draft a skill.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use skillforge_store::SkillStore;
use tracing::instrument;

use super::truncate_chars;
use crate::domain::{ExecutionReport, SkillSpec, Source, SourceSet};
use crate::events::{AgentEmitter, Emitter};
use crate::sources::{find_urls, SourceRegistry};
use crate::tooling::{ToolFacade, MARKETPLACE_LIMIT, REPOSITORY_LIMIT, WEB_TOP_K};

const CONTEXT_MATCHES: usize = 5;
const LOCAL_CONTENT_CHARS: usize = 2000;
const TRANSCRIPT_CHARS: usize = 2000;

/// Extra search terms added when the task contains a trigger keyword.
const QUERY_EXPANSIONS: &[(&[&str], &[&str])] = &[
    (
        &["浏览器", "自动化", "网页"],
        &["browser automation", "playwright automation", "web automation"],
    ),
    (&["视频", "教程"], &["video tutorial"]),
];

/// Search queries for `task`: the task itself, then synonym terms for any
/// trigger keywords it contains. Order-preserving, without duplicates.
pub fn expand_queries(task: &str) -> Vec<String> {
    let mut queries = vec![task.trim().to_string()];
    for (triggers, terms) in QUERY_EXPANSIONS {
        if triggers.iter().any(|t| task.contains(t)) {
            queries.extend(terms.iter().map(|t| t.to_string()));
        }
    }
    if task.to_lowercase().contains("github") {
        queries.push("github automation".to_string());
    }
    let mut unique: Vec<String> = Vec::with_capacity(queries.len());
    for query in queries {
        if !query.is_empty() && !unique.contains(&query) {
            unique.push(query);
        }
    }
    unique
}

pub struct SkillGeneratorStage {
    store: Arc<dyn SkillStore>,
    registry: SourceRegistry,
    local_limit: usize,
}

impl SkillGeneratorStage {
    pub const NAME: &'static str = "skill_generator";

    pub fn new(store: Arc<dyn SkillStore>, registry: SourceRegistry, local_limit: usize) -> Self {
        Self {
            store,
            registry,
            local_limit,
        }
    }

    /// Draft one skill. A failed generation call yields
    /// [`SkillSpec::placeholder`] so the validator rejects the round.
    #[instrument(skip_all, fields(trace_id = %emit.trace_id(), retry = feedback.is_some()))]
    pub async fn run(
        &self,
        task: &str,
        sources: &SourceSet,
        feedback: Option<&str>,
        execution: &ExecutionReport,
        tools: &dyn ToolFacade,
        emit: &Emitter<'_>,
    ) -> SkillSpec {
        let log = emit.agent(Self::NAME);
        log.plan("Generate a draft skill spec from available sources.")
            .await;

        let context = self
            .build_context(task, sources, feedback, execution, tools, &log)
            .await;
        let prompt = format!(
            "Task: {task}\nContext: {}",
            Value::Object(context)
        );

        log.action("Generating skill with content model...").await;
        match tools.generate_artifact(&prompt).await {
            Ok(skill) => {
                log.observe(
                    format!("Skill drafted: {}", skill.name),
                    json!({ "name": skill.name, "tags": skill.tags }),
                )
                .await;
                skill
            }
            Err(err) => {
                log.error(format!("Skill generation failed: {err}")).await;
                SkillSpec::placeholder()
            }
        }
    }

    async fn build_context(
        &self,
        task: &str,
        sources: &SourceSet,
        feedback: Option<&str>,
        execution: &ExecutionReport,
        tools: &dyn ToolFacade,
        log: &AgentEmitter<'_, '_>,
    ) -> Map<String, Value> {
        let mut context = Map::new();
        context.insert("sources".into(), json!(sources.names()));

        let local = self.local_skills(task, log).await;
        if !local.is_empty() {
            context.insert("local_skills".into(), Value::Array(local));
        }

        if sources.contains(Source::Marketplace) {
            log.action("Searching skills.sh...").await;
            let mut found = Vec::new();
            for query in expand_queries(task) {
                match tools.search_marketplace(&query, MARKETPLACE_LIMIT).await {
                    Ok(batch) if !batch.is_empty() => {
                        found = batch;
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log.error(format!("skills.sh search failed: {err}")).await;
                        break;
                    }
                }
            }
            log.observe(format!("skills.sh matches: {}", found.len()), Value::Null)
                .await;
            found.truncate(CONTEXT_MATCHES);
            context.insert(
                "skills_sh".into(),
                serde_json::to_value(found).unwrap_or_default(),
            );
        }

        if sources.contains(Source::Repositories) {
            log.action("Searching GitHub...").await;
            let mut found = Vec::new();
            for query in expand_queries(task) {
                match tools.search_repositories(&query, REPOSITORY_LIMIT).await {
                    Ok(batch) if !batch.is_empty() => {
                        found = batch;
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log.error(format!("GitHub search failed: {err}")).await;
                        break;
                    }
                }
            }
            log.observe(format!("GitHub repos: {}", found.len()), Value::Null)
                .await;
            found.truncate(CONTEXT_MATCHES);
            context.insert(
                "github".into(),
                serde_json::to_value(found).unwrap_or_default(),
            );
        }

        if let Some(video) = self.video_context(task, sources, execution, tools, log).await {
            context.insert("video".into(), video);
        }

        if sources.contains(Source::Web) {
            log.action("Running web search...").await;
            match tools.web_search(task, WEB_TOP_K).await {
                Ok(results) => {
                    log.observe(format!("Web search results: {}", results.len()), Value::Null)
                        .await;
                    context.insert(
                        "web_search".into(),
                        serde_json::to_value(results).unwrap_or_default(),
                    );
                }
                Err(err) => log.error(format!("Web search failed: {err}")).await,
            }
        }

        if let Some(feedback) = feedback.filter(|f| !f.is_empty()) {
            context.insert("feedback".into(), json!(feedback));
        }
        if !execution.outputs.is_empty() {
            context.insert(
                "execution_summary".into(),
                Value::Object(execution.outputs.clone()),
            );
        }
        context
    }

    /// Stored skills whose name or description contains the task; when
    /// none match, the most recent few.
    async fn local_skills(&self, task: &str, log: &AgentEmitter<'_, '_>) -> Vec<Value> {
        let entries = match self.store.list().await {
            Ok(entries) => entries,
            Err(err) => {
                log.error(format!("Local skill lookup failed: {err}")).await;
                return Vec::new();
            }
        };
        let needle = task.to_lowercase();
        let mut picked: Vec<_> = entries
            .iter()
            .filter(|e| {
                format!("{} {}", e.name, e.description)
                    .to_lowercase()
                    .contains(&needle)
            })
            .take(self.local_limit)
            .collect();
        if picked.is_empty() {
            picked = entries.iter().take(self.local_limit).collect();
        }

        let mut context = Vec::with_capacity(picked.len());
        for entry in picked {
            let content = match self.store.get(&entry.slug).await {
                Ok(stored) => stored.content,
                Err(err) => {
                    log.error(format!("Local skill '{}' unreadable: {err}", entry.slug))
                        .await;
                    continue;
                }
            };
            context.push(json!({
                "name": entry.name,
                "description": entry.description,
                "path": entry.path,
                "content": truncate_chars(&content, LOCAL_CONTENT_CHARS),
            }));
        }
        context
    }

    /// Transcript context for the first selected video URL embedded in the
    /// task. Reuses what the executor already captured when possible.
    async fn video_context(
        &self,
        task: &str,
        sources: &SourceSet,
        execution: &ExecutionReport,
        tools: &dyn ToolFacade,
        log: &AgentEmitter<'_, '_>,
    ) -> Option<Value> {
        let (handler, url) = find_urls(task).into_iter().find_map(|url| {
            self.registry
                .resolve(url)
                .filter(|h| sources.contains(h.source()))
                .map(|h| (h.clone(), url))
        })?;

        if let Some(captured) = execution.outputs.get(&format!("{}_video", handler.source())) {
            log.action_with(
                format!("{} URL detected (handled in sources).", handler.label()),
                json!({ "url": url }),
            )
            .await;
            return Some(json!({
                "title": captured.get("title").cloned().unwrap_or(Value::Null),
                "transcript": captured
                    .get("transcript")
                    .and_then(Value::as_str)
                    .map(|t| truncate_chars(t, TRANSCRIPT_CHARS))
                    .unwrap_or_default(),
            }));
        }

        log.action(format!("Extracting {} transcript...", handler.label()))
            .await;
        match handler.extract(url, tools).await {
            Ok(video) => {
                log.observe(format!("{} transcript captured.", handler.label()), Value::Null)
                    .await;
                Some(json!({
                    "title": video.title,
                    "transcript": truncate_chars(&video.transcript, TRANSCRIPT_CHARS),
                }))
            }
            Err(err) => {
                log.error(format!("{} extract failed: {err}", handler.label()))
                    .await;
                None
            }
        }
    }
}
