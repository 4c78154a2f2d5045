//! Executor stage: run the task against the selected sources once.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::instrument;

use super::truncate_chars;
use crate::domain::{ExecutionReport, Source, SourceSet};
use crate::events::{AgentEmitter, Emitter};
use crate::sources::SourceRegistry;
use crate::tooling::{RepoRecord, ToolFacade, WEB_TOP_K};

/// Issue recorded when no source produced anything.
pub const NO_PATH_ISSUE: &str = "No executable path matched this task.";

const TRENDING_COLUMNS: [&str; 6] = ["full_name", "description", "stars", "forks", "language", "url"];
const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Where side artifacts such as the trending export are written.
    pub runs_dir: PathBuf,
    pub trending_window_days: u32,
    pub trending_min_stars: u64,
    pub trending_limit: usize,
    /// Transcript characters kept in the report.
    pub transcript_chars: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            runs_dir: PathBuf::from("output").join("runs"),
            trending_window_days: 30,
            trending_min_stars: 100,
            trending_limit: 20,
            transcript_chars: 4000,
        }
    }
}

/// Repository-search query for repos created in `[start, ..]` above a star floor.
pub fn trending_query(start: NaiveDate, min_stars: u64) -> String {
    format!("created:>={} stars:>{min_stars}", start.format("%Y-%m-%d"))
}

/// Export file name for a trending window.
pub fn trending_file_name(start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "github_trending_{}_to_{}.csv",
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

/// Write the trending window as CSV off the async runtime.
async fn export_trending(
    dir: &Path,
    start: NaiveDate,
    end: NaiveDate,
    repos: &[RepoRecord],
) -> skillforge_store::StoreResult<PathBuf> {
    let rows: Vec<Vec<String>> = repos
        .iter()
        .map(|r| {
            vec![
                r.full_name.clone(),
                r.description.clone(),
                r.stars.to_string(),
                r.forks.to_string(),
                r.language.clone(),
                r.url.clone(),
            ]
        })
        .collect();
    let path = dir.join(trending_file_name(start, end));
    tokio::task::spawn_blocking(move || {
        skillforge_store::write_table(path, &TRENDING_COLUMNS, &rows)
    })
    .await?
}

pub struct ExecutorStage {
    registry: SourceRegistry,
    config: ExecutorConfig,
}

impl ExecutorStage {
    pub const NAME: &'static str = "executor";

    pub fn new(registry: SourceRegistry, config: ExecutorConfig) -> Self {
        Self { registry, config }
    }

    /// Resolve sources, run them, and report. Never fails; every tool error
    /// becomes an issue.
    #[instrument(skip_all, fields(trace_id = %emit.trace_id()))]
    pub async fn run(
        &self,
        task: &str,
        sources: &SourceSet,
        tools: &dyn ToolFacade,
        emit: &Emitter<'_>,
    ) -> ExecutionReport {
        let log = emit.agent(Self::NAME);
        log.plan("Execute task using available tools.").await;

        let mut issues: Vec<String> = Vec::new();
        let mut outputs = Map::new();
        let mut resolved = self.registry.classify_urls(task);

        self.discover_urls(task, sources, tools, &log, &mut resolved, &mut issues)
            .await;

        if sources.contains(Source::Repositories) || task.to_lowercase().contains("github") {
            self.fetch_trending(tools, &log, &mut outputs, &mut issues).await;
        }

        for handler in self.registry.handlers() {
            let source = handler.source();
            let Some(url) = resolved.get(&source).filter(|_| sources.contains(source)) else {
                continue;
            };
            log.action(format!("Extracting {} transcript...", handler.label()))
                .await;
            match handler.extract(url, tools).await {
                Ok(video) => {
                    outputs.insert(
                        format!("{source}_video"),
                        json!({
                            "url": url,
                            "video_id": handler.source_id(url),
                            "title": video.title,
                            "transcript": truncate_chars(&video.transcript, self.config.transcript_chars),
                            "extracted_skills": video.extracted_skills,
                        }),
                    );
                    log.observe(format!("{} transcript captured.", handler.label()), Value::Null)
                        .await;
                }
                Err(err) => {
                    let issue = format!("{} execution failed: {err}", handler.label());
                    log.error(issue.clone()).await;
                    issues.push(issue);
                }
            }
        }

        if sources.contains(Source::Web) && outputs.is_empty() {
            log.action("Running web search...").await;
            match tools.web_search(task, WEB_TOP_K).await {
                Ok(results) => {
                    log.observe(format!("Web search results: {}", results.len()), Value::Null)
                        .await;
                    outputs.insert(
                        "web_search".to_string(),
                        serde_json::to_value(&results).unwrap_or_default(),
                    );
                }
                Err(err) => {
                    let issue = format!("Web search failed: {err}");
                    log.error(issue.clone()).await;
                    issues.push(issue);
                }
            }
        }

        if outputs.is_empty() && issues.is_empty() {
            issues.push(NO_PATH_ISSUE.to_string());
        }

        let report =
            ExecutionReport::from_issues(issues, outputs, "Execution succeeded.", "Execution failed.");
        log.observe(
            report.notes.clone(),
            json!({"issues": report.issues, "outputs": report.outputs}),
        )
        .await;
        report
    }

    /// For each selected URL-driven source without a literal URL in the task,
    /// look one up with a site-scoped web search.
    async fn discover_urls(
        &self,
        task: &str,
        sources: &SourceSet,
        tools: &dyn ToolFacade,
        log: &AgentEmitter<'_, '_>,
        resolved: &mut BTreeMap<Source, String>,
        issues: &mut Vec<String>,
    ) {
        for handler in self.registry.handlers() {
            let source = handler.source();
            if !sources.contains(source) || resolved.contains_key(&source) {
                continue;
            }
            log.action(format!("Searching {} via web search...", handler.label()))
                .await;
            match tools.web_search(&handler.search_query(task), WEB_TOP_K).await {
                Ok(results) => {
                    if let Some(url) = handler.pick_url(&results) {
                        log.observe(
                            format!("Selected {} URL: {url}", handler.label()),
                            json!({ "url": url }),
                        )
                        .await;
                        resolved.insert(source, url);
                    }
                }
                Err(err) => {
                    let issue = format!("{} search failed: {err}", handler.label());
                    log.error(issue.clone()).await;
                    issues.push(issue);
                }
            }
        }
    }

    async fn fetch_trending(
        &self,
        tools: &dyn ToolFacade,
        log: &AgentEmitter<'_, '_>,
        outputs: &mut Map<String, Value>,
        issues: &mut Vec<String>,
    ) {
        let days = self.config.trending_window_days;
        log.action(format!("Fetching GitHub trending repositories (last {days} days)..."))
            .await;
        let end = Utc::now().date_naive();
        let start = end.checked_sub_days(Days::new(u64::from(days))).unwrap_or(end);
        let query = trending_query(start, self.config.trending_min_stars);

        let repos = match tools
            .search_repositories(&query, self.config.trending_limit)
            .await
        {
            Ok(repos) => repos,
            Err(err) => {
                let issue = format!("GitHub execution failed: {err}");
                log.error(issue.clone()).await;
                issues.push(issue);
                return;
            }
        };
        if repos.is_empty() {
            let issue = "No GitHub repositories returned.".to_string();
            log.error(issue.clone()).await;
            issues.push(issue);
            return;
        }

        let sample = &repos[..repos.len().min(SAMPLE_SIZE)];
        outputs.insert(
            "sample".to_string(),
            serde_json::to_value(sample).unwrap_or_default(),
        );

        // The export is a convenience artifact; failing to write it does not
        // fail the run.
        match export_trending(&self.config.runs_dir, start, end, &repos).await {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                outputs.insert("csv".to_string(), json!(path.display().to_string()));
                log.observe(format!("Saved CSV: {name}"), json!({ "path": path }))
                    .await;
            }
            Err(err) => {
                log.error(format!("Trending export failed: {err}")).await;
            }
        }
    }
}
