//! Recorded collaborator responses.
//!
//! A JSON document of canned responses that stands in for every external
//! collaborator, so a run can be replayed deterministically:
//!
//! ```json
//! {
//!   "marketplace": [{"name": "...", "description": "..."}],
//!   "repositories": [{"full_name": "org/repo", "stars": 120}],
//!   "videos": {"https://youtu.be/abc": {"title": "...", "transcript": "..."}},
//!   "web": [{"title": "...", "content": "...", "url": "..."}],
//!   "skills": [{"name": "...", "content": "..."}],
//!   "tests": [[{"name": "...", "input": "...", "expected": "..."}]],
//!   "failures": {"web_search": "HTTP 503"}
//! }
//! ```
//!
//! `skills` and `tests` are consumed one entry per call; once exhausted the
//! last entry repeats. Operations listed under `failures` always fail.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::collaborators::{
    ContentModel, MarketplaceCatalog, RepositoryCatalog, VideoExtractor, WebSearch,
};
use super::{MarketplaceEntry, RepoRecord, VideoExtract, VideoTarget, WebResult};
use crate::domain::{ForgeError, Result, SkillSpec, ToolOperation};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecordedResponses {
    marketplace: Vec<MarketplaceEntry>,
    repositories: Vec<RepoRecord>,
    videos: BTreeMap<String, VideoExtract>,
    web: Vec<WebResult>,
    skills: Vec<Value>,
    tests: Vec<Vec<Value>>,
    failures: HashMap<ToolOperation, String>,
    #[serde(skip)]
    skill_cursor: AtomicUsize,
    #[serde(skip)]
    test_cursor: AtomicUsize,
}

impl RecordedResponses {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ForgeError::Fixture(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ForgeError::Fixture(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    fn check(&self, operation: ToolOperation) -> anyhow::Result<()> {
        match self.failures.get(&operation) {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

fn next_entry<'a, T>(entries: &'a [T], cursor: &AtomicUsize) -> Option<&'a T> {
    let idx = cursor.fetch_add(1, Ordering::SeqCst);
    entries.get(idx.min(entries.len().saturating_sub(1)))
}

#[async_trait]
impl MarketplaceCatalog for RecordedResponses {
    async fn search(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<MarketplaceEntry>> {
        self.check(ToolOperation::SearchMarketplace)?;
        Ok(self.marketplace.iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl RepositoryCatalog for RecordedResponses {
    async fn search(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<RepoRecord>> {
        self.check(ToolOperation::SearchRepositories)?;
        Ok(self.repositories.iter().take(limit).cloned().collect())
    }
}

#[async_trait]
impl VideoExtractor for RecordedResponses {
    async fn extract(&self, target: &VideoTarget) -> anyhow::Result<VideoExtract> {
        self.check(ToolOperation::ExtractVideo)?;
        self.videos
            .get(&target.to_string())
            .cloned()
            .ok_or_else(|| anyhow!("no recorded extraction for {target}"))
    }
}

#[async_trait]
impl ContentModel for RecordedResponses {
    async fn generate_skill(&self, _prompt: &str) -> anyhow::Result<Value> {
        self.check(ToolOperation::GenerateArtifact)?;
        next_entry(&self.skills, &self.skill_cursor)
            .cloned()
            .ok_or_else(|| anyhow!("no recorded skill drafts"))
    }

    async fn generate_tests(&self, _task: &str, _skill: &SkillSpec) -> anyhow::Result<Vec<Value>> {
        self.check(ToolOperation::GenerateTestCases)?;
        Ok(next_entry(&self.tests, &self.test_cursor)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl WebSearch for RecordedResponses {
    async fn search(&self, _query: &str, top_k: usize) -> anyhow::Result<Vec<WebResult>> {
        self.check(ToolOperation::WebSearch)?;
        Ok(self.web.iter().take(top_k).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tooling::{ToolFacade, ToolRegistry};
    use std::sync::Arc;

    const FIXTURE: &str = r#"{
        "skills": [{"name": "First"}, {"name": "Second"}],
        "videos": {"https://youtu.be/abc": {"title": "Intro", "transcript": "hello"}},
        "failures": {"web_search": "HTTP 503"}
    }"#;

    #[tokio::test]
    async fn skills_advance_then_repeat_last() {
        let registry = ToolRegistry::from_shared(Arc::new(RecordedResponses::from_json(FIXTURE).unwrap()));
        let names: Vec<String> = [
            registry.generate_artifact("p").await.unwrap().name,
            registry.generate_artifact("p").await.unwrap().name,
            registry.generate_artifact("p").await.unwrap().name,
        ]
        .into();
        assert_eq!(names, vec!["First", "Second", "Second"]);
    }

    #[tokio::test]
    async fn recorded_failures_surface_as_tool_errors() {
        let registry = ToolRegistry::from_shared(Arc::new(RecordedResponses::from_json(FIXTURE).unwrap()));
        let err = registry.web_search("anything", 5).await.unwrap_err();
        assert_eq!(err.message, "HTTP 503");
    }

    #[tokio::test]
    async fn videos_are_keyed_by_url() {
        let registry = ToolRegistry::from_shared(Arc::new(RecordedResponses::from_json(FIXTURE).unwrap()));
        let hit = registry
            .extract_video(&VideoTarget::Url("https://youtu.be/abc".into()))
            .await
            .unwrap();
        assert_eq!(hit.title, "Intro");
        assert!(registry
            .extract_video(&VideoTarget::Url("https://youtu.be/zzz".into()))
            .await
            .is_err());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let err = RecordedResponses::from_json(r#"{"skils": []}"#).unwrap_err();
        assert!(matches!(err, ForgeError::Fixture(_)));
    }
}
