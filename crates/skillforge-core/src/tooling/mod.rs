//! Tool facade: the single boundary between stages and external services.
//!
//! Stages only talk to [`ToolFacade`]. Every operation is async, performs no
//! retries, and reports failure through [`ToolError`]. [`ToolRegistry`]
//! implements the facade on top of pluggable collaborator traits, and
//! [`RecordedResponses`] supplies canned collaborator data for replays.

pub mod collaborators;
pub mod fixtures;
pub mod registry;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{SkillSpec, ToolError};

pub use collaborators::{
    ContentModel, MarketplaceCatalog, RepositoryCatalog, VideoExtractor, WebSearch,
};
pub use fixtures::RecordedResponses;
pub use registry::{normalize_skill, ToolRegistry};

/// Default result limit for marketplace searches.
pub const MARKETPLACE_LIMIT: usize = 20;
/// Default result limit for repository searches.
pub const REPOSITORY_LIMIT: usize = 10;
/// Default result count for web searches.
pub const WEB_TOP_K: usize = 5;

/// A skills.sh marketplace listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub stars: u64,
    pub github_url: String,
    pub raw_url: String,
}

/// A code-repository search hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoRecord {
    pub id: u64,
    pub full_name: String,
    pub description: String,
    pub stars: u64,
    pub forks: u64,
    pub language: String,
    pub url: String,
}

/// Title and transcript pulled from a video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoExtract {
    pub title: String,
    pub transcript: String,
    pub extracted_skills: Vec<Value>,
}

/// A web search hit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebResult {
    pub title: String,
    pub content: String,
    pub url: String,
}

/// What to extract a transcript from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoTarget {
    Url(String),
    LocalPath(PathBuf),
}

impl std::fmt::Display for VideoTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoTarget::Url(url) => f.write_str(url),
            VideoTarget::LocalPath(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Capability-oriented facade over every external service a run touches.
#[async_trait]
pub trait ToolFacade: Send + Sync {
    /// Keyword search against the skill marketplace.
    async fn search_marketplace(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MarketplaceEntry>, ToolError>;

    /// Keyword search against the code-repository catalog.
    async fn search_repositories(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RepoRecord>, ToolError>;

    /// Pull title and transcript from a video URL or local file.
    async fn extract_video(&self, target: &VideoTarget) -> Result<VideoExtract, ToolError>;

    /// Draft a skill from a prompt.
    async fn generate_artifact(&self, prompt: &str) -> Result<SkillSpec, ToolError>;

    /// Produce raw test-case records for a skill. Never empty on success.
    async fn generate_test_cases(
        &self,
        task: &str,
        skill: &SkillSpec,
    ) -> Result<Vec<Value>, ToolError>;

    async fn web_search(&self, query: &str, top_k: usize) -> Result<Vec<WebResult>, ToolError>;
}
