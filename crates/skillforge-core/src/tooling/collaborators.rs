//! External collaborator seams.
//!
//! Concrete network clients live outside this crate; they plug in by
//! implementing these traits. Errors are left heterogeneous (`anyhow`) and
//! normalized by the registry.

use async_trait::async_trait;
use serde_json::Value;

use super::{MarketplaceEntry, RepoRecord, VideoExtract, VideoTarget, WebResult};
use crate::domain::SkillSpec;

#[async_trait]
pub trait MarketplaceCatalog: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<MarketplaceEntry>>;
}

#[async_trait]
pub trait RepositoryCatalog: Send + Sync {
    /// An empty result is not an error.
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<RepoRecord>>;
}

#[async_trait]
pub trait VideoExtractor: Send + Sync {
    async fn extract(&self, target: &VideoTarget) -> anyhow::Result<VideoExtract>;
}

/// Text generation backend for skills and test cases.
#[async_trait]
pub trait ContentModel: Send + Sync {
    /// Returns a skill-shaped JSON object; missing fields are defaulted.
    async fn generate_skill(&self, prompt: &str) -> anyhow::Result<Value>;

    /// May return an empty list.
    async fn generate_tests(&self, task: &str, skill: &SkillSpec) -> anyhow::Result<Vec<Value>>;
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<WebResult>>;
}
