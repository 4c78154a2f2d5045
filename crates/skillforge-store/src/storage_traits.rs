//! Storage trait definitions for SkillForge
//!
//! `SkillStore` is the single persistence seam of the system: the
//! orchestrator writes a validated skill exactly once per successful run,
//! and the skill generator reads previously stored skills as context.
//!
//! The trait is async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StoreResult;

/// Compute the SHA-256 hex digest of the given bytes.
pub fn content_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A skill about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSkill {
    pub name: String,
    pub description: String,
    pub content: String,
    /// Where the skill came from (`generated`, `imported`, ...)
    pub source: String,
}

impl NewSkill {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            content: content.into(),
            source: source.into(),
        }
    }
}

/// Metadata handle for a stored skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    /// Stable identifier, `local-<slug>`
    pub id: String,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub source: String,
    /// Location of the stored artifact (a pseudo-path for in-memory stores)
    pub path: PathBuf,
    /// SHA-256 hex digest of the stored file bytes
    pub digest: String,
}

impl SkillEntry {
    pub fn id_for(slug: &str) -> String {
        format!("local-{slug}")
    }
}

/// A stored skill with its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSkill {
    pub entry: SkillEntry,
    /// Body text without the frontmatter header
    pub content: String,
}

/// Persistence store for skill artifacts.
///
/// Guarantees:
/// - `save` derives the slug from the skill name; saving the same name twice
///   overwrites the earlier artifact.
/// - `get(slug)` returns the content previously saved under that slug, or
///   `StoreError::NotFound`.
/// - `list` returns every stored skill, most recently written first.
#[async_trait]
pub trait SkillStore: Send + Sync {
    /// Write a skill and return its handle.
    async fn save(&self, skill: NewSkill) -> StoreResult<SkillEntry>;

    /// Read a stored skill by slug.
    async fn get(&self, slug: &str) -> StoreResult<StoredSkill>;

    /// List stored skills, newest first.
    async fn list(&self) -> StoreResult<Vec<SkillEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex() {
        let a = content_digest(b"skill");
        assert_eq!(a.len(), 64);
        assert_eq!(a, content_digest(b"skill"));
        assert_ne!(a, content_digest(b"skill!"));
    }

    #[test]
    fn entry_id_prefix() {
        assert_eq!(SkillEntry::id_for("web-scraper"), "local-web-scraper");
    }
}
