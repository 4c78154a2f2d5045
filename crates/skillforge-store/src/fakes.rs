//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemorySkillStore`, which satisfies the `SkillStore` contract
//! without touching the filesystem and counts writes so tests can assert
//! how often persistence happened.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::fs::{render_skill_file, slugify, SKILL_FILE};
use crate::storage_traits::{content_digest, NewSkill, SkillEntry, SkillStore, StoredSkill};

/// In-memory skill store. Entries are kept in write order.
#[derive(Debug, Default)]
pub struct MemorySkillStore {
    skills: Mutex<Vec<StoredSkill>>,
    saves: AtomicUsize,
}

impl MemorySkillStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing skills, oldest first.
    pub fn with_skills(skills: impl IntoIterator<Item = NewSkill>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.lock();
            for skill in skills {
                upsert(&mut guard, skill);
            }
        }
        store
    }

    /// Number of `save` calls made through the trait.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredSkill>> {
        self.skills.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn upsert(skills: &mut Vec<StoredSkill>, skill: NewSkill) -> SkillEntry {
    let slug = slugify(&skill.name);
    let text = render_skill_file(&skill.name, &skill.description, &skill.source, &skill.content);
    let entry = SkillEntry {
        id: SkillEntry::id_for(&slug),
        path: PathBuf::from("memory").join(&slug).join(SKILL_FILE),
        slug,
        name: skill.name,
        description: skill.description,
        source: skill.source,
        digest: content_digest(text.as_bytes()),
    };
    skills.retain(|s| s.entry.slug != entry.slug);
    skills.push(StoredSkill {
        entry: entry.clone(),
        content: skill.content.trim().to_string(),
    });
    entry
}

#[async_trait]
impl SkillStore for MemorySkillStore {
    async fn save(&self, skill: NewSkill) -> StoreResult<SkillEntry> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(upsert(&mut self.lock(), skill))
    }

    async fn get(&self, slug: &str) -> StoreResult<StoredSkill> {
        self.lock()
            .iter()
            .find(|s| s.entry.slug == slug)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                slug: slug.to_string(),
            })
    }

    async fn list(&self) -> StoreResult<Vec<SkillEntry>> {
        Ok(self.lock().iter().rev().map(|s| s.entry.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_skills_are_not_counted_as_saves() {
        let store = MemorySkillStore::with_skills([NewSkill::new("A", "a", "x", "local")]);
        assert_eq!(store.save_count(), 0);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resave_replaces_and_moves_to_front() {
        let store = MemorySkillStore::new();
        store.save(NewSkill::new("One", "1", "a", "generated")).await.unwrap();
        store.save(NewSkill::new("Two", "2", "b", "generated")).await.unwrap();
        store.save(NewSkill::new("One", "1b", "c", "generated")).await.unwrap();

        let slugs: Vec<_> = store.list().await.unwrap().into_iter().map(|e| e.slug).collect();
        assert_eq!(slugs, vec!["one", "two"]);
        assert_eq!(store.get("one").await.unwrap().content, "c");
        assert_eq!(store.save_count(), 3);
    }
}
