//! Trait contract tests for SkillStore.
//!
//! Every conforming store must pass these; each contract runs against the
//! in-memory fake and the filesystem store.

use skillforge_store::fakes::MemorySkillStore;
use skillforge_store::{FsSkillStore, NewSkill, SkillStore, StoreError};
use tempfile::TempDir;

async fn contract_save_get_round_trip(store: &dyn SkillStore) {
    let entry = store
        .save(NewSkill::new(
            "Trending Repos",
            "Collect trending repositories",
            "  1. Query the catalog\n2. Export the table  ",
            "generated",
        ))
        .await
        .unwrap();
    assert_eq!(entry.slug, "trending-repos");
    assert_eq!(entry.id, "local-trending-repos");

    let stored = store.get(&entry.slug).await.unwrap();
    assert_eq!(stored.content, "1. Query the catalog\n2. Export the table");
    assert_eq!(stored.entry.description, "Collect trending repositories");
    assert_eq!(stored.entry.digest, entry.digest);
}

async fn contract_missing_slug_is_not_found(store: &dyn SkillStore) {
    let err = store.get("never-saved").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

async fn contract_same_name_overwrites(store: &dyn SkillStore) {
    store
        .save(NewSkill::new("Dup", "first", "old body", "generated"))
        .await
        .unwrap();
    let second = store
        .save(NewSkill::new("Dup", "second", "new body", "generated"))
        .await
        .unwrap();

    let entries = store.list().await.unwrap();
    assert_eq!(entries.iter().filter(|e| e.slug == "dup").count(), 1);
    let stored = store.get("dup").await.unwrap();
    assert_eq!(stored.content, "new body");
    assert_eq!(stored.entry.digest, second.digest);
}

async fn contract_empty_store_lists_nothing(store: &dyn SkillStore) {
    assert!(store.list().await.unwrap().is_empty());
}

fn fs_store() -> (TempDir, FsSkillStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSkillStore::new(dir.path().join("skills")).unwrap();
    (dir, store)
}

#[tokio::test]
async fn memory_store_round_trip() {
    contract_save_get_round_trip(&MemorySkillStore::new()).await;
}

#[tokio::test]
async fn fs_store_round_trip() {
    let (_dir, store) = fs_store();
    contract_save_get_round_trip(&store).await;
}

#[tokio::test]
async fn memory_store_not_found() {
    contract_missing_slug_is_not_found(&MemorySkillStore::new()).await;
}

#[tokio::test]
async fn fs_store_not_found() {
    let (_dir, store) = fs_store();
    contract_missing_slug_is_not_found(&store).await;
}

#[tokio::test]
async fn memory_store_overwrites() {
    contract_same_name_overwrites(&MemorySkillStore::new()).await;
}

#[tokio::test]
async fn fs_store_overwrites() {
    let (_dir, store) = fs_store();
    contract_same_name_overwrites(&store).await;
}

#[tokio::test]
async fn memory_store_starts_empty() {
    contract_empty_store_lists_nothing(&MemorySkillStore::new()).await;
}

#[tokio::test]
async fn fs_store_starts_empty() {
    let (_dir, store) = fs_store();
    contract_empty_store_lists_nothing(&store).await;
}

#[tokio::test]
async fn fs_store_writes_frontmatter_file() {
    let (_dir, store) = fs_store();
    let entry = store
        .save(NewSkill::new("Notes", "Take notes", "- write\n- read", "generated"))
        .await
        .unwrap();

    let text = std::fs::read_to_string(&entry.path).unwrap();
    assert_eq!(
        text,
        "---\nname: Notes\ndescription: Take notes\nsource: generated\nversion: 1.0.0\n---\n- write\n- read\n"
    );
}
