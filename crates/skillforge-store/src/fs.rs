//! Filesystem-backed skill store.
//!
//! Layout: `<root>/<slug>/SKILL.md`, each file starting with a frontmatter
//! header followed by the skill body.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::error::{StoreError, StoreResult};
use crate::storage_traits::{content_digest, NewSkill, SkillEntry, SkillStore, StoredSkill};

/// File name of a stored skill inside its slug directory.
pub const SKILL_FILE: &str = "SKILL.md";

const FRONTMATTER_FENCE: &str = "---";
const SKILL_VERSION: &str = "1.0.0";
const DEFAULT_DESCRIPTION: &str = "Local skill";
const DEFAULT_SOURCE: &str = "local";

/// Derive a directory-safe slug from a skill name.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, and trims leading/trailing dashes. Names with no usable
/// characters map to `skill`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "skill".to_string()
    } else {
        slug
    }
}

/// Parse the `key: value` header between the leading `---` fences.
///
/// Returns an empty map when the text does not open with a fence.
pub fn parse_frontmatter(text: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    let mut lines = text.lines();
    if lines.next().map(str::trim) != Some(FRONTMATTER_FENCE) {
        return fields;
    }
    for line in lines {
        if line.trim() == FRONTMATTER_FENCE {
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    fields
}

/// Strip the frontmatter header, returning the body.
pub fn strip_frontmatter(text: &str) -> &str {
    let Some(rest) = text.strip_prefix(FRONTMATTER_FENCE) else {
        return text;
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return text;
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        if line.trim() == FRONTMATTER_FENCE {
            return &rest[offset..];
        }
    }
    text
}

fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ").trim().to_string()
}

/// Render the full `SKILL.md` text for a skill.
pub fn render_skill_file(name: &str, description: &str, source: &str, content: &str) -> String {
    format!(
        "{fence}\nname: {}\ndescription: {}\nsource: {}\nversion: {SKILL_VERSION}\n{fence}\n{}\n",
        header_value(name),
        header_value(description),
        header_value(source),
        content.trim(),
        fence = FRONTMATTER_FENCE,
    )
}

/// Filesystem skill store rooted at a skills directory.
#[derive(Debug, Clone)]
pub struct FsSkillStore {
    root: PathBuf,
}

impl FsSkillStore {
    /// Create a store rooted at `root`. Creates the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn skill_path(&self, slug: &str) -> StoreResult<PathBuf> {
        if slug.is_empty() || slug != slugify(slug) {
            return Err(StoreError::InvalidSlug {
                slug: slug.to_string(),
            });
        }
        Ok(self.root.join(slug).join(SKILL_FILE))
    }
}

fn write_skill(root: &Path, skill: &NewSkill) -> StoreResult<SkillEntry> {
    let slug = slugify(&skill.name);
    let dir = root.join(&slug);
    fs::create_dir_all(&dir)?;
    let path = dir.join(SKILL_FILE);

    let text = render_skill_file(&skill.name, &skill.description, &skill.source, &skill.content);

    // Write to a sibling temp file, then rename over the target.
    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.persist(&path).map_err(|e| e.error)?;

    Ok(SkillEntry {
        id: SkillEntry::id_for(&slug),
        slug,
        name: skill.name.clone(),
        description: skill.description.clone(),
        source: skill.source.clone(),
        path,
        digest: content_digest(text.as_bytes()),
    })
}

fn entry_from_file(slug: &str, path: PathBuf, text: &str) -> SkillEntry {
    let header = parse_frontmatter(text);
    let field = |key: &str| header.get(key).filter(|v| !v.is_empty()).cloned();
    SkillEntry {
        id: SkillEntry::id_for(slug),
        slug: slug.to_string(),
        name: field("name").unwrap_or_else(|| slug.to_string()),
        description: field("description").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        source: field("source").unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        path,
        digest: content_digest(text.as_bytes()),
    }
}

fn scan_skills(root: &Path) -> StoreResult<Vec<SkillEntry>> {
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut found: Vec<(SystemTime, SkillEntry)> = Vec::new();
    for dir in fs::read_dir(root)? {
        let dir = dir?;
        if !dir.file_type()?.is_dir() {
            continue;
        }
        let path = dir.path().join(SKILL_FILE);
        let Ok(bytes) = fs::read(&path) else {
            continue;
        };
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let slug = dir.file_name().to_string_lossy().into_owned();
        let text = String::from_utf8_lossy(&bytes);
        found.push((modified, entry_from_file(&slug, path, &text)));
    }
    found.sort_by(|(ta, a), (tb, b)| tb.cmp(ta).then_with(|| a.slug.cmp(&b.slug)));
    Ok(found.into_iter().map(|(_, entry)| entry).collect())
}

#[async_trait]
impl SkillStore for FsSkillStore {
    #[instrument(skip(self, skill), fields(name = %skill.name))]
    async fn save(&self, skill: NewSkill) -> StoreResult<SkillEntry> {
        let root = self.root.clone();
        let entry = tokio::task::spawn_blocking(move || write_skill(&root, &skill)).await??;
        debug!(slug = %entry.slug, path = %entry.path.display(), "skill written");
        Ok(entry)
    }

    async fn get(&self, slug: &str) -> StoreResult<StoredSkill> {
        let path = self.skill_path(slug)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    slug: slug.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let content = strip_frontmatter(&text).trim_end().to_string();
        Ok(StoredSkill {
            entry: entry_from_file(slug, path, &text),
            content,
        })
    }

    async fn list(&self) -> StoreResult<Vec<SkillEntry>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan_skills(&root)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn slugify_collapses_and_trims() {
        assert_eq!(slugify("  Web Scraper: Pro!  "), "web-scraper-pro");
        assert_eq!(slugify("GitHub__Trending--Report"), "github-trending-report");
        assert_eq!(slugify("浏览器自动化"), "skill");
        assert_eq!(slugify(""), "skill");
    }

    #[test]
    fn frontmatter_parses_header_only() {
        let text = "---\nname: Demo\ndescription: Does: things\n---\nbody: not a field\n";
        let fields = parse_frontmatter(text);
        assert_eq!(fields.get("name").map(String::as_str), Some("Demo"));
        assert_eq!(fields.get("description").map(String::as_str), Some("Does: things"));
        assert!(!fields.contains_key("body"));
    }

    #[test]
    fn frontmatter_absent_yields_empty_map() {
        assert!(parse_frontmatter("# Just a heading\n").is_empty());
    }

    #[test]
    fn render_trims_content_and_flattens_header() {
        let text = render_skill_file("Multi\nLine", "desc", "generated", "\n\n1. step\n\n");
        assert!(text.starts_with("---\nname: Multi Line\n"));
        assert!(text.contains("version: 1.0.0\n---\n1. step\n"));
        assert!(text.ends_with("1. step\n"));
        assert_eq!(strip_frontmatter(&text), "1. step\n");
    }

    #[tokio::test]
    async fn save_then_get_returns_body() {
        let dir = tempdir().unwrap();
        let store = FsSkillStore::new(dir.path()).unwrap();

        let entry = store
            .save(NewSkill::new("Web Scraper", "Scrape pages", "1. open\n2. read\n", "generated"))
            .await
            .unwrap();
        assert_eq!(entry.slug, "web-scraper");
        assert_eq!(entry.id, "local-web-scraper");
        assert_eq!(entry.path, dir.path().join("web-scraper").join(SKILL_FILE));

        let stored = store.get("web-scraper").await.unwrap();
        assert_eq!(stored.content, "1. open\n2. read");
        assert_eq!(stored.entry.name, "Web Scraper");
        assert_eq!(stored.entry.source, "generated");
        assert_eq!(stored.entry.digest, entry.digest);
    }

    #[tokio::test]
    async fn list_falls_back_to_directory_name() {
        let dir = tempdir().unwrap();
        let store = FsSkillStore::new(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("bare")).unwrap();
        fs::write(dir.path().join("bare").join(SKILL_FILE), "no header here\n").unwrap();
        fs::create_dir_all(dir.path().join("empty-dir")).unwrap();

        let entries = store.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "bare");
        assert_eq!(entries[0].description, "Local skill");
        assert_eq!(entries[0].source, "local");
    }

    #[tokio::test]
    async fn get_rejects_path_like_slugs() {
        let dir = tempdir().unwrap();
        let store = FsSkillStore::new(dir.path()).unwrap();
        let err = store.get("../etc").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidSlug { .. }));
    }
}
