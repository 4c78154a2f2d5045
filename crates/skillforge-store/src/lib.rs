//! SkillForge Store - skill artifact persistence (Layer 0)
//!
//! Provides the persistence collaborator used by the orchestration core:
//! - [`SkillStore`]: backend-agnostic `save`/`get`/`list` over skill artifacts
//! - [`FsSkillStore`]: `<root>/<slug>/SKILL.md` tree with frontmatter headers
//! - [`fakes::MemorySkillStore`]: in-memory store for tests
//! - [`export`]: CSV export for tabular side artifacts

pub mod error;
pub mod export;
pub mod fakes;
pub mod fs;
pub mod storage_traits;

pub use error::{StoreError, StoreResult};
pub use export::write_table;
pub use fs::{
    parse_frontmatter, render_skill_file, slugify, strip_frontmatter, FsSkillStore, SKILL_FILE,
};
pub use storage_traits::{content_digest, NewSkill, SkillEntry, SkillStore, StoredSkill};
