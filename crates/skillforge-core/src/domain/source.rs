//! Content sources a task can draw from.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ForgeError;

/// One selectable content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// The skills.sh marketplace.
    Marketplace,
    /// Code-repository search (GitHub).
    Repositories,
    Bilibili,
    YouTube,
    /// General web search.
    Web,
}

impl Source {
    pub const ALL: [Source; 5] = [
        Source::Marketplace,
        Source::Repositories,
        Source::Bilibili,
        Source::YouTube,
        Source::Web,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Marketplace => "skills.sh",
            Source::Repositories => "github",
            Source::Bilibili => "bilibili",
            Source::YouTube => "youtube",
            Source::Web => "web",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skills.sh" | "skills" | "skillssh" | "marketplace" => Ok(Source::Marketplace),
            "github" | "repos" | "repositories" => Ok(Source::Repositories),
            "bilibili" => Ok(Source::Bilibili),
            "youtube" => Ok(Source::YouTube),
            "web" | "search" => Ok(Source::Web),
            other => Err(ForgeError::UnknownSource(other.to_string())),
        }
    }
}

/// The set of sources selected for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceSet(BTreeSet<Source>);

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated flag list. Blank entries are skipped, and so
    /// are flags no source answers to.
    pub fn parse_list(list: &str) -> Self {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .filter_map(|flag| match Source::from_str(flag) {
                Ok(source) => Some(source),
                Err(err) => {
                    warn!(error = %err, "ignoring source flag");
                    None
                }
            })
            .collect()
    }

    pub fn contains(&self, source: Source) -> bool {
        self.0.contains(&source)
    }

    pub fn insert(&mut self, source: Source) -> bool {
        self.0.insert(source)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Source> + '_ {
        self.0.iter().copied()
    }

    /// Flag names in stable order, for logs and generation context.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|s| s.as_str()).collect()
    }
}

impl FromIterator<Source> for SourceSet {
    fn from_iter<I: IntoIterator<Item = Source>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Source; N]> for SourceSet {
    fn from(sources: [Source; N]) -> Self {
        sources.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_skips_blanks() {
        let set = SourceSet::parse_list(" GitHub, ,skills.sh,search");
        assert!(set.contains(Source::Repositories));
        assert!(set.contains(Source::Marketplace));
        assert!(set.contains(Source::Web));
        assert!(!set.contains(Source::YouTube));
    }

    #[test]
    fn unknown_flag_is_rejected_alone() {
        let err = "myspace".parse::<Source>().unwrap_err();
        assert!(matches!(err, ForgeError::UnknownSource(ref s) if s == "myspace"));
    }

    #[test]
    fn list_skips_unknown_flags() {
        assert_eq!(
            SourceSet::parse_list("github,myspace"),
            SourceSet::from([Source::Repositories])
        );
        assert!(SourceSet::parse_list("pinterest").is_empty());
    }

    #[test]
    fn empty_list_is_empty_set() {
        assert!(SourceSet::parse_list("").is_empty());
    }
}
