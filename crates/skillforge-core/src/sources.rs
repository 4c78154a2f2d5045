//! URL-driven source handlers.
//!
//! A [`SourceRegistry`] holds an ordered list of [`SourceHandler`]s. A URL
//! is dispatched to the first handler (in registration order) whose
//! `can_handle` accepts it.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::domain::{Source, ToolError};
use crate::tooling::{ToolFacade, VideoExtract, VideoTarget, WebResult};

/// Every `http://` or `https://` URL in `text`, in order of appearance.
///
/// A URL runs from its scheme to the next whitespace.
pub fn find_urls(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .filter_map(|token| {
            let start = match (token.find("http://"), token.find("https://")) {
                (Some(a), Some(b)) => a.min(b),
                (Some(a), None) | (None, Some(a)) => a,
                (None, None) => return None,
            };
            let url = &token[start..];
            let scheme_len = if url.starts_with("https://") { 8 } else { 7 };
            (url.len() > scheme_len).then_some(url)
        })
        .collect()
}

/// One content source reachable through URLs.
#[async_trait]
pub trait SourceHandler: Send + Sync {
    fn source(&self) -> Source;

    /// Human-readable name used in messages and issue strings.
    fn label(&self) -> &str;

    fn can_handle(&self, url: &str) -> bool;

    /// Web-search query that finds candidate URLs for `task`.
    fn search_query(&self, task: &str) -> String;

    /// First URL in `results` belonging to this source. Fields are scanned
    /// title, content, url; the first pattern match wins.
    fn pick_url(&self, results: &[WebResult]) -> Option<String>;

    /// Source-native identifier embedded in the URL, if any. Recorded next to
    /// the extracted transcript.
    fn source_id(&self, _url: &str) -> Option<String> {
        None
    }

    async fn extract(&self, url: &str, tools: &dyn ToolFacade) -> Result<VideoExtract, ToolError> {
        tools.extract_video(&VideoTarget::Url(url.to_string())).await
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

/// Handler for a video hosting site.
pub struct VideoHostHandler {
    source: Source,
    label: &'static str,
    domains: &'static [&'static str],
    site_scope: &'static str,
    url_patterns: Vec<Regex>,
    id_patterns: Vec<Regex>,
}

const BILIBILI_URLS: [&str; 2] = [r"https?://\S*bilibili\.com/\S+", r"https?://b23\.tv/\S+"];
const BILIBILI_IDS: [&str; 3] = [
    r"bilibili\.com/video/(BV\w+)",
    r"b23\.tv/(\w+)",
    r"bilibili\.com/video/av(\d+)",
];
const YOUTUBE_URLS: [&str; 2] = [r"https?://\S*youtube\.com/\S+", r"https?://youtu\.be/\S+"];
const YOUTUBE_IDS: [&str; 3] = [
    r"youtube\.com/watch\?(?:\S*&)?v=([\w-]+)",
    r"youtu\.be/([\w-]+)",
    r"youtube\.com/shorts/([\w-]+)",
];

impl VideoHostHandler {
    pub fn bilibili() -> Self {
        Self {
            source: Source::Bilibili,
            label: "Bilibili",
            domains: &["bilibili.com", "b23.tv"],
            site_scope: "site:bilibili.com/video",
            url_patterns: compile(&BILIBILI_URLS),
            id_patterns: compile(&BILIBILI_IDS),
        }
    }

    pub fn youtube() -> Self {
        Self {
            source: Source::YouTube,
            label: "YouTube",
            domains: &["youtube.com", "youtu.be"],
            site_scope: "site:youtube.com/watch OR youtu.be",
            url_patterns: compile(&YOUTUBE_URLS),
            id_patterns: compile(&YOUTUBE_IDS),
        }
    }
}

#[async_trait]
impl SourceHandler for VideoHostHandler {
    fn source(&self) -> Source {
        self.source
    }

    fn label(&self) -> &str {
        self.label
    }

    fn can_handle(&self, url: &str) -> bool {
        self.domains.iter().any(|d| url.contains(d))
    }

    fn search_query(&self, task: &str) -> String {
        format!("{} {}", task.trim(), self.site_scope)
    }

    fn pick_url(&self, results: &[WebResult]) -> Option<String> {
        results.iter().find_map(|item| {
            [&item.title, &item.content, &item.url].into_iter().find_map(|field| {
                self.url_patterns
                    .iter()
                    .find_map(|re| re.find(field).map(|m| m.as_str().to_string()))
            })
        })
    }

    fn source_id(&self, url: &str) -> Option<String> {
        self.id_patterns.iter().find_map(|re| {
            re.captures(url)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
    }
}

/// Ordered handler list; first match wins.
#[derive(Clone)]
pub struct SourceRegistry {
    handlers: Vec<Arc<dyn SourceHandler>>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SourceRegistry {
    /// Registry with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Bilibili, then YouTube.
    pub fn builtin() -> Self {
        Self::new()
            .register(Arc::new(VideoHostHandler::bilibili()))
            .register(Arc::new(VideoHostHandler::youtube()))
    }

    pub fn register(mut self, handler: Arc<dyn SourceHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn handlers(&self) -> &[Arc<dyn SourceHandler>] {
        &self.handlers
    }

    pub fn resolve(&self, url: &str) -> Option<&Arc<dyn SourceHandler>> {
        self.handlers.iter().find(|h| h.can_handle(url))
    }

    /// First literal URL in `text` for each source that has a handler.
    pub fn classify_urls(&self, text: &str) -> BTreeMap<Source, String> {
        let mut found = BTreeMap::new();
        for url in find_urls(text) {
            if let Some(handler) = self.resolve(url) {
                found.entry(handler.source()).or_insert_with(|| url.to_string());
            }
        }
        found
    }
}
