//! Domain types shared by the adapters, the sync orchestrator and storage.
//!
//! Timestamps are unix seconds (`i64`), matching how they are stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Owner id used for every source while the system has a single implicit user.
pub const DEFAULT_OWNER: i64 = 1;

/// Default sync interval for new sources (one hour).
pub const DEFAULT_SYNC_INTERVAL_SECS: i64 = 3600;

// ============================================================================
// Source Types
// ============================================================================

/// Source type tag. Open enumeration: unknown tags are preserved as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    Rss,
    Youtube,
    FigmaMcp,
    Wechat,
    Xiaohongshu,
    Github,
    Twitter,
    Podcast,
    BrowserTabs,
    Other(String),
}

impl SourceType {
    pub fn as_str(&self) -> &str {
        match self {
            SourceType::Rss => "rss",
            SourceType::Youtube => "youtube",
            SourceType::FigmaMcp => "figma-mcp",
            SourceType::Wechat => "wechat",
            SourceType::Xiaohongshu => "xiaohongshu",
            SourceType::Github => "github",
            SourceType::Twitter => "twitter",
            SourceType::Podcast => "podcast",
            SourceType::BrowserTabs => "browser-tabs",
            SourceType::Other(tag) => tag,
        }
    }
}

impl From<&str> for SourceType {
    fn from(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "rss" => SourceType::Rss,
            "youtube" => SourceType::Youtube,
            "figma-mcp" => SourceType::FigmaMcp,
            "wechat" => SourceType::Wechat,
            "xiaohongshu" => SourceType::Xiaohongshu,
            "github" => SourceType::Github,
            "twitter" => SourceType::Twitter,
            "podcast" => SourceType::Podcast,
            "browser-tabs" => SourceType::BrowserTabs,
            other => SourceType::Other(other.to_string()),
        }
    }
}

impl From<String> for SourceType {
    fn from(tag: String) -> Self {
        SourceType::from(tag.as_str())
    }
}

impl From<SourceType> for String {
    fn from(source_type: SourceType) -> Self {
        source_type.as_str().to_string()
    }
}

impl FromStr for SourceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SourceType::from(s))
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of content a record holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Video,
    Audio,
    Design,
    Code,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Design => "design",
            ContentType::Code => "code",
        }
    }

    /// Lenient parse used for stored rows: unknown values fall back to `Text`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "video" => ContentType::Video,
            "audio" => ContentType::Audio,
            "design" => ContentType::Design,
            "code" => ContentType::Code,
            _ => ContentType::Text,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Source
// ============================================================================

/// Type-specific source configuration (feed URL, channel id, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceConfig(BTreeMap<String, String>);

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the trimmed value for `key`, treating blank values as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl FromIterator<(String, String)> for SourceConfig {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-source gate deciding which normalized items are persisted.
///
/// Empty lists and `None` bounds impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    pub keywords: Vec<String>,
    pub exclude: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl FilterRules {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.exclude.is_empty()
            && self.min_length.is_none()
            && self.max_length.is_none()
    }
}

/// Outcome of the most recent sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Success,
    Failed,
    InProgress,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "success",
            SyncStatus::Failed => "failed",
            SyncStatus::InProgress => "in_progress",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "success" => Some(SyncStatus::Success),
            "failed" => Some(SyncStatus::Failed),
            "in_progress" => Some(SyncStatus::InProgress),
            _ => None,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured external feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub source_type: SourceType,
    pub config: SourceConfig,
    pub filter_rules: Option<FilterRules>,
    pub sync_interval: i64,
    pub last_sync_at: Option<i64>,
    pub last_sync_status: Option<SyncStatus>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Source {
    /// True when the sync interval has elapsed since the last sync (or it never ran).
    pub fn is_due(&self, now: i64) -> bool {
        match self.last_sync_at {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.sync_interval,
        }
    }
}

/// Fields supplied when creating a source.
#[derive(Debug, Clone)]
pub struct NewSource {
    pub owner_id: i64,
    pub name: String,
    pub source_type: SourceType,
    pub config: SourceConfig,
    pub filter_rules: Option<FilterRules>,
    pub sync_interval: i64,
}

// ============================================================================
// Content
// ============================================================================

/// One item as produced by an adapter, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub body: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<i64>,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i64>,
    /// Identifier supplied by the feed (`<guid>`, `<id>`, video id)
    pub guid: Option<String>,
}

/// A normalized record ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewContent {
    pub source_id: i64,
    pub guid: String,
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub content_type: ContentType,
    pub raw_content: String,
    pub processed_content: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i64>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub published_at: Option<i64>,
    pub fetched_at: i64,
    pub is_read: bool,
    pub is_starred: bool,
    pub is_archived: bool,
}

/// A persisted content row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Content {
    pub id: i64,
    pub source_id: i64,
    pub guid: String,
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub content_type: ContentType,
    pub raw_content: String,
    pub processed_content: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i64>,
    pub tags: Vec<String>,
    pub language: Option<String>,
    pub published_at: Option<i64>,
    pub fetched_at: i64,
    pub is_read: bool,
    pub is_starred: bool,
    pub is_archived: bool,
    pub created_at: i64,
}
