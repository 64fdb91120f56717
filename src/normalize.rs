//! Conversion of adapter output into content-ready records.

use sha2::{Digest, Sha256};

use crate::model::{ContentType, NewContent, RawItem};
use crate::util::truncate_chars;

/// Default summary budget in characters.
pub const DEFAULT_SUMMARY_CHARS: usize = 200;

/// Builds [`NewContent`] records from [`RawItem`]s.
///
/// The summary is the only derived field; everything else is copied or
/// defaulted. Normalization is total and cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    summary_chars: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_CHARS)
    }
}

impl Normalizer {
    pub fn new(summary_chars: usize) -> Self {
        Self { summary_chars }
    }

    pub fn summary_chars(&self) -> usize {
        self.summary_chars
    }

    /// Normalizes with `fetched_at` set to the current time.
    pub fn normalize(&self, raw: RawItem, source_id: i64, content_type: ContentType) -> NewContent {
        self.normalize_at(raw, source_id, content_type, chrono::Utc::now().timestamp())
    }

    /// Pure form of [`Normalizer::normalize`] with an explicit fetch time.
    pub fn normalize_at(
        &self,
        raw: RawItem,
        source_id: i64,
        content_type: ContentType,
        fetched_at: i64,
    ) -> NewContent {
        let guid = content_guid(&raw);
        let summary = truncate_chars(&raw.body, self.summary_chars).into_owned();

        NewContent {
            source_id,
            guid,
            title: raw.title,
            summary,
            url: raw.url,
            author: raw.author,
            content_type,
            processed_content: raw.body.clone(),
            raw_content: raw.body,
            media_url: raw.media_url,
            thumbnail_url: raw.thumbnail_url,
            duration: raw.duration,
            tags: Vec::new(),
            language: None,
            published_at: raw.published_at,
            fetched_at,
            is_read: false,
            is_starred: false,
            is_archived: false,
        }
    }
}

/// Stable identity for deduplication within a source.
///
/// Uses the feed-supplied guid when present, otherwise a SHA-256 over
/// `url|title|published`.
pub fn content_guid(raw: &RawItem) -> String {
    if let Some(guid) = raw.guid.as_deref() {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        raw.url.as_deref().unwrap_or(""),
        raw.title,
        raw.published_at.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
