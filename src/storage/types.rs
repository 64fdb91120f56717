use thiserror::Error;

use crate::model::{
    Content, ContentType, FilterRules, NewContent, Source, SourceConfig, SourceType, SyncStatus,
};

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("The database is locked by another process. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface as
/// one of these messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

/// Errors surfaced by [`ContentStore`](super::ContentStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A content row with this `(source_id, guid)` already exists
    #[error("Content {guid} already stored for source {source_id}")]
    Duplicate { source_id: i64, guid: String },

    /// Content referenced a source that does not exist
    #[error("Source {0} does not exist")]
    MissingSource(i64),

    /// A JSON column could not be encoded or decoded
    #[error("Invalid JSON column: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(DatabaseError::from_sqlx(err))
    }
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for Source queries (used by sqlx FromRow)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SourceRow {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub source_type: String,
    pub config: String,
    pub filter_rules: Option<String>,
    pub sync_interval: i64,
    pub last_sync_at: Option<i64>,
    pub last_sync_status: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SourceRow {
    pub(crate) fn into_source(self) -> Result<Source, StoreError> {
        let config: SourceConfig = serde_json::from_str(&self.config)?;
        let filter_rules = self
            .filter_rules
            .as_deref()
            .map(serde_json::from_str::<FilterRules>)
            .transpose()?;

        Ok(Source {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            source_type: SourceType::from(self.source_type),
            config,
            filter_rules,
            sync_interval: self.sync_interval,
            last_sync_at: self.last_sync_at,
            last_sync_status: self.last_sync_status.as_deref().and_then(SyncStatus::from_tag),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Internal row type for Content queries (used by sqlx FromRow)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ContentRow {
    pub id: i64,
    pub source_id: i64,
    pub guid: String,
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub content_type: String,
    pub raw_content: String,
    pub processed_content: String,
    pub media_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration: Option<i64>,
    pub tags: String,
    pub language: Option<String>,
    pub published_at: Option<i64>,
    pub fetched_at: i64,
    pub is_read: bool,
    pub is_starred: bool,
    pub is_archived: bool,
    pub created_at: i64,
}

impl ContentRow {
    pub(crate) fn into_content(self) -> Result<Content, StoreError> {
        Ok(Content {
            id: self.id,
            source_id: self.source_id,
            guid: self.guid,
            title: self.title,
            summary: self.summary,
            url: self.url,
            author: self.author,
            content_type: ContentType::from_tag(&self.content_type),
            raw_content: self.raw_content,
            processed_content: self.processed_content,
            media_url: self.media_url,
            thumbnail_url: self.thumbnail_url,
            duration: self.duration,
            tags: serde_json::from_str(&self.tags)?,
            language: self.language,
            published_at: self.published_at,
            fetched_at: self.fetched_at,
            is_read: self.is_read,
            is_starred: self.is_starred,
            is_archived: self.is_archived,
            created_at: self.created_at,
        })
    }
}

/// Persisted view of a freshly inserted record.
pub(crate) fn stored_content(new: &NewContent, id: i64, created_at: i64) -> Content {
    Content {
        id,
        source_id: new.source_id,
        guid: new.guid.clone(),
        title: new.title.clone(),
        summary: new.summary.clone(),
        url: new.url.clone(),
        author: new.author.clone(),
        content_type: new.content_type,
        raw_content: new.raw_content.clone(),
        processed_content: new.processed_content.clone(),
        media_url: new.media_url.clone(),
        thumbnail_url: new.thumbnail_url.clone(),
        duration: new.duration,
        tags: new.tags.clone(),
        language: new.language.clone(),
        published_at: new.published_at,
        fetched_at: new.fetched_at,
        is_read: new.is_read,
        is_starred: new.is_starred,
        is_archived: new.is_archived,
        created_at,
    }
}
