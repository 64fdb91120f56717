use crate::model::{Content, NewContent};

use super::schema::Database;
use super::types::{stored_content, ContentRow, StoreError};

/// Maximum number of rows returned by any single content query
const MAX_CONTENTS: i64 = 2000;

const CONTENT_COLUMNS: &str = "id, source_id, guid, title, summary, url, author, content_type, \
     raw_content, processed_content, media_url, thumbnail_url, duration, tags, language, \
     published_at, fetched_at, is_read, is_starred, is_archived, created_at";

impl Database {
    // ========================================================================
    // Content Insert
    // ========================================================================

    pub(crate) async fn insert_content(&self, content: &NewContent) -> Result<Content, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let tags = serde_json::to_string(&content.tags)?;

        let result = sqlx::query(
            r#"
            INSERT INTO contents (source_id, guid, title, summary, url, author, content_type,
                                  raw_content, processed_content, media_url, thumbnail_url,
                                  duration, tags, language, published_at, fetched_at,
                                  is_read, is_starred, is_archived, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(content.source_id)
        .bind(&content.guid)
        .bind(&content.title)
        .bind(&content.summary)
        .bind(&content.url)
        .bind(&content.author)
        .bind(content.content_type.as_str())
        .bind(&content.raw_content)
        .bind(&content.processed_content)
        .bind(&content.media_url)
        .bind(&content.thumbnail_url)
        .bind(content.duration)
        .bind(tags)
        .bind(&content.language)
        .bind(content.published_at)
        .bind(content.fetched_at)
        .bind(content.is_read)
        .bind(content.is_starred)
        .bind(content.is_archived)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(stored_content(content, done.last_insert_rowid(), now)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::Duplicate {
                source_id: content.source_id,
                guid: content.guid.clone(),
            }),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(StoreError::MissingSource(content.source_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Content Queries
    // ========================================================================

    pub async fn get_content(&self, id: i64) -> Result<Option<Content>, StoreError> {
        let row = sqlx::query_as::<_, ContentRow>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM contents WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContentRow::into_content).transpose()
    }

    /// Newest content first, optionally restricted to one source.
    ///
    /// Items without a publish time sort by when they were fetched. The limit
    /// is capped at `MAX_CONTENTS`.
    pub async fn get_contents(
        &self,
        source_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<Content>, StoreError> {
        let limit = limit.clamp(0, MAX_CONTENTS);
        tracing::debug!(limit, source_id, "get_contents with limit cap");

        let rows = sqlx::query_as::<_, ContentRow>(&format!(
            r#"
            SELECT {CONTENT_COLUMNS}
            FROM contents
            WHERE (?1 IS NULL OR source_id = ?1)
            ORDER BY COALESCE(published_at, fetched_at) DESC, id DESC
            LIMIT ?2
        "#
        ))
        .bind(source_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ContentRow::into_content).collect()
    }

    // ========================================================================
    // Content Mutations
    // ========================================================================

    /// Mark content as read (idempotent), returns whether it was changed
    pub async fn mark_content_read(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE contents SET is_read = 1 WHERE id = ? AND is_read = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Atomically toggle starred status, returning the new value
    ///
    /// `None` when the content does not exist.
    pub async fn toggle_content_starred(&self, id: i64) -> Result<Option<bool>, StoreError> {
        let row: Option<(bool,)> = sqlx::query_as(
            "UPDATE contents SET is_starred = NOT is_starred WHERE id = ? RETURNING is_starred",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(starred,)| starred))
    }

    /// Sets the archived flag, returns whether the content exists.
    pub async fn set_content_archived(&self, id: i64, archived: bool) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE contents SET is_archived = ? WHERE id = ?")
            .bind(archived)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
