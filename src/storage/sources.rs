use crate::model::{NewSource, Source, SyncStatus};

use super::schema::Database;
use super::types::{SourceRow, StoreError};

const SOURCE_COLUMNS: &str = "id, owner_id, name, source_type, config, filter_rules, sync_interval, \
     last_sync_at, last_sync_status, is_active, created_at, updated_at";

impl Database {
    // ========================================================================
    // Source Queries
    // ========================================================================

    pub(crate) async fn source_by_id(&self, id: i64) -> Result<Option<Source>, StoreError> {
        let row = sqlx::query_as::<_, SourceRow>(&format!(
            "SELECT {SOURCE_COLUMNS} FROM sources WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SourceRow::into_source).transpose()
    }

    pub(crate) async fn sources_for_owner(&self, owner_id: i64) -> Result<Vec<Source>, StoreError> {
        let rows = sqlx::query_as::<_, SourceRow>(&format!(
            "SELECT {SOURCE_COLUMNS} FROM sources WHERE owner_id = ? ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SourceRow::into_source).collect()
    }

    // ========================================================================
    // Source Mutations
    // ========================================================================

    /// Inserts a source. Configuration is not checked here; callers validate
    /// it against the adapter first.
    pub async fn create_source(&self, source: &NewSource) -> Result<Source, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let config = serde_json::to_string(&source.config)?;
        let filter_rules = source
            .filter_rules
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let row = sqlx::query_as::<_, SourceRow>(&format!(
            r#"
            INSERT INTO sources (owner_id, name, source_type, config, filter_rules,
                                 sync_interval, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING {SOURCE_COLUMNS}
        "#
        ))
        .bind(source.owner_id)
        .bind(&source.name)
        .bind(source.source_type.as_str())
        .bind(config)
        .bind(filter_rules)
        .bind(source.sync_interval)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let created = row.into_source()?;
        tracing::info!(source_id = created.id, source_type = %created.source_type, "Created source");
        Ok(created)
    }

    /// Writes the editable fields of `source`, returns whether it existed.
    ///
    /// Sync state is left untouched: only the sync pipeline writes it.
    pub async fn update_source(&self, source: &Source) -> Result<bool, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let config = serde_json::to_string(&source.config)?;
        let filter_rules = source
            .filter_rules
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE sources
            SET name = ?, source_type = ?, config = ?, filter_rules = ?,
                sync_interval = ?, is_active = ?, updated_at = ?
            WHERE id = ?
        "#,
        )
        .bind(&source.name)
        .bind(source.source_type.as_str())
        .bind(config)
        .bind(filter_rules)
        .bind(source.sync_interval)
        .bind(source.is_active)
        .bind(now)
        .bind(source.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a source and (by cascade) all of its content.
    pub async fn delete_source(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Enables or disables scheduled syncing, returns whether the source exists.
    pub async fn set_source_active(&self, id: i64, active: bool) -> Result<bool, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query("UPDATE sources SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn update_sync_state(
        &self,
        id: i64,
        status: SyncStatus,
        at: Option<i64>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sources SET last_sync_status = ?, last_sync_at = COALESCE(?, last_sync_at) WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
