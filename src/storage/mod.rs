//! Persistence for sources and content.
//!
//! The sync pipeline depends only on the [`ContentStore`] trait; [`Database`]
//! is the SQLite implementation and adds the management operations used by
//! the CLI.

mod contents;
mod schema;
mod sources;
mod types;

use std::future::Future;

use crate::model::{Content, NewContent, Source, SyncStatus};

pub use schema::Database;
pub use types::{DatabaseError, StoreError};

/// Repository contract consumed by the sync pipeline.
///
/// Implementations must accept concurrent, independent calls: syncs for
/// different sources run in parallel and never coordinate.
pub trait ContentStore: Send + Sync {
    /// Persists one record. Fails with [`StoreError::Duplicate`] when the
    /// source already holds content with the same guid.
    fn create_content(
        &self,
        content: &NewContent,
    ) -> impl Future<Output = Result<Content, StoreError>> + Send;

    fn get_source(&self, id: i64) -> impl Future<Output = Result<Option<Source>, StoreError>> + Send;

    /// Every source belonging to `owner_id`, active or not.
    fn get_sources(
        &self,
        owner_id: i64,
    ) -> impl Future<Output = Result<Vec<Source>, StoreError>> + Send;

    /// Records sync progress. `at` replaces `last_sync_at` when present.
    fn set_sync_state(
        &self,
        id: i64,
        status: SyncStatus,
        at: Option<i64>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

impl ContentStore for Database {
    async fn create_content(&self, content: &NewContent) -> Result<Content, StoreError> {
        self.insert_content(content).await
    }

    async fn get_source(&self, id: i64) -> Result<Option<Source>, StoreError> {
        self.source_by_id(id).await
    }

    async fn get_sources(&self, owner_id: i64) -> Result<Vec<Source>, StoreError> {
        self.sources_for_owner(owner_id).await
    }

    async fn set_sync_state(
        &self,
        id: i64,
        status: SyncStatus,
        at: Option<i64>,
    ) -> Result<(), StoreError> {
        self.update_sync_state(id, status, at).await
    }
}
