//! One sync cycle per source: fetch, normalize, filter, persist.

use futures::stream::{self, StreamExt};
use thiserror::Error;

use crate::adapter::{AdapterRegistry, FetchFailure, SourceAdapter};
use crate::feed::FeedClient;
use crate::filter::passes;
use crate::model::{Source, SourceType, SyncStatus};
use crate::storage::{ContentStore, StoreError};

/// Default number of sources synced at the same time.
pub const DEFAULT_MAX_CONCURRENT_SYNCS: usize = 4;

/// Errors that stop a sync before any item is processed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Source {0} not found")]
    SourceNotFound(i64),
    #[error("No adapter registered for source type `{0}`")]
    UnsupportedType(SourceType),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of one sync cycle.
///
/// `fetched` counts items the adapter returned; every one of them ends up in
/// exactly one of `saved`, `filtered`, `duplicates` or `failed`.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub source_id: i64,
    pub fetched: usize,
    pub saved: usize,
    pub filtered: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Why the fetch produced nothing, when it failed
    pub fetch_error: Option<FetchFailure>,
}

impl SyncReport {
    pub fn is_failure(&self) -> bool {
        self.fetch_error.is_some()
    }
}

/// Drives sync cycles against a [`ContentStore`].
pub struct Syncer<S> {
    registry: AdapterRegistry,
    store: S,
    client: FeedClient,
    max_concurrent: usize,
}

impl<S: ContentStore> Syncer<S> {
    pub fn new(registry: AdapterRegistry, store: S, client: FeedClient) -> Self {
        Self {
            registry,
            store,
            client,
            max_concurrent: DEFAULT_MAX_CONCURRENT_SYNCS,
        }
    }

    /// Caps how many sources `sync_all` / `sync_due` process at once.
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one cycle for `source`.
    ///
    /// Only an unresolvable adapter is an error. Fetch failures and per-item
    /// failures are counted in the report; the source's sync state records
    /// `failed` when the fetch itself failed.
    pub async fn sync(&self, source: &Source) -> Result<SyncReport, SyncError> {
        let adapter = self
            .registry
            .get(&source.source_type)
            .ok_or_else(|| SyncError::UnsupportedType(source.source_type.clone()))?;

        self.record_state(source.id, SyncStatus::InProgress, None)
            .await;

        let outcome = adapter.fetch(&self.client, &source.config).await;
        let mut report = SyncReport {
            source_id: source.id,
            fetched: outcome.items.len(),
            ..SyncReport::default()
        };

        let content_type = adapter.default_content_type();
        let mut clock = 0;

        for raw in outcome.items {
            // fetched_at never goes backwards within a batch
            clock = chrono::Utc::now().timestamp().max(clock);
            let content = adapter.transform_at(raw, source.id, content_type, clock);

            if let Some(rules) = &source.filter_rules {
                if !passes(&content, rules) {
                    report.filtered += 1;
                    continue;
                }
            }

            match self.store.create_content(&content).await {
                Ok(_) => report.saved += 1,
                Err(StoreError::Duplicate { .. }) => report.duplicates += 1,
                Err(e) => {
                    tracing::warn!(
                        source_id = source.id,
                        guid = %content.guid,
                        error = %e,
                        "Failed to store content"
                    );
                    report.failed += 1;
                }
            }
        }

        report.fetch_error = outcome.error;
        let status = if report.is_failure() {
            SyncStatus::Failed
        } else {
            SyncStatus::Success
        };
        self.record_state(source.id, status, Some(chrono::Utc::now().timestamp()))
            .await;

        tracing::info!(
            source_id = source.id,
            fetched = report.fetched,
            saved = report.saved,
            filtered = report.filtered,
            duplicates = report.duplicates,
            failed = report.failed,
            status = %status,
            "Sync finished"
        );
        Ok(report)
    }

    pub async fn sync_by_id(&self, id: i64) -> Result<SyncReport, SyncError> {
        let source = self
            .store
            .get_source(id)
            .await?
            .ok_or(SyncError::SourceNotFound(id))?;
        self.sync(&source).await
    }

    /// Syncs every active source of `owner_id` with bounded concurrency.
    ///
    /// Results are ordered by source id. One source failing (or timing out)
    /// never affects the others.
    pub async fn sync_all(
        &self,
        owner_id: i64,
    ) -> Result<Vec<(i64, Result<SyncReport, SyncError>)>, SyncError> {
        let sources = self.store.get_sources(owner_id).await?;
        Ok(self
            .sync_many(sources.into_iter().filter(|s| s.is_active).collect())
            .await)
    }

    /// Like [`Syncer::sync_all`], limited to sources whose interval elapsed by `now`.
    pub async fn sync_due(
        &self,
        owner_id: i64,
        now: i64,
    ) -> Result<Vec<(i64, Result<SyncReport, SyncError>)>, SyncError> {
        let sources = self.store.get_sources(owner_id).await?;
        let due: Vec<Source> = sources
            .into_iter()
            .filter(|s| s.is_active && s.is_due(now))
            .collect();
        tracing::debug!(owner_id, due = due.len(), "Selected due sources");
        Ok(self.sync_many(due).await)
    }

    async fn sync_many(&self, sources: Vec<Source>) -> Vec<(i64, Result<SyncReport, SyncError>)> {
        let mut results: Vec<_> = stream::iter(sources)
            .map(|source| async move {
                let result = self.sync(&source).await;
                if let Err(e) = &result {
                    tracing::warn!(source_id = source.id, error = %e, "Sync failed");
                }
                (source.id, result)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        results.sort_by_key(|(id, _)| *id);
        results
    }

    /// Sync state is bookkeeping: a failed write is logged, never fatal.
    async fn record_state(&self, id: i64, status: SyncStatus, at: Option<i64>) {
        if let Err(e) = self.store.set_sync_state(id, status, at).await {
            tracing::warn!(source_id = id, status = %status, error = %e, "Failed to record sync state");
        }
    }
}
