//! Source adapters: one per supported source type.
//!
//! Each adapter knows how to check a source's configuration, retrieve its
//! feed, and turn what it finds into [`RawItem`]s. Adapters are a closed set
//! dispatched through [`Adapter`]; the [`AdapterRegistry`] maps type tags to
//! them at runtime.

mod registry;
mod rss;
mod youtube;

use std::future::Future;

use thiserror::Error;

use crate::feed::{FeedClient, FetchError};
use crate::model::{ContentType, NewContent, RawItem, SourceConfig, SourceType};
use crate::normalize::Normalizer;
use crate::util::UrlValidationError;

pub use registry::AdapterRegistry;
pub use rss::RssAdapter;
pub use youtube::{YouTubeAdapter, DEFAULT_YOUTUBE_FEED_BASE};

/// Configuration shape problems, detected without I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required `url`")]
    MissingUrl,
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    #[error("One of `channel_id` or `playlist_id` is required")]
    MissingIdentifier,
    #[error("`channel_id` and `playlist_id` are mutually exclusive")]
    ConflictingIdentifiers,
}

/// Why a fetch produced no items.
#[derive(Debug, Error)]
pub enum FetchFailure {
    #[error("invalid source configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Result of one adapter fetch.
///
/// A failed fetch has no items; `error` records the reason so that "failed"
/// and "nothing new" stay distinguishable downstream.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub items: Vec<RawItem>,
    pub error: Option<FetchFailure>,
}

impl FetchOutcome {
    pub fn items(items: Vec<RawItem>) -> Self {
        Self { items, error: None }
    }

    pub fn failed(error: impl Into<FetchFailure>) -> Self {
        Self {
            items: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Capabilities every source adapter provides.
pub trait SourceAdapter {
    /// Type tag this adapter serves.
    fn source_type(&self) -> SourceType;

    /// Content type assigned to items from this source.
    fn default_content_type(&self) -> ContentType;

    /// Checks configuration shape. Pure; never performs I/O.
    fn check(&self, config: &SourceConfig) -> Result<(), ConfigError>;

    fn validate(&self, config: &SourceConfig) -> bool {
        self.check(config).is_ok()
    }

    /// One bounded-time retrieval followed by parsing.
    ///
    /// Never fails: network errors, timeouts and bad configuration all yield
    /// an empty [`FetchOutcome`] carrying the reason.
    fn fetch(
        &self,
        client: &FeedClient,
        config: &SourceConfig,
    ) -> impl Future<Output = FetchOutcome> + Send;

    fn normalizer(&self) -> &Normalizer;

    /// Builds a content-ready record stamped with the current time.
    fn transform(&self, raw: RawItem, source_id: i64, content_type: ContentType) -> NewContent {
        self.normalizer().normalize(raw, source_id, content_type)
    }

    /// Like [`SourceAdapter::transform`] with an explicit fetch time.
    fn transform_at(
        &self,
        raw: RawItem,
        source_id: i64,
        content_type: ContentType,
        fetched_at: i64,
    ) -> NewContent {
        self.normalizer()
            .normalize_at(raw, source_id, content_type, fetched_at)
    }
}

/// The closed set of adapters.
///
/// Adding a source type means adding a variant here plus one registration in
/// [`AdapterRegistry::with_defaults`].
#[derive(Debug, Clone)]
pub enum Adapter {
    Rss(RssAdapter),
    Youtube(YouTubeAdapter),
}

impl From<RssAdapter> for Adapter {
    fn from(adapter: RssAdapter) -> Self {
        Adapter::Rss(adapter)
    }
}

impl From<YouTubeAdapter> for Adapter {
    fn from(adapter: YouTubeAdapter) -> Self {
        Adapter::Youtube(adapter)
    }
}

impl SourceAdapter for Adapter {
    fn source_type(&self) -> SourceType {
        match self {
            Adapter::Rss(a) => a.source_type(),
            Adapter::Youtube(a) => a.source_type(),
        }
    }

    fn default_content_type(&self) -> ContentType {
        match self {
            Adapter::Rss(a) => a.default_content_type(),
            Adapter::Youtube(a) => a.default_content_type(),
        }
    }

    fn check(&self, config: &SourceConfig) -> Result<(), ConfigError> {
        match self {
            Adapter::Rss(a) => a.check(config),
            Adapter::Youtube(a) => a.check(config),
        }
    }

    async fn fetch(&self, client: &FeedClient, config: &SourceConfig) -> FetchOutcome {
        match self {
            Adapter::Rss(a) => a.fetch(client, config).await,
            Adapter::Youtube(a) => a.fetch(client, config).await,
        }
    }

    fn normalizer(&self) -> &Normalizer {
        match self {
            Adapter::Rss(a) => a.normalizer(),
            Adapter::Youtube(a) => a.normalizer(),
        }
    }
}
