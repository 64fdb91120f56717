use std::collections::HashMap;

use crate::model::SourceType;
use crate::normalize::Normalizer;

use super::{Adapter, RssAdapter, SourceAdapter, YouTubeAdapter, DEFAULT_YOUTUBE_FEED_BASE};

/// Lookup table from source type tag to adapter.
///
/// Built once at startup and passed by reference to whoever needs it.
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<SourceType, Adapter>,
    /// Registration order, so listings are stable
    order: Vec<SourceType>,
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in adapter, using default endpoints.
    pub fn with_defaults() -> Self {
        Self::with_options(Normalizer::default(), DEFAULT_YOUTUBE_FEED_BASE)
    }

    /// Registry with every built-in adapter sharing one normalizer.
    pub fn with_options(normalizer: Normalizer, youtube_feed_base: &str) -> Self {
        let mut registry = Self::new();
        registry.register(RssAdapter::new(normalizer));
        registry.register(YouTubeAdapter::new(youtube_feed_base, normalizer));
        registry
    }

    /// Registers an adapter under its own type tag, replacing any previous one.
    pub fn register(&mut self, adapter: impl Into<Adapter>) {
        let adapter = adapter.into();
        let source_type = adapter.source_type();
        if self.adapters.insert(source_type.clone(), adapter).is_none() {
            self.order.push(source_type);
        }
    }

    pub fn get(&self, source_type: &SourceType) -> Option<&Adapter> {
        self.adapters.get(source_type)
    }

    /// All registered adapters in registration order.
    pub fn list(&self) -> Vec<&Adapter> {
        self.order
            .iter()
            .filter_map(|t| self.adapters.get(t))
            .collect()
    }

    pub fn supported_types(&self) -> Vec<SourceType> {
        self.order.clone()
    }
}
