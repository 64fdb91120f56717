use crate::feed::{parse_bytes, FeedClient, ParsedItem};
use crate::model::{ContentType, RawItem, SourceConfig, SourceType};
use crate::normalize::Normalizer;
use crate::util::validate_url;

use super::{ConfigError, FetchOutcome, SourceAdapter};

/// Adapter for RSS and Atom feeds. Configuration: `url`.
#[derive(Debug, Clone, Default)]
pub struct RssAdapter {
    normalizer: Normalizer,
}

impl RssAdapter {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    fn feed_url(config: &SourceConfig) -> Result<url::Url, ConfigError> {
        let raw = config.get("url").ok_or(ConfigError::MissingUrl)?;
        Ok(validate_url(raw)?)
    }
}

impl SourceAdapter for RssAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Rss
    }

    fn default_content_type(&self) -> ContentType {
        ContentType::Text
    }

    fn check(&self, config: &SourceConfig) -> Result<(), ConfigError> {
        Self::feed_url(config).map(|_| ())
    }

    async fn fetch(&self, client: &FeedClient, config: &SourceConfig) -> FetchOutcome {
        let url = match Self::feed_url(config) {
            Ok(url) => url,
            Err(e) => return FetchOutcome::failed(e),
        };

        match client.get_bytes(url.as_str()).await {
            Ok(bytes) => {
                let items: Vec<RawItem> = parse_bytes(&bytes).into_iter().map(raw_item).collect();
                tracing::debug!(url = %url, items = items.len(), "Parsed feed");
                FetchOutcome::items(items)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Feed fetch failed");
                FetchOutcome::failed(e)
            }
        }
    }

    fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

fn raw_item(item: ParsedItem) -> RawItem {
    RawItem {
        title: item.title,
        body: item.description.unwrap_or_default(),
        url: item.link,
        author: item.author,
        published_at: item.published,
        guid: item.guid,
        ..RawItem::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FetchFailure;
    use crate::feed::FetchError;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<rss><channel>
        <item><title>One</title><link>https://e.com/1</link><description>Body one</description></item>
        <item><title>Two</title><link>https://e.com/2</link></item>
    </channel></rss>"#;

    fn config(url: &str) -> SourceConfig {
        SourceConfig::new().with("url", url)
    }

    #[test]
    fn test_validate() {
        let adapter = RssAdapter::default();
        assert!(adapter.validate(&config("https://example.com/feed")));
        assert!(!adapter.validate(&SourceConfig::new()));
        assert!(!adapter.validate(&config("   ")));
        assert!(!adapter.validate(&config("example.com/feed")));
        assert!(!adapter.validate(&config("ftp://example.com/feed")));
    }

    #[test]
    fn test_check_reports_reason() {
        let adapter = RssAdapter::default();
        assert!(matches!(
            adapter.check(&SourceConfig::new()),
            Err(ConfigError::MissingUrl)
        ));
        assert!(matches!(
            adapter.check(&config("mailto:a@b.c")),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_parses_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let client = FeedClient::new(reqwest::Client::new());
        let outcome = RssAdapter::default()
            .fetch(&client, &config(&format!("{}/feed.xml", server.uri())))
            .await;

        assert!(!outcome.is_failure());
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(outcome.items[0].title, "One");
        assert_eq!(outcome.items[0].body, "Body one");
        assert_eq!(outcome.items[0].url.as_deref(), Some("https://e.com/1"));
        assert_eq!(outcome.items[1].body, "");
    }

    #[tokio::test]
    async fn test_fetch_http_error_is_absorbed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = FeedClient::new(reqwest::Client::new());
        let outcome = RssAdapter::default()
            .fetch(&client, &config(&server.uri()))
            .await;

        assert!(outcome.items.is_empty());
        assert!(matches!(
            outcome.error,
            Some(FetchFailure::Fetch(FetchError::HttpStatus(500)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_timeout_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(FEED)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = FeedClient::new(reqwest::Client::new()).timeout(Duration::from_millis(200));
        let outcome = RssAdapter::default()
            .fetch(&client, &config(&server.uri()))
            .await;

        assert!(outcome.items.is_empty());
        assert!(matches!(
            outcome.error,
            Some(FetchFailure::Fetch(FetchError::Timeout(_)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_with_bad_config_does_no_io() {
        let client = FeedClient::new(reqwest::Client::new());
        let outcome = RssAdapter::default()
            .fetch(&client, &SourceConfig::new())
            .await;
        assert!(matches!(
            outcome.error,
            Some(FetchFailure::Config(ConfigError::MissingUrl))
        ));
    }

    #[test]
    fn test_transform_uses_default_content_type() {
        let adapter = RssAdapter::default();
        let raw = RawItem {
            title: "t".into(),
            body: "b".into(),
            ..RawItem::default()
        };
        let content = adapter.transform(raw, 4, adapter.default_content_type());
        assert_eq!(content.content_type, ContentType::Text);
        assert_eq!(content.source_id, 4);
    }
}
