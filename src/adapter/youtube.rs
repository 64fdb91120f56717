use url::Url;

use crate::feed::markup::{Block, Blocks};
use crate::feed::{parse_date, FeedClient};
use crate::model::{ContentType, RawItem, SourceConfig, SourceType};
use crate::normalize::Normalizer;
use crate::util::validate_url;

use super::{ConfigError, FetchOutcome, SourceAdapter};

/// Public per-channel / per-playlist Atom endpoint.
pub const DEFAULT_YOUTUBE_FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml";

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const THUMBNAIL_BASE: &str = "https://i.ytimg.com/vi";

/// Which listing a YouTube source follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listing<'a> {
    Channel(&'a str),
    Playlist(&'a str),
}

impl<'a> Listing<'a> {
    fn from_config(config: &'a SourceConfig) -> Result<Self, ConfigError> {
        match (config.get("channel_id"), config.get("playlist_id")) {
            (Some(channel), None) => Ok(Listing::Channel(channel)),
            (None, Some(playlist)) => Ok(Listing::Playlist(playlist)),
            (Some(_), Some(_)) => Err(ConfigError::ConflictingIdentifiers),
            (None, None) => Err(ConfigError::MissingIdentifier),
        }
    }

    fn query(&self) -> (&'static str, &'a str) {
        match *self {
            Listing::Channel(id) => ("channel_id", id),
            Listing::Playlist(id) => ("playlist_id", id),
        }
    }
}

/// Adapter for YouTube channel and playlist feeds.
///
/// Configuration: exactly one of `channel_id` or `playlist_id`.
#[derive(Debug, Clone)]
pub struct YouTubeAdapter {
    feed_base: String,
    normalizer: Normalizer,
}

impl Default for YouTubeAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_YOUTUBE_FEED_BASE, Normalizer::default())
    }
}

impl YouTubeAdapter {
    pub fn new(feed_base: impl Into<String>, normalizer: Normalizer) -> Self {
        Self {
            feed_base: feed_base.into(),
            normalizer,
        }
    }

    /// Resolves the feed endpoint for a configuration.
    pub fn feed_url(&self, config: &SourceConfig) -> Result<Url, ConfigError> {
        let listing = Listing::from_config(config)?;
        let mut url = validate_url(&self.feed_base)?;
        let (key, id) = listing.query();
        url.query_pairs_mut().append_pair(key, id);
        Ok(url)
    }
}

impl SourceAdapter for YouTubeAdapter {
    fn source_type(&self) -> SourceType {
        SourceType::Youtube
    }

    fn default_content_type(&self) -> ContentType {
        ContentType::Video
    }

    fn check(&self, config: &SourceConfig) -> Result<(), ConfigError> {
        Listing::from_config(config).map(|_| ())
    }

    async fn fetch(&self, client: &FeedClient, config: &SourceConfig) -> FetchOutcome {
        let url = match self.feed_url(config) {
            Ok(url) => url,
            Err(e) => return FetchOutcome::failed(e),
        };

        match client.get_bytes(url.as_str()).await {
            Ok(bytes) => {
                let doc = String::from_utf8_lossy(&bytes);
                let items = parse_videos(&doc);
                tracing::debug!(url = %url, videos = items.len(), "Parsed video feed");
                FetchOutcome::items(items)
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Video feed fetch failed");
                FetchOutcome::failed(e)
            }
        }
    }

    fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}

/// Extracts videos from a YouTube Atom document.
///
/// Entries without a video id or title are dropped.
pub fn parse_videos(doc: &str) -> Vec<RawItem> {
    Blocks::new(doc, "entry")
        .filter_map(|block| video(&block))
        .collect()
}

fn video(block: &Block<'_>) -> Option<RawItem> {
    let video_id = block.text(&["yt:videoId"])?;
    let title = block.text(&["title", "media:title"])?;

    let watch_url = format!("{WATCH_URL}{video_id}");
    let thumbnail = block
        .attribute("media:thumbnail", "url")
        .unwrap_or_else(|| format!("{THUMBNAIL_BASE}/{video_id}/hqdefault.jpg"));
    let body = block
        .plain(&["media:description"])
        .unwrap_or_else(|| title.clone());

    Some(RawItem {
        body,
        url: Some(watch_url.clone()),
        author: block.plain(&["name"]),
        published_at: block.text(&["published"]).and_then(|d| parse_date(&d)),
        media_url: Some(watch_url),
        thumbnail_url: Some(thumbnail),
        duration: None,
        guid: Some(format!("yt:video:{video_id}")),
        title,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FetchFailure;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <title>Channel</title>
 <author><name>Channel Owner</name></author>
 <entry>
  <id>yt:video:abc123</id>
  <yt:videoId>abc123</yt:videoId>
  <title>First &amp; best</title>
  <author><name>Creator</name></author>
  <published>2024-03-01T12:00:00+00:00</published>
  <media:group>
   <media:title>First &amp; best</media:title>
   <media:thumbnail url="https://i1.ytimg.com/vi/abc123/hqdefault.jpg" width="480" height="360"/>
   <media:description>A long description</media:description>
  </media:group>
 </entry>
 <entry>
  <yt:videoId>def456</yt:videoId>
  <title>No extras</title>
 </entry>
 <entry>
  <title>Missing id</title>
 </entry>
 <entry>
  <yt:videoId>ghi789</yt:videoId>
 </entry>
</feed>"#;

    fn channel(id: &str) -> SourceConfig {
        SourceConfig::new().with("channel_id", id)
    }

    fn playlist(id: &str) -> SourceConfig {
        SourceConfig::new().with("playlist_id", id)
    }

    #[test]
    fn test_validate_identifier_modes() {
        let adapter = YouTubeAdapter::default();
        assert!(adapter.validate(&channel("UC123")));
        assert!(adapter.validate(&playlist("PL123")));
        assert!(!adapter.validate(&SourceConfig::new()));
        assert!(!adapter.validate(&channel("  ")));
        assert!(matches!(
            adapter.check(&channel("UC1").with("playlist_id", "PL1")),
            Err(ConfigError::ConflictingIdentifiers)
        ));
        // A blank counterpart is treated as absent.
        assert!(adapter.validate(&channel("UC1").with("playlist_id", "")));
    }

    #[test]
    fn test_feed_url() {
        let adapter = YouTubeAdapter::default();
        assert_eq!(
            adapter.feed_url(&channel("UC123")).unwrap().as_str(),
            "https://www.youtube.com/feeds/videos.xml?channel_id=UC123"
        );
        assert_eq!(
            adapter.feed_url(&playlist("PL9")).unwrap().as_str(),
            "https://www.youtube.com/feeds/videos.xml?playlist_id=PL9"
        );
    }

    #[test]
    fn test_parse_videos() {
        let videos = parse_videos(FEED);
        assert_eq!(videos.len(), 2);

        let first = &videos[0];
        assert_eq!(first.title, "First & best");
        assert_eq!(first.body, "A long description");
        assert_eq!(first.author.as_deref(), Some("Creator"));
        assert_eq!(
            first.url.as_deref(),
            Some("https://www.youtube.com/watch?v=abc123")
        );
        assert_eq!(first.media_url, first.url);
        assert_eq!(
            first.thumbnail_url.as_deref(),
            Some("https://i1.ytimg.com/vi/abc123/hqdefault.jpg")
        );
        assert_eq!(first.published_at, Some(1709294400));
        assert_eq!(first.guid.as_deref(), Some("yt:video:abc123"));
    }

    #[test]
    fn test_thumbnail_and_body_fallbacks() {
        let videos = parse_videos(FEED);
        let second = &videos[1];
        assert_eq!(
            second.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/def456/hqdefault.jpg")
        );
        assert_eq!(second.body, "No extras");
        assert_eq!(second.author, None);
        assert_eq!(second.published_at, None);
    }

    #[tokio::test]
    async fn test_fetch_channel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feeds/videos.xml"))
            .and(query_param("channel_id", "UC123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let adapter = YouTubeAdapter::new(
            format!("{}/feeds/videos.xml", server.uri()),
            Normalizer::default(),
        );
        let client = FeedClient::new(reqwest::Client::new());
        let outcome = adapter.fetch(&client, &channel("UC123")).await;

        assert!(!outcome.is_failure());
        assert_eq!(outcome.items.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_without_identifier_fails_softly() {
        let client = FeedClient::new(reqwest::Client::new());
        let outcome = YouTubeAdapter::default()
            .fetch(&client, &SourceConfig::new())
            .await;
        assert!(outcome.items.is_empty());
        assert!(matches!(
            outcome.error,
            Some(FetchFailure::Config(ConfigError::MissingIdentifier))
        ));
    }

    #[test]
    fn test_transform_defaults_to_video() {
        let adapter = YouTubeAdapter::default();
        let raw = parse_videos(FEED).remove(0);
        let content = adapter.transform(raw, 2, adapter.default_content_type());
        assert_eq!(content.content_type, ContentType::Video);
        assert_eq!(content.summary, "A long description");
    }
}
