//! End-to-end sync tests: a mock feed server, the real adapters and an
//! in-memory SQLite store.
//!
//! Each test creates its own database for isolation.

use std::time::Duration;

use pretty_assertions::assert_eq;
use readmaster::adapter::AdapterRegistry;
use readmaster::feed::FeedClient;
use readmaster::model::{
    ContentType, FilterRules, NewSource, Source, SourceConfig, SourceType, SyncStatus,
    DEFAULT_OWNER, DEFAULT_SYNC_INTERVAL_SECS,
};
use readmaster::normalize::Normalizer;
use readmaster::storage::{ContentStore, Database};
use readmaster::sync::{SyncError, Syncer};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const THREE_ITEMS_ONE_UNTITLED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Example</title>
  <item>
    <title>Rust release notes</title>
    <link>https://example.com/rust</link>
    <description><![CDATA[<p>Lots of <b>new</b> things</p>]]></description>
    <pubDate>Tue, 02 Jan 2024 10:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Cheap spam offer</title>
    <link>https://example.com/spam</link>
    <description>Click here</description>
  </item>
  <item>
    <link>https://example.com/untitled</link>
    <description>This entry has no title</description>
  </item>
</channel></rss>"#;

async fn test_db() -> Database {
    Database::open(":memory:").await.unwrap()
}

fn syncer(db: Database) -> Syncer<Database> {
    Syncer::new(
        AdapterRegistry::with_defaults(),
        db,
        FeedClient::new(reqwest::Client::new()).timeout(Duration::from_millis(500)),
    )
}

async fn serve(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

async fn add_rss(db: &Database, url: &str, rules: Option<FilterRules>) -> Source {
    db.create_source(&NewSource {
        owner_id: DEFAULT_OWNER,
        name: "Example".into(),
        source_type: SourceType::Rss,
        config: SourceConfig::new().with("url", url),
        filter_rules: rules,
        sync_interval: DEFAULT_SYNC_INTERVAL_SECS,
    })
    .await
    .unwrap()
}

// ============================================================================
// RSS
// ============================================================================

#[tokio::test]
async fn test_untitled_item_is_dropped_before_counting() {
    let server = serve(THREE_ITEMS_ONE_UNTITLED).await;
    let db = test_db().await;
    let source = add_rss(&db, &format!("{}/feed.xml", server.uri()), None).await;
    let syncer = syncer(db);

    let report = syncer.sync(&source).await.unwrap();
    assert_eq!((report.fetched, report.saved), (2, 2));

    let stored = syncer.store().get_contents(Some(source.id), 10).await.unwrap();
    assert_eq!(stored.len(), 2);
    let rust = stored
        .iter()
        .find(|c| c.title == "Rust release notes")
        .unwrap();
    assert_eq!(rust.processed_content, "Lots of new things");
    assert_eq!(rust.summary, "Lots of new things");
    assert_eq!(rust.content_type, ContentType::Text);
    assert_eq!(rust.published_at, Some(1704189600));
    assert!(!rust.is_read);
}

#[tokio::test]
async fn test_exclude_rule_filters_spam() {
    let server = serve(THREE_ITEMS_ONE_UNTITLED).await;
    let db = test_db().await;
    let rules = FilterRules {
        exclude: vec!["spam".into()],
        ..FilterRules::default()
    };
    let source = add_rss(&db, &format!("{}/feed.xml", server.uri()), Some(rules)).await;
    let syncer = syncer(db);

    let report = syncer.sync(&source).await.unwrap();
    assert_eq!((report.fetched, report.saved, report.filtered), (2, 1, 1));
}

#[tokio::test]
async fn test_resync_saves_nothing_new() {
    let server = serve(THREE_ITEMS_ONE_UNTITLED).await;
    let db = test_db().await;
    let source = add_rss(&db, &format!("{}/feed.xml", server.uri()), None).await;
    let syncer = syncer(db);

    syncer.sync(&source).await.unwrap();
    let second = syncer.sync(&source).await.unwrap();
    assert_eq!((second.fetched, second.saved, second.duplicates), (2, 0, 2));
    assert_eq!(
        syncer.store().get_contents(Some(source.id), 10).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_sync_state_is_recorded() {
    let server = serve(THREE_ITEMS_ONE_UNTITLED).await;
    let db = test_db().await;
    let source = add_rss(&db, &format!("{}/feed.xml", server.uri()), None).await;
    let syncer = syncer(db);

    syncer.sync_by_id(source.id).await.unwrap();
    let after = syncer.store().get_source(source.id).await.unwrap().unwrap();
    assert_eq!(after.last_sync_status, Some(SyncStatus::Success));
    assert!(after.last_sync_at.is_some());
}

#[tokio::test]
async fn test_timeout_returns_zero_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(THREE_ITEMS_ONE_UNTITLED)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let db = test_db().await;
    let source = add_rss(&db, &server.uri(), None).await;
    let syncer = syncer(db);

    let report = syncer.sync(&source).await.unwrap();
    assert_eq!((report.fetched, report.saved), (0, 0));
    assert!(report.is_failure());

    let after = syncer.store().get_source(source.id).await.unwrap().unwrap();
    assert_eq!(after.last_sync_status, Some(SyncStatus::Failed));
}

#[tokio::test]
async fn test_empty_feed_is_success() {
    let server = serve("<rss><channel><title>quiet</title></channel></rss>").await;
    let db = test_db().await;
    let source = add_rss(&db, &format!("{}/feed.xml", server.uri()), None).await;
    let syncer = syncer(db);

    let report = syncer.sync(&source).await.unwrap();
    assert_eq!((report.fetched, report.saved), (0, 0));
    assert!(!report.is_failure());
}

#[tokio::test]
async fn test_sync_all_with_one_slow_source() {
    let fast = serve(THREE_ITEMS_ONE_UNTITLED).await;
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(THREE_ITEMS_ONE_UNTITLED)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&slow)
        .await;

    let db = test_db().await;
    let a = add_rss(&db, &format!("{}/feed.xml", fast.uri()), None).await;
    let b = add_rss(&db, &slow.uri(), None).await;
    let syncer = syncer(db);

    let results = syncer.sync_all(DEFAULT_OWNER).await.unwrap();
    assert_eq!(results.len(), 2);
    let (id_a, report_a) = &results[0];
    let (id_b, report_b) = &results[1];
    assert_eq!((*id_a, *id_b), (a.id, b.id));
    assert_eq!(report_a.as_ref().unwrap().saved, 2);
    assert!(report_b.as_ref().unwrap().is_failure());
}

#[tokio::test]
async fn test_unsupported_type_is_reported() {
    let db = test_db().await;
    let source = db
        .create_source(&NewSource {
            owner_id: DEFAULT_OWNER,
            name: "Tweets".into(),
            source_type: SourceType::Twitter,
            config: SourceConfig::new(),
            filter_rules: None,
            sync_interval: DEFAULT_SYNC_INTERVAL_SECS,
        })
        .await
        .unwrap();
    let syncer = syncer(db);

    assert!(matches!(
        syncer.sync_by_id(source.id).await,
        Err(SyncError::UnsupportedType(SourceType::Twitter))
    ));
    assert!(matches!(
        syncer.sync_by_id(source.id + 100).await,
        Err(SyncError::SourceNotFound(_))
    ));
}

#[tokio::test]
async fn test_deleting_source_removes_synced_content() {
    let server = serve(THREE_ITEMS_ONE_UNTITLED).await;
    let db = test_db().await;
    let source = add_rss(&db, &format!("{}/feed.xml", server.uri()), None).await;
    let syncer = syncer(db);
    syncer.sync(&source).await.unwrap();

    assert!(syncer.store().delete_source(source.id).await.unwrap());
    assert!(syncer.store().get_contents(None, 10).await.unwrap().is_empty());
}

// ============================================================================
// YouTube
// ============================================================================

const CHANNEL_FEED: &str = r#"<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/">
 <entry>
  <yt:videoId>vid1</yt:videoId>
  <title>Building a parser</title>
  <author><name>Coder</name></author>
  <published>2024-05-01T08:00:00+00:00</published>
  <media:group><media:description>Step by step</media:description></media:group>
 </entry>
</feed>"#;

#[tokio::test]
async fn test_youtube_channel_sync() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feeds/videos.xml"))
        .and(query_param("channel_id", "UCabc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CHANNEL_FEED))
        .mount(&server)
        .await;

    let registry = AdapterRegistry::with_options(
        Normalizer::default(),
        &format!("{}/feeds/videos.xml", server.uri()),
    );
    let db = test_db().await;
    let source = db
        .create_source(&NewSource {
            owner_id: DEFAULT_OWNER,
            name: "Coder".into(),
            source_type: SourceType::Youtube,
            config: SourceConfig::new().with("channel_id", "UCabc"),
            filter_rules: None,
            sync_interval: DEFAULT_SYNC_INTERVAL_SECS,
        })
        .await
        .unwrap();
    let syncer = Syncer::new(registry, db, FeedClient::new(reqwest::Client::new()));

    let report = syncer.sync(&source).await.unwrap();
    assert_eq!((report.fetched, report.saved), (1, 1));

    let stored = syncer.store().get_contents(Some(source.id), 10).await.unwrap();
    let video = &stored[0];
    assert_eq!(video.content_type, ContentType::Video);
    assert_eq!(video.url.as_deref(), Some("https://www.youtube.com/watch?v=vid1"));
    assert_eq!(
        video.thumbnail_url.as_deref(),
        Some("https://i.ytimg.com/vi/vid1/hqdefault.jpg")
    );
    assert_eq!(video.author.as_deref(), Some("Coder"));
    assert_eq!(video.summary, "Step by step");
}
