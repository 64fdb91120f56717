use chrono::{DateTime, NaiveDateTime};

use super::markup::{Block, Blocks};

/// Loosely-structured item extracted from an RSS or Atom document.
///
/// Only `title` is guaranteed; every other field is best effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published: Option<i64>,
    pub author: Option<String>,
    pub guid: Option<String>,
}

/// Lazy sequence of items in document order.
///
/// Clone it (or call [`parse_items`] again) to iterate from the start; parsing
/// holds no state beyond the read position.
#[derive(Clone)]
pub struct ParsedItems<'a> {
    blocks: Blocks<'a>,
}

impl Iterator for ParsedItems<'_> {
    type Item = ParsedItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.blocks.by_ref().find_map(|block| parse_block(&block))
    }
}

/// Parses RSS `<item>` blocks, or Atom `<entry>` blocks when the document has
/// no `<item>`. Never fails: malformed markup yields fewer (or zero) items.
pub fn parse_items(doc: &str) -> ParsedItems<'_> {
    let items = Blocks::new(doc, "item");

    let blocks = if items.clone().next().is_some() {
        items
    } else {
        Blocks::new(doc, "entry")
    };

    ParsedItems { blocks }
}

/// Lossy byte entry point: invalid UTF-8 sequences are replaced.
pub fn parse_bytes(bytes: &[u8]) -> Vec<ParsedItem> {
    let doc = String::from_utf8_lossy(bytes);
    parse_items(&doc).collect()
}

fn parse_block(block: &Block<'_>) -> Option<ParsedItem> {
    let title = block.text(&["title"])?;

    let link = block
        .text(&["link"])
        .or_else(|| block.attribute("link", "href"));

    Some(ParsedItem {
        title,
        link,
        description: block.plain(&["description", "summary", "content:encoded", "content"]),
        published: block
            .text(&["pubDate", "published", "updated", "dc:date"])
            .and_then(|d| parse_date(&d)),
        author: block.plain(&["author", "dc:creator"]),
        guid: block.text(&["guid", "id"]),
    })
}

/// Parses RFC 2822 (RSS) or RFC 3339 (Atom) dates into unix seconds.
pub fn parse_date(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    // Some feeds omit the offset entirely; read those as UTC.
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:dc="http://purl.org/dc/elements/1.1/">
<channel>
  <title>Channel title is not an item</title>
  <item>
    <title><![CDATA[First & foremost]]></title>
    <link>https://example.com/1</link>
    <description>&lt;p&gt;Hello &lt;b&gt;world&lt;/b&gt;&lt;/p&gt;</description>
    <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    <dc:creator>Alice</dc:creator>
    <guid isPermaLink="false">item-1</guid>
  </item>
  <item>
    <title>Second</title>
    <link>https://example.com/2</link>
  </item>
  <item>
    <link>https://example.com/untitled</link>
    <description>No title here</description>
  </item>
</channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom feed</title>
  <entry>
    <title type="html">Atom &amp; Eve</title>
    <link rel="alternate" href="https://example.org/a"/>
    <id>urn:uuid:1</id>
    <updated>2024-02-03T04:05:06Z</updated>
    <summary>Short summary</summary>
    <author><name>Bob</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let items: Vec<_> = parse_items(RSS).collect();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "First & foremost");
        assert_eq!(first.link.as_deref(), Some("https://example.com/1"));
        assert_eq!(first.description.as_deref(), Some("Hello world"));
        assert_eq!(first.published, Some(1704067200));
        assert_eq!(first.author.as_deref(), Some("Alice"));
        assert_eq!(first.guid.as_deref(), Some("item-1"));

        let second = &items[1];
        assert_eq!(second.title, "Second");
        assert_eq!(second.description, None);
        assert_eq!(second.published, None);
    }

    #[test]
    fn test_parse_atom_entries() {
        let items: Vec<_> = parse_items(ATOM).collect();
        assert_eq!(items.len(), 1);
        let entry = &items[0];
        assert_eq!(entry.title, "Atom & Eve");
        assert_eq!(entry.link.as_deref(), Some("https://example.org/a"));
        assert_eq!(entry.description.as_deref(), Some("Short summary"));
        assert_eq!(entry.author.as_deref(), Some("Bob"));
        assert_eq!(entry.guid.as_deref(), Some("urn:uuid:1"));
        assert_eq!(entry.published, Some(1706933106));
    }

    #[test]
    fn test_atom_content_quoting_item_markup() {
        let doc = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Writing feeds</title>
    <content type="html"><![CDATA[<p>Every RSS document wraps posts in an <item> element.</p>]]></content>
  </entry>
  <entry><title>Second post</title></entry>
  <entry>
    <summary><![CDATA[<title>not this</title>]]></summary>
    <title>Third post</title>
  </entry>
</feed>"#;
        let titles: Vec<_> = parse_items(doc).map(|i| i.title).collect();
        assert_eq!(titles, vec!["Writing feeds", "Second post", "Third post"]);
    }

    #[test]
    fn test_zero_items_is_not_an_error() {
        assert_eq!(parse_items("<rss><channel></channel></rss>").count(), 0);
        assert_eq!(parse_items("").count(), 0);
        assert_eq!(parse_items("<not valid xml").count(), 0);
    }

    #[test]
    fn test_blank_title_is_discarded() {
        let doc = "<item><title>  <![CDATA[ ]]> </title></item><item><title>ok</title></item>";
        let titles: Vec<_> = parse_items(doc).map(|i| i.title).collect();
        assert_eq!(titles, vec!["ok"]);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let items = parse_items(RSS);
        let first_pass: Vec<_> = items.clone().collect();
        let second_pass: Vec<_> = items.collect();
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_unparseable_date_is_absent() {
        let doc = "<item><title>t</title><pubDate>yesterday-ish</pubDate></item>";
        let items: Vec<_> = parse_items(doc).collect();
        assert_eq!(items[0].published, None);
    }

    #[test]
    fn test_parse_bytes_is_lossy() {
        let mut bytes = b"<item><title>caf".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"</title></item>");
        let items = parse_bytes(&bytes);
        assert_eq!(items.len(), 1);
        assert!(items[0].title.starts_with("caf"));
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("Mon, 01 Jan 2024 00:00:00 +0000"), Some(1704067200));
        assert_eq!(parse_date("2024-01-01T00:00:00Z"), Some(1704067200));
        assert_eq!(parse_date("2024-01-01T00:00:00"), Some(1704067200));
        assert_eq!(parse_date(""), None);
    }

    fn feed_with_titles(titles: &[String]) -> String {
        let mut doc = String::from("<rss><channel>");
        for t in titles {
            doc.push_str(&format!("<item><title>{t}</title><link>https://e.com</link></item>"));
        }
        doc.push_str("</channel></rss>");
        doc
    }

    proptest! {
        #[test]
        fn prop_item_count_matches_titled_blocks(titles in prop::collection::vec("[a-zA-Z0-9 ]{0,20}", 0..20)) {
            let doc = feed_with_titles(&titles);
            let expected = titles.iter().filter(|t| !t.trim().is_empty()).count();
            prop_assert_eq!(parse_items(&doc).count(), expected);
        }

        #[test]
        fn prop_parsing_is_idempotent(doc in ".{0,400}") {
            let a: Vec<_> = parse_items(&doc).collect();
            let b: Vec<_> = parse_items(&doc).collect();
            prop_assert_eq!(a, b);
        }
    }
}
