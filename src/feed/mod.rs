//! Feed retrieval and tolerant parsing.
//!
//! - [`markup`] - case-insensitive tag/attribute extraction and text cleanup
//! - [`parser`] - RSS `<item>` / Atom `<entry>` extraction into [`ParsedItem`]
//! - [`fetcher`] - bounded-time HTTP retrieval with a body size cap
//!
//! Real-world feeds are routinely malformed, so nothing here is a validating
//! XML parser: broken markup produces fewer items, never an error.

pub mod markup;
mod fetcher;
mod parser;

pub use fetcher::{FeedClient, FetchError, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_FEED_SIZE};
pub use parser::{parse_bytes, parse_date, parse_items, ParsedItem, ParsedItems};
