//! Feed ingestion pipeline.
//!
//! Sources (RSS/Atom feeds, YouTube channels and playlists) are fetched by
//! [`adapter`]s, normalized into one content schema by [`normalize`], gated
//! by per-source [`filter`] rules and persisted through [`storage`]. The
//! [`sync`] module ties these together.
//!
//! ```no_run
//! use readmaster::adapter::AdapterRegistry;
//! use readmaster::feed::FeedClient;
//! use readmaster::storage::Database;
//! use readmaster::sync::Syncer;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let db = Database::open("readmaster.db").await?;
//! let syncer = Syncer::new(
//!     AdapterRegistry::with_defaults(),
//!     db,
//!     FeedClient::new(reqwest::Client::new()),
//! );
//! for (source_id, result) in syncer.sync_all(readmaster::model::DEFAULT_OWNER).await? {
//!     println!("{source_id}: {:?}", result.map(|r| (r.fetched, r.saved)));
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod analysis;
pub mod config;
pub mod feed;
pub mod filter;
pub mod model;
pub mod normalize;
pub mod storage;
pub mod sync;
pub mod util;
