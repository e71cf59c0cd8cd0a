//! RSS aggregation for Gator.
//!
//! Fetching, parsing, storage and the polling loop that ties them together.

pub mod fetcher;
pub mod ingest;
pub mod parser;
pub mod repository;
pub mod scheduler;
pub mod store;
pub mod types;

pub use fetcher::{validate_url, FeedFetcher, HttpFetcher};
pub use ingest::{ingest_feed, IngestContext};
pub use parser::{normalize_item, parse_feed, unescape_html};
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::{RunSummary, Scheduler, SchedulerState};
pub use store::{FeedStore, PostStore};
pub use types::{
    Feed, FeedFollow, IngestReport, InsertOutcome, NewFeed, NewPost, Post, RawChannel,
    RawFeedDocument, RawItem,
};
