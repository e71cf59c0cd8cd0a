//! One ingestion step: fetch a feed, record the fetch, store its new posts.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::fetcher::FeedFetcher;
use super::parser::{normalize_item, parse_feed};
use super::store::{FeedStore, PostStore};
use super::types::{Feed, IngestReport, InsertOutcome};
use crate::clock::Clock;
use crate::shutdown::Shutdown;
use crate::Result;

/// Everything an ingestion step depends on.
#[derive(Clone)]
pub struct IngestContext {
    pub feeds: Arc<dyn FeedStore>,
    pub posts: Arc<dyn PostStore>,
    pub fetcher: Arc<dyn FeedFetcher>,
    pub clock: Arc<dyn Clock>,
}

impl IngestContext {
    /// Bundle the step's dependencies.
    pub fn new(
        feeds: Arc<dyn FeedStore>,
        posts: Arc<dyn PostStore>,
        fetcher: Arc<dyn FeedFetcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            feeds,
            posts,
            fetcher,
            clock,
        }
    }
}

impl std::fmt::Debug for IngestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestContext").finish_non_exhaustive()
    }
}

/// Ingest one feed.
///
/// The feed is marked fetched as soon as the body arrives, so a document
/// that then fails to parse is not retried before other feeds. Item-level
/// failures (bad date, missing link, store error) are counted in the report
/// and never abort the step.
pub async fn ingest_feed(
    ctx: &IngestContext,
    feed: &Feed,
    shutdown: &Shutdown,
) -> Result<IngestReport> {
    let bytes = ctx.fetcher.fetch(&feed.url, shutdown).await?;

    let now = ctx.clock.now();
    ctx.feeds.mark_fetched(feed.id, now).await?;

    let doc = parse_feed(&bytes)?;

    let mut report = IngestReport::new(feed.id);
    report.items_seen = doc.items.len();

    for (index, item) in doc.items.iter().enumerate() {
        let post = match normalize_item(feed.id, item, now) {
            Ok(post) => post,
            Err(e) => {
                warn!(feed = %feed.url, index, link = %item.link, "skipping item: {}", e);
                report.skipped += 1;
                continue;
            }
        };

        match ctx.posts.insert_post(&post).await {
            Ok(InsertOutcome::Inserted) => {
                debug!(feed = %feed.url, url = %post.url, "stored post");
                report.inserted += 1;
            }
            Ok(InsertOutcome::Duplicate) => report.duplicates += 1,
            Err(e) => {
                error!(feed = %feed.url, url = %post.url, "failed to store post: {}", e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
