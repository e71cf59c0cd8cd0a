//! Storage seams used by the ingestion step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{Feed, InsertOutcome, NewPost};
use crate::Result;

/// Durable feed table.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// The feed fetched least recently, never-fetched feeds first.
    ///
    /// Ties are broken by `created_at`, then `id`, both ascending.
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>>;

    /// Record a successful fetch of `feed_id` at `at`.
    async fn mark_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// Durable post table.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Insert a post unless one with the same feed and URL exists.
    async fn insert_post(&self, post: &NewPost) -> Result<InsertOutcome>;
}
