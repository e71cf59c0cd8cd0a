//! Feed, post and ingestion types for Gator.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A subscribed RSS feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Feed {
    /// Feed ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Feed URL (globally unique).
    pub url: String,
    /// Owning user.
    pub user_id: Uuid,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
    /// Last successful fetch, `None` if never fetched.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

impl Feed {
    /// Whether the feed has never been fetched.
    pub fn is_unfetched(&self) -> bool {
        self.last_fetched_at.is_none()
    }
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owning user.
    pub user_id: Uuid,
}

impl NewFeed {
    /// Create a new feed request.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// A user following a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: Uuid,
    /// Following user.
    pub user_id: Uuid,
    /// Followed feed.
    pub feed_id: Uuid,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
    /// When the follow was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A stored post.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Post ID.
    pub id: Uuid,
    /// Feed the post came from.
    pub feed_id: Uuid,
    /// Post title.
    pub title: String,
    /// Post link (unique per feed).
    pub url: String,
    /// Post description.
    pub description: Option<String>,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A normalized item ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    /// Feed the post came from.
    pub feed_id: Uuid,
    /// Post title.
    pub title: String,
    /// Post link.
    pub url: String,
    /// Post description.
    pub description: Option<String>,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Ingestion time.
    pub created_at: DateTime<Utc>,
}

/// Result of inserting a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// A post with the same feed and URL already existed.
    Duplicate,
}

/// Decoded feed document before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeedDocument {
    /// Channel metadata.
    pub channel: RawChannel,
    /// Items in document order.
    pub items: Vec<RawItem>,
}

/// Channel metadata from a feed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChannel {
    pub title: String,
    pub link: String,
    pub description: String,
}

/// One `<item>` as it appeared in the document.
///
/// Text is XML-decoded but not yet HTML-unescaped, and the publish date is
/// kept as the raw string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

/// Summary of one ingestion step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Feed that was ingested.
    pub feed_id: Uuid,
    /// Items found in the document.
    pub items_seen: usize,
    /// New posts written.
    pub inserted: usize,
    /// Items already stored for this feed.
    pub duplicates: usize,
    /// Items that failed normalization (bad date, missing link).
    pub skipped: usize,
    /// Items whose insert failed in the store.
    pub failed: usize,
}

impl IngestReport {
    /// Create an empty report for a feed.
    pub fn new(feed_id: Uuid) -> Self {
        Self {
            feed_id,
            ..Default::default()
        }
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "feed {}: {} items, {} new, {} duplicate, {} skipped, {} failed",
            self.feed_id, self.items_seen, self.inserted, self.duplicates, self.skipped, self.failed
        )
    }
}
