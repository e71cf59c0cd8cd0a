//! Test helpers for integration tests.
//!
//! Provides database seeding, RSS document builders, a controllable clock
//! and a ready-made ingestion context.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use gator::config::FetcherConfig;
use gator::db::{NewUser, UserRepository};
use gator::rss::NewFeed;
use gator::{
    Clock, Database, Feed, FeedRepository, HttpFetcher, IngestContext, PostRepository,
};

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A fixed point in time used as the test "now".
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 5, 12, 0, 0).unwrap()
}

/// Open a migrated in-memory database.
pub async fn setup_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

/// Create a user, or return the existing one with that name.
pub async fn ensure_user(db: &Database, name: &str) -> uuid::Uuid {
    let repo = UserRepository::new(db.pool());
    if let Some(user) = repo.get_by_name(name).await.unwrap() {
        return user.id;
    }
    repo.create(&NewUser::new(name)).await.unwrap().id
}

/// Register a feed owned by the default test user.
pub async fn seed_feed(db: &Database, name: &str, url: &str) -> Feed {
    let user_id = ensure_user(db, "tester").await;
    FeedRepository::new(db.pool())
        .create(&NewFeed::new(name, url, user_id))
        .await
        .unwrap()
}

/// One `<item>` for [`rss_document`].
pub struct TestItem<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub pub_date: &'a str,
}

/// Build an RSS 2.0 document. Text is inserted verbatim, so callers control escaping.
pub fn rss_document(title: &str, items: &[TestItem<'_>]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <rss version=\"2.0\"><channel><title>{title}</title>\
         <link>https://example.com/</link><description>test feed</description>"
    );
    for item in items {
        xml.push_str(&format!(
            "<item><title>{}</title><link>{}</link><description>about {}</description>\
             <pubDate>{}</pubDate></item>",
            item.title, item.link, item.title, item.pub_date
        ));
    }
    xml.push_str("</channel></rss>");
    xml
}

/// Ingestion context using the real HTTP fetcher and the given clock.
pub fn http_context(db: &Database, clock: Arc<dyn Clock>) -> IngestContext {
    let fetcher = HttpFetcher::new(&FetcherConfig {
        total_timeout_secs: 5,
        connect_timeout_secs: 2,
        ..FetcherConfig::default()
    })
    .unwrap();

    IngestContext::new(
        Arc::new(FeedRepository::new(db.pool())),
        Arc::new(PostRepository::new(db.pool())),
        Arc::new(fetcher),
        clock,
    )
}
