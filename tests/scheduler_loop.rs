//! Scheduler loop tests for Gator.
//!
//! Verifies feed rotation across ticks and clean shutdown of the polling loop.

mod common;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{http_context, rss_document, seed_feed, setup_db, test_now, ManualClock, TestItem};
use gator::{FeedRepository, PostRepository, Scheduler, SchedulerState, ShutdownTrigger};

async fn empty_feed_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_document("Empty", &[])))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn never_fetched_feed_is_selected_before_stale_one() {
    let server = empty_feed_server().await;
    let db = setup_db().await;
    let a = seed_feed(&db, "A", &format!("{}/a", server.uri())).await;
    let b = seed_feed(&db, "B", &format!("{}/b", server.uri())).await;

    let feeds = FeedRepository::new(db.pool());
    let b_fetched = test_now() - Duration::minutes(10);
    feeds.mark_fetched(b.id, b_fetched).await.unwrap();

    let ctx = http_context(&db, Arc::new(ManualClock::new(test_now())));
    let scheduler = Scheduler::new(ctx, "1m").unwrap();
    let (_trigger, shutdown) = ShutdownTrigger::new();

    let report = scheduler.tick(&shutdown).await.unwrap().unwrap();
    assert_eq!(report.feed_id, a.id);

    let a_after = feeds.get_by_id(a.id).await.unwrap().unwrap();
    let b_after = feeds.get_by_id(b.id).await.unwrap().unwrap();
    assert_eq!(a_after.last_fetched_at, Some(test_now()));
    assert_eq!(b_after.last_fetched_at, Some(b_fetched));
}

#[tokio::test]
async fn successive_ticks_never_repeat_a_feed() {
    let server = empty_feed_server().await;
    let db = setup_db().await;
    for name in ["a", "b", "c"] {
        seed_feed(&db, name, &format!("{}/{name}", server.uri())).await;
    }

    let clock = Arc::new(ManualClock::new(test_now()));
    let ctx = http_context(&db, clock.clone());
    let scheduler = Scheduler::new(ctx, "1s").unwrap();
    let (_trigger, shutdown) = ShutdownTrigger::new();

    let mut order = Vec::new();
    for _ in 0..6 {
        let report = scheduler.tick(&shutdown).await.unwrap().unwrap();
        order.push(report.feed_id);
        clock.advance(Duration::seconds(1));
    }

    for pair in order.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
    // Round-robin: every feed is visited once before any repeats
    assert_eq!(order[0], order[3]);
    assert_eq!(order[1], order[4]);
    assert_eq!(order[2], order[5]);
}

#[tokio::test]
async fn failing_feed_does_not_block_others() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/up"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_document(
            "Up",
            &[TestItem {
                title: "Post",
                link: "https://up.example.com/1",
                pub_date: "Tue, 01 Oct 2024 09:00:00 +0000",
            }],
        )))
        .mount(&server)
        .await;

    let db = setup_db().await;
    let down = seed_feed(&db, "Down", &format!("{}/down", server.uri())).await;
    let up = seed_feed(&db, "Up", &format!("{}/up", server.uri())).await;

    // Make the failing feed the first pick
    let feeds = FeedRepository::new(db.pool());
    feeds
        .mark_fetched(up.id, test_now() - Duration::minutes(1))
        .await
        .unwrap();

    let ctx = http_context(&db, Arc::new(ManualClock::new(test_now())));
    let scheduler = Scheduler::new(ctx, "1s").unwrap();
    let (_trigger, shutdown) = ShutdownTrigger::new();

    assert!(scheduler.tick(&shutdown).await.is_err());
    assert!(feeds
        .get_by_id(down.id)
        .await
        .unwrap()
        .unwrap()
        .last_fetched_at
        .is_none());

    // The failed feed is still null so it keeps priority; mark it to move on
    feeds.mark_fetched(down.id, test_now()).await.unwrap();
    let report = scheduler.tick(&shutdown).await.unwrap().unwrap();
    assert_eq!(report.feed_id, up.id);
    assert_eq!(report.inserted, 1);
}

#[tokio::test]
async fn run_polls_until_shutdown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_document(
            "Live",
            &[TestItem {
                title: "Post",
                link: "https://live.example.com/1",
                pub_date: "Tue, 01 Oct 2024 09:00:00 +0000",
            }],
        )))
        .mount(&server)
        .await;

    let db = setup_db().await;
    let feed = seed_feed(&db, "Live", &format!("{}/rss", server.uri())).await;

    let ctx = http_context(&db, Arc::new(gator::SystemClock));
    let scheduler = Scheduler::with_interval(ctx, StdDuration::from_millis(50)).unwrap();
    let (trigger, shutdown) = ShutdownTrigger::new();

    let handle = tokio::spawn(async move { scheduler.run(shutdown).await });
    tokio::time::sleep(StdDuration::from_millis(400)).await;
    trigger.trigger();

    let summary = tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .expect("scheduler should stop after shutdown")
        .unwrap();

    assert_eq!(summary.state, SchedulerState::Stopped);
    assert!(summary.ticks >= 2, "expected several ticks, got {}", summary.ticks);

    // Repeated polling of the same document stores the post once
    assert_eq!(
        PostRepository::new(db.pool())
            .count_by_feed(feed.id)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn run_keeps_polling_a_failing_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let db = setup_db().await;
    let feed = seed_feed(&db, "Down", &format!("{}/rss", server.uri())).await;

    let ctx = http_context(&db, Arc::new(ManualClock::new(test_now())));
    let scheduler = Scheduler::with_interval(ctx, StdDuration::from_millis(30)).unwrap();
    let (trigger, shutdown) = ShutdownTrigger::new();

    let handle = tokio::spawn(async move { scheduler.run(shutdown).await });
    tokio::time::sleep(StdDuration::from_millis(300)).await;
    trigger.trigger();

    let summary = tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .expect("scheduler should stop after shutdown")
        .unwrap();
    assert_eq!(summary.state, SchedulerState::Stopped);
    assert!(summary.ticks >= 2, "expected several ticks, got {}", summary.ticks);

    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() >= 2);
    assert!(FeedRepository::new(db.pool())
        .get_by_id(feed.id)
        .await
        .unwrap()
        .unwrap()
        .last_fetched_at
        .is_none());
}

#[tokio::test]
async fn run_with_no_feeds_idles_and_stops() {
    let db = setup_db().await;
    let ctx = http_context(&db, Arc::new(ManualClock::new(test_now())));
    let scheduler = Scheduler::with_interval(ctx, StdDuration::from_millis(20)).unwrap();
    let (trigger, shutdown) = ShutdownTrigger::new();

    let handle = tokio::spawn(async move { scheduler.run(shutdown).await });
    tokio::time::sleep(StdDuration::from_millis(150)).await;
    trigger.trigger();

    let summary = tokio::time::timeout(StdDuration::from_secs(5), handle)
        .await
        .expect("scheduler should stop after shutdown")
        .unwrap();
    assert_eq!(summary.state, SchedulerState::Stopped);
    assert!(summary.ticks >= 1);
}

#[tokio::test]
async fn shutdown_interrupts_slow_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss_document("Slow", &[]))
                .set_delay(StdDuration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let db = setup_db().await;
    let feed = seed_feed(&db, "Slow", &format!("{}/rss", server.uri())).await;

    let ctx = http_context(&db, Arc::new(ManualClock::new(test_now())));
    let scheduler = Scheduler::new(ctx, "1h").unwrap();
    let (trigger, shutdown) = ShutdownTrigger::new();

    let handle = tokio::spawn(async move { scheduler.run(shutdown).await });
    tokio::time::sleep(StdDuration::from_millis(200)).await;
    trigger.trigger();

    let summary = tokio::time::timeout(StdDuration::from_secs(3), handle)
        .await
        .expect("in-flight fetch should be abandoned on shutdown")
        .unwrap();
    assert_eq!(summary.state, SchedulerState::Stopped);
    assert_eq!(summary.ticks, 0);

    let stored = FeedRepository::new(db.pool())
        .get_by_id(feed.id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.last_fetched_at.is_none());
}
