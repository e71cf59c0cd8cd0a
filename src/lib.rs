//! Gator - a personal RSS feed aggregator
//!
//! Polls followed feeds on a fixed interval and stores their new posts.

pub mod cli;
pub mod clock;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod rss;
pub mod shutdown;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use rss::{
    ingest_feed, Feed, FeedFetcher, FeedFollowRepository, FeedRepository, FeedStore, HttpFetcher,
    IngestContext, IngestReport, InsertOutcome, NewFeed, Post, PostRepository, PostStore,
    RunSummary, Scheduler, SchedulerState,
};
pub use shutdown::{Shutdown, ShutdownTrigger};
