//! Polling loop for Gator.
//!
//! Every tick picks the least recently fetched feed and runs one ingestion
//! step on it. Steps never overlap and the loop only ends on shutdown.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::ingest::{ingest_feed, IngestContext};
use super::types::IngestReport;
use crate::datetime::parse_interval;
use crate::shutdown::Shutdown;
use crate::{GatorError, Result};

/// Lifecycle of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Running => write!(f, "running"),
            SchedulerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// How a call to [`Scheduler::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Final state, always [`SchedulerState::Stopped`].
    pub state: SchedulerState,
    /// Ticks that ran to completion.
    pub ticks: u64,
}

/// Fixed-interval feed poller.
#[derive(Debug)]
pub struct Scheduler {
    ctx: IngestContext,
    interval: Duration,
    running: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler from an interval expression such as `1m` or `30s`.
    pub fn new(ctx: IngestContext, expression: &str) -> Result<Self> {
        Self::with_interval(ctx, parse_interval(expression)?)
    }

    /// Create a scheduler with an explicit interval.
    pub fn with_interval(ctx: IngestContext, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(GatorError::Config(
                "polling interval must be greater than zero".into(),
            ));
        }
        Ok(Self {
            ctx,
            interval,
            running: AtomicBool::new(false),
        })
    }

    /// The polling interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether [`Scheduler::run`] is currently polling.
    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    /// Run one step against the least recently fetched feed.
    ///
    /// Returns `Ok(None)` when there is no feed to poll.
    pub async fn tick(&self, shutdown: &Shutdown) -> Result<Option<IngestReport>> {
        let next = match self.ctx.feeds.next_feed_to_fetch().await {
            Ok(next) => next,
            Err(e) => {
                warn!("feed selection failed: {}", e);
                return Err(e);
            }
        };
        let Some(feed) = next else {
            return Ok(None);
        };

        debug!(feed = %feed.url, "fetching feed");
        let result = ingest_feed(&self.ctx, &feed, shutdown).await;
        if let Err(e) = &result {
            if !matches!(e, GatorError::Cancelled) {
                warn!(feed = %feed.url, "ingestion failed: {}", e);
            }
        }
        result.map(Some)
    }

    /// Poll until `shutdown` fires.
    ///
    /// The first tick runs immediately. Ticks that come due while a step is
    /// still running are delayed rather than bunched up.
    pub async fn run(&self, shutdown: Shutdown) -> RunSummary {
        info!(
            "Collecting feeds every {} second(s)",
            self.interval.as_secs_f64()
        );

        self.running.store(true, Ordering::Release);
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            match self.tick(&shutdown).await {
                Ok(Some(report)) => info!("{}", report),
                Ok(None) => debug!("No feeds to fetch"),
                Err(GatorError::Cancelled) => break,
                Err(e) if e.is_recoverable() => {
                    debug!("Tick failed, retrying on a later tick: {}", e)
                }
                Err(e) => error!("Tick failed: {}", e),
            }
            ticks += 1;
        }

        self.running.store(false, Ordering::Release);
        info!("Feed collection {} after {} tick(s)", SchedulerState::Stopped, ticks);
        RunSummary {
            state: SchedulerState::Stopped,
            ticks,
        }
    }
}
