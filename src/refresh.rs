//! Refresh scheduling and the shared-map refresher loop.

use crate::cache::shared::SharedAppMap;
use crate::feed::AppFeed;
use crate::utils::fmt_duration;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info};

/// `tokio::time::interval` panics on a zero period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Longer periods would overflow `Instant` arithmetic inside the ticker.
pub const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// When refreshes fire: every `interval`, optionally starting right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    pub interval: Duration,
    pub immediate: bool,
}

impl RefreshSchedule {
    /// First refresh on start, then every `interval`.
    pub fn immediate(interval: Duration) -> Self {
        Self {
            interval,
            immediate: true,
        }
    }

    /// First refresh after one `interval`, then every `interval`.
    pub fn delayed(interval: Duration) -> Self {
        Self {
            interval,
            immediate: false,
        }
    }

    /// Build the ticker. Late ticks are delayed rather than burst, so a slow
    /// consumer never sees a backlog of refresh triggers.
    pub fn ticker(&self) -> Interval {
        let period = self.interval.clamp(MIN_PERIOD, MAX_PERIOD);
        let start = if self.immediate {
            time::Instant::now()
        } else {
            time::Instant::now() + period
        };
        let mut ticker = time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

/// Periodically pulls the app feed into a [`SharedAppMap`].
///
/// Passes run inline in the loop, so two passes never overlap. A failed fetch
/// ends the loop with an error, which the service manager treats as fatal.
pub struct FeedRefresher {
    feed: Arc<dyn AppFeed>,
    map: SharedAppMap,
    schedule: RefreshSchedule,
}

impl FeedRefresher {
    pub fn new(feed: Arc<dyn AppFeed>, map: SharedAppMap, schedule: RefreshSchedule) -> Self {
        Self {
            feed,
            map,
            schedule,
        }
    }

    /// Run until shutdown is signalled or a refresh pass fails.
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!(
            interval = fmt_duration(self.schedule.interval),
            immediate = self.schedule.immediate,
            "Feed refresher started"
        );
        let mut ticker = self.schedule.ticker();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Feed refresher received shutdown signal, exiting");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    debug!("Refresh tick, updating app map");
                    self.refresh_once().await?;
                }
            }
        }
    }

    /// Fetch the feed once and upsert every record into the map.
    pub async fn refresh_once(&self) -> Result<usize> {
        let start = Instant::now();
        let apps = self
            .feed
            .fetch_all()
            .await
            .context("Failed to fetch app info feed")?;
        let written = self.map.apply_pass(apps).await;
        let total = self.map.len().await;
        info!(
            written,
            total,
            elapsed = fmt_duration(start.elapsed()),
            "App map updated"
        );
        Ok(written)
    }
}
