//! Owner-task cache: one event loop owns the dataset, no locks.
//!
//! Every state transition goes through [`CacheOwner::run`], which handles one
//! event at a time:
//!
//! - **Read**: reply with the current snapshot (an `Arc`, never a partial view).
//! - **Tick**: spawn a rebuild in the background and keep serving the old data.
//! - **Rebuilt**: install the fresh dataset.
//!
//! Rebuilds are not single-flight. If two overlap, whichever completion
//! reaches the loop last is what stays installed, regardless of which
//! rebuild started first.

use super::{Snapshot, SnapshotSource};
use crate::inventory::rebuild::rebuild;
use crate::inventory::{AppInfo, InventorySource};
use crate::refresh::RefreshSchedule;
use crate::utils::fmt_duration;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Interval;
use tracing::{debug, info, trace, warn};

/// Pending read requests allowed to queue before callers wait on the channel.
const REQUEST_QUEUE_DEPTH: usize = 256;

type ReadReply = oneshot::Sender<Snapshot>;

/// One unit of work for the owner loop.
#[derive(Debug)]
pub(crate) enum Event {
    Read(ReadReply),
    Tick,
    Rebuilt(Vec<AppInfo>),
}

/// Cloneable handle used by readers. All access goes through the owner loop.
#[derive(Clone)]
pub struct OwnerCache {
    requests: mpsc::Sender<ReadReply>,
}

impl OwnerCache {
    /// Create a handle and the owner loop that serves it.
    ///
    /// Nothing is fetched until [`CacheOwner::run`] is polled.
    pub fn new(source: Arc<dyn InventorySource>, schedule: RefreshSchedule) -> (Self, CacheOwner) {
        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let (rebuilt_tx, rebuilt_rx) = mpsc::unbounded_channel();
        let owner = CacheOwner {
            source,
            schedule,
            requests: requests_rx,
            rebuilt_tx,
            rebuilt_rx,
            current: Snapshot::empty(),
        };
        (
            Self {
                requests: requests_tx,
            },
            owner,
        )
    }

    /// Ask the owner for its current snapshot.
    ///
    /// Returns an empty snapshot if the owner loop is no longer running, so
    /// readers never see an error.
    pub async fn snapshot(&self) -> Snapshot {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.requests.send(reply_tx).await.is_err() {
            warn!("Cache owner is not running, serving empty snapshot");
            return Snapshot::empty();
        }
        reply_rx.await.unwrap_or_else(|_| {
            warn!("Cache owner dropped read request, serving empty snapshot");
            Snapshot::empty()
        })
    }
}

#[async_trait]
impl SnapshotSource for OwnerCache {
    async fn snapshot(&self) -> Snapshot {
        OwnerCache::snapshot(self).await
    }
}

/// The loop that exclusively owns the current dataset.
pub struct CacheOwner {
    source: Arc<dyn InventorySource>,
    schedule: RefreshSchedule,
    requests: mpsc::Receiver<ReadReply>,
    /// Cloned into each spawned rebuild; held here so the channel never closes.
    rebuilt_tx: mpsc::UnboundedSender<Vec<AppInfo>>,
    rebuilt_rx: mpsc::UnboundedReceiver<Vec<AppInfo>>,
    current: Snapshot,
}

impl CacheOwner {
    /// Serve events until shutdown is signalled or every handle is dropped.
    pub async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            interval = fmt_duration(self.schedule.interval),
            immediate = self.schedule.immediate,
            "Cache owner started"
        );
        let mut ticker = self.schedule.ticker();

        loop {
            let event = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Cache owner received shutdown signal, exiting");
                    break;
                }
                event = self.next_event(&mut ticker) => event,
            };

            match event {
                Some(event) => self.handle(event),
                None => {
                    info!("All cache handles dropped, cache owner exiting");
                    break;
                }
            }
        }
    }

    /// Wait for the next event. `None` once no reader handle remains.
    async fn next_event(&mut self, ticker: &mut Interval) -> Option<Event> {
        tokio::select! {
            request = self.requests.recv() => request.map(Event::Read),
            _ = ticker.tick() => Some(Event::Tick),
            Some(fresh) = self.rebuilt_rx.recv() => Some(Event::Rebuilt(fresh)),
        }
    }

    pub(crate) fn handle(&mut self, event: Event) {
        match event {
            Event::Read(reply) => {
                // The reader may have given up; nothing to do then.
                let _ = reply.send(self.current.clone());
            }
            Event::Tick => self.spawn_rebuild(),
            Event::Rebuilt(fresh) => self.install(fresh),
        }
    }

    fn spawn_rebuild(&self) {
        trace!("Refresh tick, spawning rebuild");
        let source = Arc::clone(&self.source);
        let done = self.rebuilt_tx.clone();
        tokio::spawn(async move {
            let fresh = rebuild(source.as_ref()).await;
            if done.send(fresh).is_err() {
                debug!("Cache owner gone before rebuild completed, discarding result");
            }
        });
    }

    fn install(&mut self, fresh: Vec<AppInfo>) {
        let generation = self.current.generation + 1;
        let previous = self.current.apps.len();
        self.current = Snapshot {
            generation,
            refreshed_at: Some(Utc::now()),
            apps: Arc::new(fresh),
        };
        info!(
            generation,
            apps = self.current.apps.len(),
            previous,
            "App map updated"
        );
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> &Snapshot {
        &self.current
    }
}
