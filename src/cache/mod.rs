//! Refreshable in-memory caches of the application inventory.
//!
//! Two strategies are available, selected at startup:
//!
//! - [`owner::OwnerCache`]: a single task owns the dataset and serializes every
//!   read, timer tick and rebuild completion through one event loop. Readers
//!   always see exactly one complete generation.
//! - [`shared::SharedAppMap`]: a `guid`-keyed map behind a reader/writer lock,
//!   updated one entry at a time. Readers may see entries from two generations
//!   while a refresh pass is in progress.

pub mod owner;
pub mod shared;

use crate::inventory::AppInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Point-in-time view of a cache, cheap to clone and safe to hold across `.await`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Number of datasets (owner) or refresh passes (shared map) installed
    /// since start. Zero until the first refresh completes.
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub apps: Arc<Vec<AppInfo>>,
}

impl Snapshot {
    /// The snapshot served before the first refresh completes.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            refreshed_at: None,
            apps: Arc::new(Vec::new()),
        }
    }
}

/// Anything the read-request server can take a [`Snapshot`] from.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self) -> Snapshot;
}
