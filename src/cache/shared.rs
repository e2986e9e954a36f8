//! Shared-map cache: a `guid`-keyed map behind a reader/writer lock.
//!
//! The refresher takes the write lock once per entry, so readers interleave
//! with a refresh pass and can observe a mix of old and new entries. Entries
//! that disappear upstream are never removed.

use super::{Snapshot, SnapshotSource};
use crate::inventory::AppInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Shared application map. Clone-cheap (all `Arc`-wrapped internals).
#[derive(Clone, Default)]
pub struct SharedAppMap {
    /// guid → record
    entries: Arc<RwLock<BTreeMap<String, AppInfo>>>,
    /// Completed refresh passes.
    passes: Arc<AtomicU64>,
    refreshed_at: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl SharedAppMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one record under its `guid`, holding the write lock
    /// only for this entry.
    pub async fn upsert(&self, app: AppInfo) {
        let mut entries = self.entries.write().await;
        entries.insert(app.guid.clone(), app);
    }

    /// Upsert every record of one refresh pass, one lock acquisition each.
    /// Returns the number of records written.
    pub async fn apply_pass(&self, apps: Vec<AppInfo>) -> usize {
        let written = apps.len();
        for app in apps {
            self.upsert(app).await;
        }
        self.passes.fetch_add(1, Ordering::AcqRel);
        *self.refreshed_at.write().await = Some(Utc::now());
        written
    }

    /// Look up a single record by `guid`.
    pub async fn get(&self, guid: &str) -> Option<AppInfo> {
        self.entries.read().await.get(guid).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Copy out every record, ordered by `guid`. Holds the read lock for the
    /// whole traversal.
    pub async fn to_vec(&self) -> Vec<AppInfo> {
        self.entries.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl SnapshotSource for SharedAppMap {
    async fn snapshot(&self) -> Snapshot {
        let apps = self.to_vec().await;
        Snapshot {
            generation: self.passes.load(Ordering::Acquire),
            refreshed_at: *self.refreshed_at.read().await,
            apps: Arc::new(apps),
        }
    }
}
