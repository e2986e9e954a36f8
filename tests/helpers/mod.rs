//! Shared fakes for integration tests.
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use applister::cache::{Snapshot, SnapshotSource};
use applister::feed::AppFeed;
use applister::inventory::{AppInfo, Application, InventorySource, Organization, Space};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const ORG_GUID: &str = "org-1";
pub const SPACE_GUID: &str = "space-1";

/// Inventory source whose n-th app listing waits `delays[n]` (zero past the
/// end) and returns `n + 1` apps named `gen{n}-app{i}`.
pub struct ScriptedSource {
    delays: Vec<Duration>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(delays: Vec<Duration>) -> Arc<Self> {
        Arc::new(Self {
            delays,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventorySource for ScriptedSource {
    async fn list_apps(&self) -> Result<Vec<Application>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.get(call).copied().unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok((0..=call)
            .map(|i| Application {
                guid: format!("gen{call}-guid{i}"),
                name: format!("gen{call}-app{i}"),
                space_guid: SPACE_GUID.to_owned(),
            })
            .collect())
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>> {
        Ok(vec![Organization {
            guid: ORG_GUID.to_owned(),
            name: "acme".to_owned(),
        }])
    }

    async fn list_spaces(&self) -> Result<Vec<Space>> {
        Ok(vec![Space {
            guid: SPACE_GUID.to_owned(),
            name: "dev".to_owned(),
            org_guid: ORG_GUID.to_owned(),
        }])
    }
}

/// Generation marker of an app produced by [`ScriptedSource`].
pub fn generation_of(app: &AppInfo) -> &str {
    app.name.split('-').next().unwrap_or_default()
}

/// Feed that replays scripted responses, then keeps returning an empty list.
pub struct ScriptedFeed {
    responses: Mutex<VecDeque<Result<Vec<AppInfo>, String>>>,
    calls: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(responses: Vec<Result<Vec<AppInfo>, String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppFeed for ScriptedFeed {
    async fn fetch_all(&self) -> Result<Vec<AppInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Ok(apps)) => Ok(apps),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(Vec::new()),
        }
    }
}

/// Snapshot source that always serves the same snapshot.
pub struct FixedSnapshot(pub Snapshot);

#[async_trait]
impl SnapshotSource for FixedSnapshot {
    async fn snapshot(&self) -> Snapshot {
        self.0.clone()
    }
}

pub fn app(guid: &str, name: &str) -> AppInfo {
    AppInfo {
        name: name.to_owned(),
        guid: guid.to_owned(),
        space: "dev".to_owned(),
        org: "acme".to_owned(),
    }
}
