//! Services that keep the inventory cache fresh.

use super::Service;
use crate::cache::owner::CacheOwner;
use crate::refresh::FeedRefresher;
use tokio::sync::broadcast;

/// Runs the owner loop of an [`OwnerCache`](crate::cache::owner::OwnerCache).
pub struct OwnerCacheService {
    owner: CacheOwner,
}

impl OwnerCacheService {
    pub fn new(owner: CacheOwner) -> Self {
        Self { owner }
    }
}

#[async_trait::async_trait]
impl Service for OwnerCacheService {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn run(&mut self, shutdown_rx: broadcast::Receiver<()>) -> Result<(), anyhow::Error> {
        self.owner.run(shutdown_rx).await;
        Ok(())
    }
}

/// Runs a [`FeedRefresher`]. A failed fetch ends the service with an error.
pub struct FeedRefreshService {
    refresher: FeedRefresher,
}

impl FeedRefreshService {
    pub fn new(refresher: FeedRefresher) -> Self {
        Self { refresher }
    }
}

#[async_trait::async_trait]
impl Service for FeedRefreshService {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn run(&mut self, shutdown_rx: broadcast::Receiver<()>) -> Result<(), anyhow::Error> {
        self.refresher.run(shutdown_rx).await
    }
}
