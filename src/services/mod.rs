//! Long-running services and their lifecycle.

pub mod cache;
pub mod manager;
pub mod signals;
pub mod web;

use tokio::sync::broadcast;

/// How a service task ended.
#[derive(Debug)]
pub enum ServiceResult {
    /// Returned `Ok` (after a shutdown signal, or on its own).
    Completed,
    /// Returned an error.
    Failed(anyhow::Error),
    /// The task panicked or was aborted.
    Panicked(String),
}

/// A component that runs for the lifetime of the process.
///
/// `run` should return `Ok(())` promptly once `shutdown_rx` fires. Returning
/// an error shuts the whole process down with a failure exit code.
#[async_trait::async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&mut self, shutdown_rx: broadcast::Receiver<()>) -> Result<(), anyhow::Error>;
}
