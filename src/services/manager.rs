use super::{Service, ServiceResult};
use crate::state::{ServiceStatus, ServiceStatusRegistry};
use crate::utils::fmt_duration;
use futures::future::select_all;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Owns every registered service, spawns them, and coordinates shutdown.
pub struct ServiceManager {
    registered: Vec<Box<dyn Service>>,
    running: Vec<(&'static str, JoinHandle<ServiceResult>)>,
    shutdown_tx: broadcast::Sender<()>,
    statuses: ServiceStatusRegistry,
}

impl ServiceManager {
    pub fn new(statuses: ServiceStatusRegistry) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registered: Vec::new(),
            running: Vec::new(),
            shutdown_tx,
            statuses,
        }
    }

    pub fn register_service(&mut self, service: Box<dyn Service>) {
        self.statuses.set(service.name(), ServiceStatus::Starting);
        self.registered.push(service);
    }

    pub fn has_services(&self) -> bool {
        !self.registered.is_empty() || !self.running.is_empty()
    }

    /// Spawn every registered service on its own task.
    pub fn spawn_all(&mut self) {
        for service in self.registered.drain(..) {
            let name = service.name();
            let shutdown_rx = self.shutdown_tx.subscribe();
            let statuses = self.statuses.clone();
            let handle = tokio::spawn(run_service(service, shutdown_rx, statuses));
            debug!(service = name, "service spawned");
            self.running.push((name, handle));
        }
        info!(count = self.running.len(), "all services spawned");
    }

    /// Wait for the first running service to finish. Pends forever when
    /// nothing is running.
    pub async fn wait_for_exit(&mut self) -> (&'static str, ServiceResult) {
        if self.running.is_empty() {
            return std::future::pending().await;
        }

        let (joined, index, _) =
            select_all(self.running.iter_mut().map(|(_, handle)| handle)).await;
        let (name, _) = self.running.remove(index);
        let result = joined.unwrap_or_else(|e| ServiceResult::Panicked(e.to_string()));
        if let ServiceResult::Panicked(reason) = &result {
            self.statuses.set(name, ServiceStatus::Error);
            error!(service = name, reason = %reason, "service task panicked");
        }
        (name, result)
    }

    /// Signal every service to stop and wait up to `timeout` for them.
    ///
    /// Returns the names of services that were still running at the deadline;
    /// those tasks are aborted.
    pub async fn shutdown(mut self, timeout: Duration) -> Vec<&'static str> {
        let start = Instant::now();
        let _ = self.shutdown_tx.send(());

        let mut pending = Vec::new();
        for (name, mut handle) in self.running.drain(..) {
            let remaining = timeout.saturating_sub(start.elapsed());
            match tokio::time::timeout(remaining, &mut handle).await {
                Ok(Ok(ServiceResult::Failed(e))) => {
                    warn!(service = name, error = ?e, "service failed while shutting down");
                }
                Ok(Ok(_)) => debug!(service = name, "service stopped"),
                Ok(Err(e)) => warn!(service = name, error = %e, "service task panicked during shutdown"),
                Err(_) => {
                    warn!(service = name, "service did not stop in time, aborting");
                    handle.abort();
                    pending.push(name);
                }
            }
        }

        info!(
            elapsed = fmt_duration(start.elapsed()),
            timed_out = pending.len(),
            "services shut down"
        );
        pending
    }
}

/// Run one service, recording its status before and after.
async fn run_service(
    mut service: Box<dyn Service>,
    shutdown_rx: broadcast::Receiver<()>,
    statuses: ServiceStatusRegistry,
) -> ServiceResult {
    let name = service.name();
    statuses.set(name, ServiceStatus::Active);
    info!(service = name, "service started");

    match service.run(shutdown_rx).await {
        Ok(()) => {
            statuses.set(name, ServiceStatus::Disabled);
            info!(service = name, "service stopped");
            ServiceResult::Completed
        }
        Err(e) => {
            statuses.set(name, ServiceStatus::Error);
            error!(service = name, error = ?e, "service failed");
            ServiceResult::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct UntilShutdown;

    #[async_trait::async_trait]
    impl Service for UntilShutdown {
        fn name(&self) -> &'static str {
            "patient"
        }

        async fn run(&mut self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
            let _ = shutdown_rx.recv().await;
            Ok(())
        }
    }

    struct FailsImmediately;

    #[async_trait::async_trait]
    impl Service for FailsImmediately {
        fn name(&self) -> &'static str {
            "fragile"
        }

        async fn run(&mut self, _shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
            Err(anyhow!("upstream unreachable"))
        }
    }

    #[tokio::test]
    async fn failing_service_is_reported_first() {
        let statuses = ServiceStatusRegistry::new();
        let mut manager = ServiceManager::new(statuses.clone());
        manager.register_service(Box::new(UntilShutdown));
        manager.register_service(Box::new(FailsImmediately));
        assert!(manager.has_services());
        manager.spawn_all();

        let (name, result) = manager.wait_for_exit().await;
        assert_eq!(name, "fragile");
        assert!(matches!(result, ServiceResult::Failed(_)));
        assert_eq!(statuses.get("fragile"), Some(ServiceStatus::Error));

        let pending = manager.shutdown(Duration::from_secs(1)).await;
        assert!(pending.is_empty());
        assert_eq!(statuses.get("patient"), Some(ServiceStatus::Disabled));
    }
}
