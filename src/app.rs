use crate::cache::SnapshotSource;
use crate::cache::owner::OwnerCache;
use crate::cache::shared::SharedAppMap;
use crate::cf::{CfApi, CfApiConfig};
use crate::config::{CacheMode, Config};
use crate::feed::HttpAppFeed;
use crate::refresh::{FeedRefresher, RefreshSchedule};
use crate::services::Service;
use crate::services::cache::{FeedRefreshService, OwnerCacheService};
use crate::services::manager::ServiceManager;
use crate::services::web::WebService;
use crate::state::{AppState, ServiceStatusRegistry};
use crate::utils::fmt_duration;
use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    app_state: AppState,
    cache_service: Option<Box<dyn Service>>,
    service_manager: ServiceManager,
}

impl App {
    /// Build the cache for the configured mode and the state shared with the web layer.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let statuses = ServiceStatusRegistry::new();
        let interval = config.refresh_interval();

        let (cache, cache_service): (Arc<dyn SnapshotSource>, Box<dyn Service>) =
            match config.cache_mode {
                CacheMode::Owner => {
                    let api = CfApi::new(CfApiConfig {
                        api_address: config.api_address.clone(),
                        client_id: config.cf_client_id.clone(),
                        client_secret: config.cf_client_secret.clone(),
                        skip_ssl_validation: config.skip_ssl,
                    })
                    .context("Failed to create Cloud Foundry client")?;

                    let (handle, owner) =
                        OwnerCache::new(Arc::new(api), RefreshSchedule::immediate(interval));
                    (Arc::new(handle), Box::new(OwnerCacheService::new(owner)))
                }
                CacheMode::Shared => {
                    let url = config
                        .app_info_url()
                        .context("APP_INFO_API_URL is required in shared cache mode")?;
                    let feed = HttpAppFeed::new(url, config.skip_ssl)
                        .context("Failed to create feed client")?;

                    let map = SharedAppMap::new();
                    let refresher = FeedRefresher::new(
                        Arc::new(feed),
                        map.clone(),
                        RefreshSchedule::delayed(interval),
                    );
                    (Arc::new(map), Box::new(FeedRefreshService::new(refresher)))
                }
            };

        info!(
            mode = %config.cache_mode,
            interval = fmt_duration(interval),
            "cache configured"
        );

        let app_state = AppState::new(cache, config.cache_mode, statuses.clone());

        Ok(App {
            config,
            app_state,
            cache_service: Some(cache_service),
            service_manager: ServiceManager::new(statuses),
        })
    }

    /// Register the cache and web services with the manager
    pub fn setup_services(&mut self) -> Result<(), anyhow::Error> {
        if let Some(cache_service) = self.cache_service.take() {
            self.service_manager.register_service(cache_service);
        }

        let web_service = Box::new(WebService::new(self.config.port, self.app_state.clone()));
        self.service_manager.register_service(web_service);

        if !self.service_manager.has_services() {
            return Err(anyhow::anyhow!("No services registered"));
        }
        Ok(())
    }

    /// Start all registered services
    pub fn start_services(&mut self) {
        self.service_manager.spawn_all();
    }

    /// Run the application and handle shutdown signals
    pub async fn run(self) -> ExitCode {
        use crate::services::signals::handle_shutdown_signals;
        handle_shutdown_signals(self.service_manager, self.config.shutdown_timeout()).await
    }
}
