//! Command-line flags. Every setting here is a default that the matching
//! environment variable overrides (see [`crate::config`]).

use crate::config::{CacheMode, Config};
use clap::{Parser, ValueEnum};

/// Cloud Foundry application lister
#[derive(Parser, Debug, Clone)]
#[command(name = "applister", version, about)]
pub struct Args {
    /// Cloud Foundry API address ($API_ADDRESS)
    #[arg(long = "api.address", default_value = "")]
    pub api_address: String,

    /// Cloud Foundry UAA client ID ($CF_CLIENT_ID)
    #[arg(long = "api.id", default_value = "")]
    pub client_id: String,

    /// Cloud Foundry UAA client secret ($CF_CLIENT_SECRET)
    #[arg(long = "api.secret", default_value = "")]
    pub client_secret: String,

    /// Disable TLS certificate validation ($SKIP_SSL)
    #[arg(long = "skip.ssl")]
    pub skip_ssl: bool,

    /// Refresh interval in minutes ($FREQUENCY)
    #[arg(long = "update.frequency", default_value_t = 3)]
    pub frequency: u64,

    /// HTTP listen port ($PORT)
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Cache strategy ($CACHE_MODE)
    #[arg(long = "cache.mode", value_enum, default_value_t = CacheMode::Owner)]
    pub cache_mode: CacheMode,

    /// App info feed URL, required in shared mode ($APP_INFO_API_URL)
    #[arg(long = "app-info.url")]
    pub app_info_url: Option<String>,

    /// Log level for this crate ($LOG_LEVEL)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Seconds to wait for services to stop ($SHUTDOWN_TIMEOUT)
    #[arg(long, default_value_t = 8)]
    pub shutdown_timeout: u64,

    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable single-line output
    Pretty,
    /// Structured JSON, one object per line
    Json,
}

fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

impl Args {
    /// The configuration these flags describe, before environment overrides.
    pub fn defaults(&self) -> Config {
        Config {
            api_address: self.api_address.clone(),
            cf_client_id: self.client_id.clone(),
            cf_client_secret: self.client_secret.clone(),
            skip_ssl: self.skip_ssl,
            frequency: self.frequency,
            port: self.port,
            cache_mode: self.cache_mode,
            app_info_api_url: self.app_info_url.clone(),
            log_level: self.log_level.clone(),
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}
