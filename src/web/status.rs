//! Health and status handlers.

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::trace;

use crate::config::CacheMode;
use crate::state::{AppState, ServiceStatus};

#[derive(Serialize)]
pub struct ServiceInfo {
    status: ServiceStatus,
    updated_secs_ago: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheInfo {
    mode: CacheMode,
    apps: usize,
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    status: ServiceStatus,
    version: String,
    commit: String,
    cache: CacheInfo,
    services: BTreeMap<String, ServiceInfo>,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// Status endpoint showing service and cache status
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let services: BTreeMap<String, ServiceInfo> = state
        .service_statuses
        .all()
        .into_iter()
        .map(|(name, status, updated_secs_ago)| {
            (
                name,
                ServiceInfo {
                    status,
                    updated_secs_ago,
                },
            )
        })
        .collect();

    let overall = overall_status(services.values().map(|s| &s.status));
    let snapshot = state.cache.snapshot().await;

    Json(StatusResponse {
        status: overall,
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("GIT_COMMIT_HASH").to_string(),
        cache: CacheInfo {
            mode: state.cache_mode,
            apps: snapshot.apps.len(),
            generation: snapshot.generation,
            refreshed_at: snapshot.refreshed_at,
        },
        services,
    })
}

fn overall_status<'a>(statuses: impl Iterator<Item = &'a ServiceStatus>) -> ServiceStatus {
    let statuses: Vec<&ServiceStatus> = statuses.collect();
    if statuses.is_empty() {
        ServiceStatus::Disabled
    } else if statuses.iter().any(|s| matches!(s, ServiceStatus::Error)) {
        ServiceStatus::Error
    } else if statuses.iter().any(|s| matches!(s, ServiceStatus::Starting)) {
        ServiceStatus::Starting
    } else {
        ServiceStatus::Active
    }
}
