//! Router construction.

use axum::{Router, http::StatusCode, routing::get};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{apps, status};

/// Plain-text greeting served at `/` and for any unknown path.
pub const BANNER: &str =
    "Cloud Foundry application lister.  Actual Information is served at /rest/apps/";

/// Creates the web server router
pub fn create_router(app_state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(banner))
        .route("/rest/apps/", get(apps::list_apps))
        .route("/rest/apps", get(apps::list_apps))
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .fallback(banner)
        .with_state(app_state);

    router.layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        CompressionLayer::new().gzip(true).br(true).zstd(true),
        TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(30)),
    ))
}

/// `GET /`
async fn banner() -> &'static str {
    BANNER
}
