//! Inventory listing handler.

use axum::extract::State;
use axum::response::{IntoResponse, Json, Response};
use tracing::trace;

use crate::state::AppState;

/// `GET /rest/apps/`
///
/// The whole current dataset as a JSON array. Always 200; an empty array
/// until the first refresh completes.
pub(super) async fn list_apps(State(state): State<AppState>) -> Response {
    let snapshot = state.cache.snapshot().await;
    trace!(
        generation = snapshot.generation,
        apps = snapshot.apps.len(),
        "serving app list"
    );
    Json(snapshot.apps.as_slice()).into_response()
}
