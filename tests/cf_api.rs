//! Cloud Foundry client against an in-process fake of the v2 API.

use applister::cf::{CfApi, CfApiConfig};
use applister::inventory::InventorySource;
use applister::inventory::rebuild::rebuild;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct FakeCf {
    base: Arc<std::sync::OnceLock<String>>,
    tokens_issued: Arc<AtomicUsize>,
    /// Bearer tokens the listing endpoints reject with 401.
    rejected: Arc<std::sync::Mutex<Vec<String>>>,
}

impl FakeCf {
    fn base(&self) -> &str {
        self.base.get().map(String::as_str).unwrap_or_default()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(token) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            return false;
        };
        !self.rejected.lock().unwrap().iter().any(|t| t == token)
    }
}

async fn info(State(cf): State<FakeCf>) -> Json<Value> {
    Json(json!({ "name": "fake", "token_endpoint": cf.base() }))
}

async fn token(State(cf): State<FakeCf>, headers: HeaderMap) -> Response {
    let basic = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !basic.starts_with("Basic ") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let n = cf.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({
        "access_token": format!("token-{n}"),
        "token_type": "bearer",
        "expires_in": 3600
    }))
    .into_response()
}

fn resource(guid: &str, entity: Value) -> Value {
    json!({ "metadata": { "guid": guid, "url": format!("/v2/x/{guid}") }, "entity": entity })
}

async fn apps(
    State(cf): State<FakeCf>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !cf.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let page = match query.get("page").map(String::as_str) {
        Some("2") => json!({
            "total_results": 3,
            "total_pages": 2,
            "next_url": null,
            "resources": [
                resource("a3", json!({ "name": "orphan", "space_guid": "s-missing" })),
            ]
        }),
        _ => json!({
            "total_results": 3,
            "total_pages": 2,
            "next_url": "/v2/apps?order-direction=asc&page=2&results-per-page=100",
            "resources": [
                resource(
                    "a1",
                    json!({ "name": "billing", "space_guid": "s1", "state": "STARTED" })
                ),
                resource("a2", json!({ "name": "ledger", "space_guid": "s2" })),
            ]
        }),
    };
    Json(page).into_response()
}

async fn organizations(State(cf): State<FakeCf>, headers: HeaderMap) -> Response {
    if !cf.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "total_results": 1,
        "next_url": null,
        "resources": [resource("o1", json!({ "name": "acme" }))]
    }))
    .into_response()
}

async fn spaces(State(cf): State<FakeCf>, headers: HeaderMap) -> Response {
    if !cf.authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!({
        "total_results": 2,
        "next_url": null,
        "resources": [
            resource("s1", json!({ "name": "dev", "organization_guid": "o1" })),
            resource("s2", json!({ "name": "prod", "organization_guid": "o-missing" })),
        ]
    }))
    .into_response()
}

async fn start(cf: FakeCf) -> CfApi {
    let app = Router::new()
        .route("/v2/info", get(info))
        .route("/oauth/token", post(token))
        .route("/v2/apps", get(apps))
        .route("/v2/organizations", get(organizations))
        .route("/v2/spaces", get(spaces))
        .with_state(cf.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    cf.base.set(base.clone()).unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    CfApi::new(CfApiConfig {
        api_address: base,
        client_id: "lister".into(),
        client_secret: "secret".into(),
        skip_ssl_validation: false,
    })
    .unwrap()
}

#[tokio::test]
async fn lists_every_page() {
    let api = start(FakeCf::default()).await;
    let apps = api.list_apps().await.unwrap();
    let guids: Vec<&str> = apps.iter().map(|a| a.guid.as_str()).collect();
    assert_eq!(guids, ["a1", "a2", "a3"]);
    assert_eq!(apps[0].name, "billing");
    assert_eq!(apps[0].space_guid, "s1");
}

#[tokio::test]
async fn token_is_reused_across_listings() {
    let cf = FakeCf::default();
    let api = start(cf.clone()).await;

    api.list_apps().await.unwrap();
    api.list_spaces().await.unwrap();
    api.list_organizations().await.unwrap();
    assert_eq!(cf.tokens_issued.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_token_is_renewed_once() {
    let cf = FakeCf::default();
    cf.rejected.lock().unwrap().push("token-1".into());
    let api = start(cf.clone()).await;

    let orgs = api.list_organizations().await.unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].name, "acme");
    assert_eq!(cf.tokens_issued.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn persistent_rejection_is_an_error() {
    let cf = FakeCf::default();
    cf.rejected
        .lock()
        .unwrap()
        .extend(["token-1".to_owned(), "token-2".to_owned()]);
    let api = start(cf.clone()).await;

    assert!(api.list_spaces().await.is_err());
    assert_eq!(cf.tokens_issued.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rebuild_resolves_against_live_listings() {
    let api = start(FakeCf::default()).await;
    let resolved = rebuild(&api).await;

    let rows: Vec<(&str, &str, &str)> = resolved
        .iter()
        .map(|a| (a.name.as_str(), a.space.as_str(), a.org.as_str()))
        .collect();
    assert_eq!(
        rows,
        [("billing", "dev", "acme"), ("ledger", "prod", ""), ("orphan", "", "")]
    );
}

#[tokio::test]
async fn concurrent_rejections_renew_the_token_once() {
    let cf = FakeCf::default();
    cf.rejected.lock().unwrap().push("token-1".into());
    let api = start(cf.clone()).await;

    let resolved = rebuild(&api).await;
    assert_eq!(resolved.len(), 3);
    assert_eq!(cf.tokens_issued.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unreachable_api_fails_listing() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let api = CfApi::new(CfApiConfig {
        api_address: base,
        client_id: "lister".into(),
        client_secret: "secret".into(),
        skip_ssl_validation: false,
    })
    .unwrap();
    assert!(api.list_apps().await.is_err());
    // Degrades to an empty dataset rather than failing.
    assert!(rebuild(&api).await.is_empty());
}
