//! Cloud Foundry v2 API client: UAA client-credentials auth and paginated listings.

use crate::cf::errors::CfApiError;
use crate::cf::json::parse_json_with_context;
use crate::cf::middleware::http_client;
use crate::cf::models::{AppEntity, Info, OrgEntity, Page, Resource, SpaceEntity, TokenResponse};
use crate::inventory::{Application, InventorySource, Organization, Space};
use crate::utils::fmt_duration;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

/// Page size requested from every listing endpoint (the v2 API maximum).
const PAGE_SIZE: u32 = 100;

/// Renew a token this long before UAA says it expires.
const TOKEN_EXPIRY_SKEW: Duration = Duration::from_secs(30);

/// Assumed token lifetime when UAA omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(10 * 60);

/// Connection settings for [`CfApi`].
#[derive(Debug, Clone)]
pub struct CfApiConfig {
    pub api_address: String,
    pub client_id: String,
    pub client_secret: String,
    pub skip_ssl_validation: bool,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_EXPIRY_SKEW < self.expires_at
    }
}

/// Client for the Cloud Foundry v2 API.
pub struct CfApi {
    http: ClientWithMiddleware,
    base_url: Url,
    client_id: String,
    client_secret: String,
    /// Cached bearer token; the lock also serializes token renewal.
    token: Mutex<Option<AccessToken>>,
}

impl CfApi {
    pub fn new(config: CfApiConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.api_address)
            .with_context(|| format!("Invalid API address {:?}", config.api_address))?;
        let http = http_client(config.skip_ssl_validation)?;
        Ok(Self {
            http,
            base_url,
            client_id: config.client_id,
            client_secret: config.client_secret,
            token: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, requesting a new one when needed.
    async fn access_token(&self) -> Result<String, CfApiError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.is_fresh()
        {
            return Ok(token.value.clone());
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token if it is still `rejected`. A concurrent listing
    /// may already have renewed it.
    async fn invalidate_token(&self, rejected: &str) {
        let mut cached = self.token.lock().await;
        if cached.as_ref().is_some_and(|token| token.value == rejected) {
            *cached = None;
        }
    }

    /// Discover the UAA endpoint and run the client-credentials grant.
    async fn request_token(&self) -> Result<AccessToken, CfApiError> {
        let info_url = self.url("/v2/info")?;
        let info: Info = read_json(self.http.get(info_url.clone()), info_url.as_str()).await?;

        let token_url = format!("{}/oauth/token", info.token_endpoint.trim_end_matches('/'));
        let request = self
            .http
            .post(&token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials")]);
        let grant: TokenResponse = read_json(request, &token_url).await?;

        let lifetime = grant
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        info!(
            lifetime = fmt_duration(lifetime),
            "Obtained Cloud Foundry access token"
        );
        Ok(AccessToken {
            value: grant.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }

    /// GET with the bearer token. A 401 renews the token and retries once.
    async fn get_authorized<T: DeserializeOwned>(&self, url: &Url) -> Result<T, CfApiError> {
        let token = self.access_token().await?;
        let first = read_json(self.http.get(url.clone()).bearer_auth(&token), url.as_str()).await;

        match first {
            Err(CfApiError::Unauthorized) => {
                debug!(url = %url, "Access token rejected, requesting a new one");
                self.invalidate_token(&token).await;
                let token = self.access_token().await?;
                read_json(self.http.get(url.clone()).bearer_auth(&token), url.as_str()).await
            }
            other => other,
        }
    }

    /// Fetch every page of a v2 listing, following `next_url`.
    async fn list_all<E: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Vec<Resource<E>>, CfApiError> {
        let start = Instant::now();
        let mut url = self.url(&format!("{path}?results-per-page={PAGE_SIZE}"))?;
        let mut resources = Vec::new();
        let mut pages = 0u32;

        loop {
            let page: Page<E> = self.get_authorized(&url).await?;
            pages += 1;
            resources.extend(page.resources);
            match page.next_url.filter(|next| !next.is_empty()) {
                Some(next) => url = self.url(&next)?,
                None => break,
            }
        }

        debug!(
            path,
            pages,
            count = resources.len(),
            elapsed = fmt_duration(start.elapsed()),
            "Listed resources"
        );
        Ok(resources)
    }

    fn url(&self, path: &str) -> Result<Url, CfApiError> {
        self.base_url
            .join(path)
            .map_err(|e| {
                CfApiError::RequestFailed(anyhow!(e).context(format!("Invalid path {path}")))
            })
    }
}

/// Send `request` and decode a successful JSON body.
async fn read_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, CfApiError> {
    let response = request.send().await?;
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(CfApiError::Unauthorized);
    }
    if !status.is_success() {
        return Err(CfApiError::Status {
            status: status.as_u16(),
            url: url.to_owned(),
        });
    }

    let body = response.text().await?;
    parse_json_with_context(&body).map_err(|source| CfApiError::ParseFailed {
        url: url.to_owned(),
        source,
    })
}

#[async_trait]
impl InventorySource for CfApi {
    async fn list_apps(&self) -> anyhow::Result<Vec<Application>> {
        let resources = self.list_all::<AppEntity>("/v2/apps").await?;
        Ok(resources.into_iter().map(Into::into).collect())
    }

    async fn list_organizations(&self) -> anyhow::Result<Vec<Organization>> {
        let resources = self.list_all::<OrgEntity>("/v2/organizations").await?;
        Ok(resources.into_iter().map(Into::into).collect())
    }

    async fn list_spaces(&self) -> anyhow::Result<Vec<Space>> {
        let resources = self.list_all::<SpaceEntity>("/v2/spaces").await?;
        Ok(resources.into_iter().map(Into::into).collect())
    }
}
