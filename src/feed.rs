//! App info feed: an endpoint serving the already-resolved inventory as a
//! JSON array of [`AppInfo`], as exposed by another instance's `/rest/apps/`.

use crate::cf::json::parse_json_with_context;
use crate::cf::middleware::http_client;
use crate::inventory::AppInfo;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use url::Url;

/// Source of complete, pre-resolved inventory listings.
#[async_trait]
pub trait AppFeed: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<AppInfo>>;
}

/// Fetches the feed with a plain HTTP GET.
pub struct HttpAppFeed {
    http: ClientWithMiddleware,
    url: Url,
}

impl HttpAppFeed {
    pub fn new(url: Url, skip_ssl: bool) -> Result<Self> {
        Ok(Self {
            http: http_client(skip_ssl)?,
            url,
        })
    }
}

#[async_trait]
impl AppFeed for HttpAppFeed {
    async fn fetch_all(&self) -> Result<Vec<AppInfo>> {
        let response = self
            .http
            .get(self.url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Unexpected status {} from {}", status.as_u16(), self.url);
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read body from {}", self.url))?;
        parse_json_with_context(&body)
            .with_context(|| format!("Failed to parse feed from {}", self.url))
    }
}
