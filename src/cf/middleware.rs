//! HTTP client construction and request logging for upstream calls.

use anyhow::{Context, Result};
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::utils::fmt_duration;

/// Per-request timeout for every upstream call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Logs method, path, status and latency of every outgoing request.
pub struct TransparentMiddleware;

#[async_trait::async_trait]
impl Middleware for TransparentMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let path = req.url().path().to_owned();
        let start = Instant::now();
        trace!(method = %method, path = %path, "upstream request");

        let result = next.run(req, extensions).await;
        let duration = fmt_duration(start.elapsed());

        match &result {
            Ok(response) if response.status().is_success() => {
                debug!(method = %method, path = %path, status = response.status().as_u16(), duration, "upstream response");
            }
            Ok(response) => {
                warn!(method = %method, path = %path, status = response.status().as_u16(), duration, "upstream error response");
            }
            Err(e) => {
                warn!(method = %method, path = %path, error = %e, duration, "upstream request failed");
            }
        }
        result
    }
}

/// Build the shared upstream client. `skip_ssl` disables certificate validation.
pub fn http_client(skip_ssl: bool) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("applister/", env!("CARGO_PKG_VERSION")))
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(skip_ssl)
        .build()
        .context("Failed to build HTTP client")?;

    if skip_ssl {
        warn!("TLS certificate validation is disabled for upstream requests");
    }

    Ok(ClientBuilder::new(client)
        .with(TransparentMiddleware)
        .build())
}
