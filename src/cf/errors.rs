//! Error types for the Cloud Foundry API client.

#[derive(Debug, thiserror::Error)]
pub enum CfApiError {
    #[error("Cloud Foundry rejected the access token")]
    Unauthorized,
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Failed to parse response from {url}")]
    ParseFailed {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    RequestFailed(#[from] anyhow::Error),
}

impl From<reqwest_middleware::Error> for CfApiError {
    fn from(err: reqwest_middleware::Error) -> Self {
        CfApiError::RequestFailed(err.into())
    }
}

impl From<reqwest::Error> for CfApiError {
    fn from(err: reqwest::Error) -> Self {
        CfApiError::RequestFailed(err.into())
    }
}
