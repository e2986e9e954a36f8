//! Wire types for the Cloud Foundry v2 API.

use crate::inventory::{Application, Organization, Space};
use serde::Deserialize;

/// `GET /v2/info`
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    pub token_endpoint: String,
}

/// OAuth2 token grant response from UAA.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// One page of a paginated v2 listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<E> {
    #[serde(default)]
    pub total_results: Option<u64>,
    pub next_url: Option<String>,
    #[serde(default = "Vec::new")]
    pub resources: Vec<Resource<E>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource<E> {
    pub metadata: Metadata,
    pub entity: E,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub guid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppEntity {
    pub name: String,
    #[serde(default)]
    pub space_guid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrgEntity {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpaceEntity {
    pub name: String,
    #[serde(default)]
    pub organization_guid: String,
}

impl From<Resource<AppEntity>> for Application {
    fn from(resource: Resource<AppEntity>) -> Self {
        Self {
            guid: resource.metadata.guid,
            name: resource.entity.name,
            space_guid: resource.entity.space_guid,
        }
    }
}

impl From<Resource<OrgEntity>> for Organization {
    fn from(resource: Resource<OrgEntity>) -> Self {
        Self {
            guid: resource.metadata.guid,
            name: resource.entity.name,
        }
    }
}

impl From<Resource<SpaceEntity>> for Space {
    fn from(resource: Resource<SpaceEntity>) -> Self {
        Self {
            guid: resource.metadata.guid,
            name: resource.entity.name,
            org_guid: resource.entity.organization_guid,
        }
    }
}
