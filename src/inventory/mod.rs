//! Application inventory: the cached record type and the listings it is resolved from.

pub mod rebuild;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single cached application, with its space and org resolved to names.
///
/// Missing fields deserialize as empty strings so feeds that omit empty
/// values (e.g. `space`/`org` for dangling references) still decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub space: String,
    #[serde(default)]
    pub org: String,
}

/// An application as listed upstream, referencing its space by GUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub guid: String,
    pub name: String,
    pub space_guid: String,
}

/// An organization as listed upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub guid: String,
    pub name: String,
}

/// A space as listed upstream, referencing its organization by GUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub guid: String,
    pub name: String,
    pub org_guid: String,
}

/// Upstream listing service the owner cache rebuilds from.
///
/// Each call returns the complete listing; the three calls are independent
/// and may fail independently.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn list_apps(&self) -> Result<Vec<Application>>;
    async fn list_organizations(&self) -> Result<Vec<Organization>>;
    async fn list_spaces(&self) -> Result<Vec<Space>>;
}
