//! Cloud Foundry API client.

pub mod api;
pub mod errors;
pub mod json;
pub mod middleware;
pub mod models;

pub use api::{CfApi, CfApiConfig};
pub use errors::CfApiError;
