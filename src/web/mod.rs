//! HTTP read-request server for the inventory cache.

pub mod apps;
pub mod middleware;
pub mod routes;
pub mod status;

pub use routes::*;
