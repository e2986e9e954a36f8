pub mod app;
pub mod cache;
pub mod cf;
pub mod cli;
pub mod config;
pub mod feed;
pub mod inventory;
pub mod logging;
pub mod refresh;
pub mod services;
pub mod state;
pub mod utils;
pub mod web;
