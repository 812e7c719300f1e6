pub mod app;
pub mod config;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod search;
pub mod state;
pub mod store;
