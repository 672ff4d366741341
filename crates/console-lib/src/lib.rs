//! Core library for the nabd operations console
//!
//! This crate provides the core functionality for:
//! - Authenticated access to the nabd API
//! - Interval polling of dashboard, logs and auto-heal feeds
//! - Reconciling containers with their metrics
//! - Remediation requests with a delayed follow-up refresh
//! - Chart-ready metric history
//! - On-demand log summarization through a local model host

pub mod api;
pub mod config;
pub mod models;
pub mod observability;
pub mod poller;
pub mod reconcile;
pub mod remediation;
pub mod summarize;
pub mod timeseries;
pub mod views;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, ApiResult, AuthContext, ConsoleApi};
pub use config::ConsoleConfig;
pub use models::*;
pub use observability::{ConsoleMetrics, StructuredLogger};
