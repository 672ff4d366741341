//! Access to the nabd HTTP API
//!
//! This module provides:
//! - The [`ConsoleApi`] trait consumed by views, remediation and summaries
//! - A reqwest-backed [`ApiClient`] with bearer credentials
//! - Credential stores and the [`AuthContext`] that handles expiry

mod auth;
mod client;
mod error;

pub use auth::{
    AuthContext, CredentialStore, FileCredentialStore, MemoryCredentialStore, CREDENTIAL_KEY,
};
pub use client::ApiClient;
pub use error::{ApiError, ApiResult, Operation};

use crate::models::{Alert, AutoHealEvent, Container, MetricSample};
use async_trait::async_trait;

/// Endpoints of the nabd API used by the console
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    /// `GET /api/containers`
    async fn containers(&self) -> ApiResult<Vec<Container>>;

    /// `GET /api/metrics`, current snapshot for all containers
    async fn metrics(&self) -> ApiResult<Vec<MetricSample>>;

    /// `GET /api/metrics/{id}/history?hours=N`
    async fn metrics_history(&self, container_id: &str, hours: u32) -> ApiResult<Vec<MetricSample>>;

    /// `GET /api/logs?container=NAME&lines=N`
    async fn logs(&self, container: &str, lines: u32) -> ApiResult<Vec<String>>;

    /// `POST /api/containers/{name}/restart`
    async fn restart_container(&self, name: &str) -> ApiResult<()>;

    /// `GET /api/autoheal/history?limit=N`, most recent first
    async fn autoheal_history(&self, limit: u32) -> ApiResult<Vec<AutoHealEvent>>;

    /// `POST /api/autoheal/trigger`
    async fn trigger_autoheal(&self) -> ApiResult<()>;

    /// `GET /api/alerts`
    async fn alerts(&self) -> ApiResult<Vec<Alert>>;
}
