//! HTTP client for the nabd API

use super::auth::AuthContext;
use super::error::{ApiError, ApiResult, Operation};
use super::ConsoleApi;
use crate::models::{Alert, AutoHealEvent, Container, DataEnvelope, ErrorEnvelope, MetricSample};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// API client for the nabd backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: AuthContext,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str, auth: AuthContext, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL: {}", base_url);
        }

        Ok(Self {
            client,
            base_url,
            auth,
        })
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Exchange an admin token for a session credential and store it
    pub async fn login(&self, token: &str) -> ApiResult<()> {
        let url = self.endpoint(Operation::Login, &["api", "auth", "login"])?;
        let builder = self
            .client
            .request(Method::POST, url)
            .json(&LoginRequest { token });
        let response = self.send(Operation::Login, builder).await?;

        let body: LoginResponse = Self::decode(Operation::Login, response).await?;
        self.auth.store_credential(&body.token).map_err(|e| {
            ApiError::server(Operation::Login, None, Some(format!("{:#}", e)))
        })?;
        debug!(event = "login", "Stored session credential");
        Ok(())
    }

    /// Forget the stored credential
    pub fn logout(&self) -> anyhow::Result<()> {
        self.auth.logout()
    }

    fn endpoint(&self, operation: Operation, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::server(operation, None, Some("Invalid API URL".to_string())))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.auth.bearer() {
            Some(bearer) => builder.header(reqwest::header::AUTHORIZATION, bearer),
            None => builder,
        }
    }

    async fn send(&self, operation: Operation, builder: RequestBuilder) -> ApiResult<Response> {
        let response = builder.send().await.map_err(|e| {
            warn!(operation = operation.as_str(), error = %e, "Request failed");
            ApiError::server(operation, None, None)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // A rejected login is a bad admin token, not an expired session
            if operation == Operation::Login {
                self.auth.discard();
                let envelope = Self::error_envelope(response).await;
                return Err(ApiError::server(operation, Some(status.as_u16()), envelope.error));
            }
            self.auth.expire();
            return Err(ApiError::AuthExpired);
        }

        if !status.is_success() {
            let envelope = Self::error_envelope(response).await;
            debug!(
                operation = operation.as_str(),
                status = status.as_u16(),
                error = ?envelope.error,
                "API error"
            );
            return Err(ApiError::server(operation, Some(status.as_u16()), envelope.error));
        }

        Ok(response)
    }

    async fn error_envelope(response: Response) -> ErrorEnvelope {
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str(&body).unwrap_or_default()
    }

    async fn decode<T: DeserializeOwned>(operation: Operation, response: Response) -> ApiResult<T> {
        response.json().await.map_err(|e| {
            warn!(operation = operation.as_str(), error = %e, "Failed to parse response");
            ApiError::server(operation, None, None)
        })
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        operation: Operation,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> ApiResult<Vec<T>> {
        let url = self.endpoint(operation, segments)?;
        let builder = self.request(Method::GET, url).query(query);
        let response = self.send(operation, builder).await?;
        let envelope: DataEnvelope<T> = Self::decode(operation, response).await?;
        Ok(envelope.data)
    }

    async fn post_empty(&self, operation: Operation, segments: &[&str]) -> ApiResult<()> {
        let url = self.endpoint(operation, segments)?;
        let builder = self.request(Method::POST, url);
        self.send(operation, builder).await?;
        Ok(())
    }
}

#[async_trait]
impl ConsoleApi for ApiClient {
    async fn containers(&self) -> ApiResult<Vec<Container>> {
        self.get_data(Operation::Containers, &["api", "containers"], &[])
            .await
    }

    async fn metrics(&self) -> ApiResult<Vec<MetricSample>> {
        self.get_data(Operation::Metrics, &["api", "metrics"], &[])
            .await
    }

    async fn metrics_history(&self, container_id: &str, hours: u32) -> ApiResult<Vec<MetricSample>> {
        self.get_data(
            Operation::MetricsHistory,
            &["api", "metrics", container_id, "history"],
            &[("hours", hours.to_string())],
        )
        .await
    }

    async fn logs(&self, container: &str, lines: u32) -> ApiResult<Vec<String>> {
        self.get_data(
            Operation::Logs,
            &["api", "logs"],
            &[("container", container.to_string()), ("lines", lines.to_string())],
        )
        .await
    }

    async fn restart_container(&self, name: &str) -> ApiResult<()> {
        self.post_empty(Operation::Restart, &["api", "containers", name, "restart"])
            .await
    }

    async fn autoheal_history(&self, limit: u32) -> ApiResult<Vec<AutoHealEvent>> {
        self.get_data(
            Operation::AutoHealHistory,
            &["api", "autoheal", "history"],
            &[("limit", limit.to_string())],
        )
        .await
    }

    async fn trigger_autoheal(&self) -> ApiResult<()> {
        self.post_empty(Operation::AutoHealTrigger, &["api", "autoheal", "trigger"])
            .await
    }

    async fn alerts(&self) -> ApiResult<Vec<Alert>> {
        self.get_data(Operation::Alerts, &["api", "alerts"], &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::{CredentialStore, MemoryCredentialStore};
    use mockito::Matcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn client_for(server: &mockito::Server, store: Arc<MemoryCredentialStore>) -> ApiClient {
        ApiClient::new(
            &server.url(),
            AuthContext::new(store),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_containers_with_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/containers")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[{"id":"1","name":"web","image":"nginx","state":"running","status":"Up 2 hours"}]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server, Arc::new(MemoryCredentialStore::with_token("abc")));
        let containers = client.containers().await.unwrap();

        mock.assert_async().await;
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "web");
        assert!(containers[0].is_running());
    }

    #[tokio::test]
    async fn test_unauthorized_clears_credential() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/alerts")
            .with_status(401)
            .with_body(r#"{"error":"unauthorized"}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::with_token("stale"));
        let expired = Arc::new(AtomicUsize::new(0));
        let counter = expired.clone();
        let auth = AuthContext::new(store.clone()).on_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let client = ApiClient::new(&server.url(), auth, Duration::from_secs(5)).unwrap();

        let err = client.alerts().await.unwrap_err();
        assert_eq!(err, ApiError::AuthExpired);
        assert_eq!(store.load(), None);
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_envelope_and_default_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/logs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("container".into(), "web".into()),
                Matcher::UrlEncoded("lines".into(), "500".into()),
            ]))
            .with_status(500)
            .with_body(r#"{"error":"docker daemon unreachable"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/autoheal/trigger")
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let client = client_for(&server, Arc::new(MemoryCredentialStore::with_token("t")));

        let err = client.logs("web", 500).await.unwrap_err();
        assert_eq!(err.to_string(), "docker daemon unreachable");

        let err = client.trigger_autoheal().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to trigger auto-heal");
    }

    #[tokio::test]
    async fn test_login_stores_credential_without_bearer() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/auth/login")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(serde_json::json!({"token": "admin"})))
            .with_status(200)
            .with_body(r#"{"token":"session-1"}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::new());
        let client = client_for(&server, store.clone());
        client.login("admin").await.unwrap();

        mock.assert_async().await;
        assert_eq!(store.load(), Some("session-1".to_string()));
    }

    #[tokio::test]
    async fn test_rejected_login_skips_expiry_hook() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/auth/login")
            .with_status(401)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentialStore::with_token("old"));
        let expired = Arc::new(AtomicUsize::new(0));
        let counter = expired.clone();
        let auth = AuthContext::new(store.clone()).on_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let client = ApiClient::new(&server.url(), auth, Duration::from_secs(5)).unwrap();

        let err = client.login("wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");
        assert_eq!(store.load(), None);
        assert_eq!(expired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restart_path_is_encoded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/containers/my%20app/restart")
            .with_status(200)
            .with_body(r#"{"message":"Container restarted successfully"}"#)
            .create_async()
            .await;

        let client = client_for(&server, Arc::new(MemoryCredentialStore::with_token("t")));
        client.restart_container("my app").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_history_query() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/metrics/abc123/history")
            .match_query(Matcher::UrlEncoded("hours".into(), "6".into()))
            .with_status(200)
            .with_body(r#"{"data":null}"#)
            .create_async()
            .await;

        let client = client_for(&server, Arc::new(MemoryCredentialStore::with_token("t")));
        let history = client.metrics_history("abc123", 6).await.unwrap();
        assert!(history.is_empty());
    }
}
