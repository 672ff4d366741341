//! Summarization host backed by a local model runtime over HTTP

use super::host::{HostError, SummarizerCapability, SummarizerHost, SummarizerInstance, SummarizerOptions};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    availability: String,
}

#[derive(Debug, Deserialize)]
struct CapabilitiesResponse {
    available: String,
}

/// Creation and status body. A runtime still fetching weights answers
/// `ready: false` with a `progress` fraction.
#[derive(Debug, Deserialize)]
struct SummarizerStatus {
    id: String,
    #[serde(default)]
    methods: Vec<String>,
    #[serde(default = "ready_default")]
    ready: bool,
    #[serde(default)]
    progress: Option<f64>,
}

fn ready_default() -> bool {
    true
}

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    output: String,
}

#[derive(Debug, Default, Deserialize)]
struct HostErrorBody {
    name: Option<String>,
    message: Option<String>,
}

/// Host whose capability is a local model runtime, if one is configured
pub struct LocalModelHost {
    capability: Option<Arc<LocalCapability>>,
}

impl LocalModelHost {
    /// `endpoint` of `None` yields a host with no capability
    pub fn new(endpoint: Option<&str>, timeout: Duration) -> anyhow::Result<Self> {
        let Some(endpoint) = endpoint else {
            return Ok(Self { capability: None });
        };

        let base = Url::parse(endpoint).context("Invalid summarizer endpoint")?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Invalid summarizer endpoint: {}", base);
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            capability: Some(Arc::new(LocalCapability { client, base })),
        })
    }
}

impl SummarizerHost for LocalModelHost {
    fn capability(&self) -> Option<Arc<dyn SummarizerCapability>> {
        self.capability
            .clone()
            .map(|c| c as Arc<dyn SummarizerCapability>)
    }

    fn user_agent(&self) -> String {
        format!(
            "nabd-console/{} ({}; {})",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }
}

struct LocalCapability {
    client: Client,
    base: Url,
}

impl LocalCapability {
    fn endpoint(&self, segments: &[&str]) -> Result<Url, HostError> {
        endpoint(&self.base, segments)
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, HostError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| HostError::new("NotSupportedError", "Invalid summarizer endpoint"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn send(builder: reqwest::RequestBuilder) -> Result<Response, HostError> {
    let response = builder.send().await.map_err(|e| {
        warn!(error = %e, "Summarizer request failed");
        let name = if e.is_timeout() { "AbortError" } else { "NetworkError" };
        HostError::new(name, e.to_string())
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: HostErrorBody = serde_json::from_str(&body).unwrap_or_default();
    debug!(status = status.as_u16(), error = ?parsed.message, "Summarizer error");
    Err(HostError::new(
        parsed.name.unwrap_or_else(|| "OperationError".to_string()),
        parsed
            .message
            .unwrap_or_else(|| format!("summarizer returned HTTP {}", status.as_u16())),
    ))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, HostError> {
    response
        .json()
        .await
        .map_err(|e| HostError::new("OperationError", format!("malformed summarizer response: {}", e)))
}

#[async_trait]
impl SummarizerCapability for LocalCapability {
    fn has_availability(&self) -> bool {
        true
    }

    async fn availability(&self) -> Result<String, HostError> {
        let url = self.endpoint(&["availability"])?;
        let response = send(self.client.request(Method::GET, url)).await?;
        Ok(decode::<AvailabilityResponse>(response).await?.availability)
    }

    fn has_capabilities(&self) -> bool {
        true
    }

    async fn capabilities(&self) -> Result<String, HostError> {
        let url = self.endpoint(&["capabilities"])?;
        let response = send(self.client.request(Method::GET, url)).await?;
        Ok(decode::<CapabilitiesResponse>(response).await?.available)
    }

    /// Creates the summarizer, polling its status while the runtime is
    /// still downloading and forwarding each progress value
    async fn create(&self, options: SummarizerOptions) -> Result<Box<dyn SummarizerInstance>, HostError> {
        let url = self.endpoint(&["summarizers"])?;
        options.monitor.report(0.0);
        let response = send(self.client.request(Method::POST, url).json(&options)).await?;
        let mut created: SummarizerStatus = decode(response).await?;

        while !created.ready {
            if let Some(progress) = created.progress {
                options.monitor.report(progress);
            }
            tokio::time::sleep(STATUS_POLL_INTERVAL).await;
            let url = self.endpoint(&["summarizers", created.id.as_str()])?;
            let response = send(self.client.request(Method::GET, url)).await?;
            created = decode(response).await?;
        }
        options.monitor.report(1.0);

        Ok(Box::new(LocalInstance {
            client: self.client.clone(),
            base: self.base.clone(),
            id: created.id,
            methods: created.methods,
        }))
    }
}

struct LocalInstance {
    client: Client,
    base: Url,
    id: String,
    methods: Vec<String>,
}

#[async_trait]
impl SummarizerInstance for LocalInstance {
    fn methods(&self) -> Vec<String> {
        self.methods.clone()
    }

    async fn call(&self, method: &str, input: &str) -> Result<String, HostError> {
        let url = endpoint(&self.base, &["summarizers", self.id.as_str(), method])?;
        let response = send(
            self.client
                .request(Method::POST, url)
                .json(&InvokeRequest { input }),
        )
        .await?;
        Ok(decode::<InvokeResponse>(response).await?.output)
    }

    fn can_destroy(&self) -> bool {
        true
    }

    async fn destroy(&self) {
        let result = match endpoint(&self.base, &["summarizers", self.id.as_str()]) {
            Ok(url) => send(self.client.request(Method::DELETE, url)).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(summarizer = %self.id, error = %e, "Failed to release summarizer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::host::{CreationTier, ProgressMonitor};
    use mockito::Matcher;

    fn host_for(server: &mockito::Server) -> LocalModelHost {
        LocalModelHost::new(Some(server.url().as_str()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_without_endpoint_has_no_capability() {
        let host = LocalModelHost::new(None, Duration::from_secs(5)).unwrap();
        assert!(host.capability().is_none());
        assert!(host.user_agent().starts_with("nabd-console/"));
        assert!(LocalModelHost::new(Some("mailto:x@y"), Duration::from_secs(5)).is_err());
    }

    #[tokio::test]
    async fn test_probes() {
        let mut server = mockito::Server::new_async().await;
        let _availability = server
            .mock("GET", "/availability")
            .with_body(r#"{"availability":"downloadable"}"#)
            .create_async()
            .await;
        let _capabilities = server
            .mock("GET", "/capabilities")
            .with_body(r#"{"available":"readily"}"#)
            .create_async()
            .await;

        let capability = host_for(&server).capability().unwrap();
        assert!(capability.has_availability());
        assert_eq!(capability.availability().await.unwrap(), "downloadable");
        assert_eq!(capability.capabilities().await.unwrap(), "readily");
    }

    #[tokio::test]
    async fn test_create_call_destroy() {
        let mut server = mockito::Server::new_async().await;
        let create = server
            .mock("POST", "/summarizers")
            .match_body(Matcher::PartialJsonString(r#"{"type":"key-points"}"#.to_string()))
            .with_body(r#"{"id":"s1","methods":["summarize"]}"#)
            .create_async()
            .await;
        let call = server
            .mock("POST", "/summarizers/s1/summarize")
            .match_body(Matcher::Json(serde_json::json!({"input": "log text"})))
            .with_body(r#"{"output":"summary"}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/summarizers/s1")
            .with_status(204)
            .create_async()
            .await;

        let capability = host_for(&server).capability().unwrap();
        let instance = capability
            .create(CreationTier::Full.options("web", ProgressMonitor::noop()))
            .await
            .unwrap();
        assert_eq!(instance.methods(), vec!["summarize".to_string()]);
        assert_eq!(instance.call("summarize", "log text").await.unwrap(), "summary");
        instance.destroy().await;

        create.assert_async().await;
        call.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_reports_download_progress() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/summarizers")
            .with_body(r#"{"id":"s2","ready":false,"progress":0.25}"#)
            .create_async()
            .await;
        let status = server
            .mock("GET", "/summarizers/s2")
            .with_body(r#"{"id":"s2","ready":true,"methods":["summarize"]}"#)
            .create_async()
            .await;

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let monitor = ProgressMonitor::new(move |p| sink.lock().unwrap().push(p));

        let capability = host_for(&server).capability().unwrap();
        let instance = capability
            .create(CreationTier::Full.options("web", monitor))
            .await
            .unwrap();

        status.assert_async().await;
        assert_eq!(instance.methods(), vec!["summarize".to_string()]);
        assert_eq!(*seen.lock().unwrap(), vec![0, 25, 100]);
    }

    #[tokio::test]
    async fn test_host_error_body_is_mapped() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/summarizers")
            .with_status(400)
            .with_body(r#"{"name":"NotSupportedError","message":"sharedContext unsupported"}"#)
            .create_async()
            .await;

        let capability = host_for(&server).capability().unwrap();
        let err = capability
            .create(CreationTier::Full.options("web", ProgressMonitor::noop()))
            .await
            .err()
            .unwrap();
        assert_eq!(err, HostError::new("NotSupportedError", "sharedContext unsupported"));
    }

    #[tokio::test]
    async fn test_error_without_body_gets_status() {
        let mut server = mockito::Server::new_async().await;
        let _availability = server
            .mock("GET", "/availability")
            .with_status(503)
            .create_async()
            .await;

        let capability = host_for(&server).capability().unwrap();
        let err = capability.availability().await.unwrap_err();
        assert_eq!(err.name, "OperationError");
        assert_eq!(err.message, "summarizer returned HTTP 503");
    }
}
