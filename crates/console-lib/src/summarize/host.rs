//! Adapter traits over a host-provided summarization capability
//!
//! Hosts differ in which probes they expose and which method names their
//! summarizer instances answer to, so every optional part of the surface
//! is queried before it is used.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Failure raised by the host, with the host's error name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{name}: {message}")]
pub struct HostError {
    pub name: String,
    pub message: String,
}

impl HostError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Model availability as reported by the host's probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Downloadable,
    Downloading,
    Unavailable,
}

impl Availability {
    /// Map the raw string of either probe flavour. Unknown values are
    /// treated as available.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "unavailable" | "no" => Availability::Unavailable,
            "downloadable" | "after-download" => Availability::Downloadable,
            "downloading" => Availability::Downloading,
            _ => Availability::Available,
        }
    }

    pub fn needs_download(&self) -> bool {
        matches!(self, Availability::Downloadable | Availability::Downloading)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryType {
    #[serde(rename = "key-points")]
    KeyPoints,
    #[serde(rename = "tl;dr")]
    Tldr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryFormat {
    #[serde(rename = "plain-text")]
    PlainText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
}

/// Receives download/creation progress from the host
#[derive(Clone)]
pub struct ProgressMonitor {
    callback: Arc<dyn Fn(u8) + Send + Sync>,
}

impl ProgressMonitor {
    pub fn new(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Report progress as a fraction in `0.0..=1.0`
    pub fn report(&self, loaded: f64) {
        let percent = (loaded.clamp(0.0, 1.0) * 100.0).round() as u8;
        (self.callback)(percent);
    }
}

impl std::fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressMonitor").finish_non_exhaustive()
    }
}

/// Options passed to the host when creating a summarizer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizerOptions {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub summary_type: Option<SummaryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<SummaryFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<SummaryLength>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_context: Option<String>,
    #[serde(skip)]
    pub monitor: ProgressMonitor,
}

/// Creation configurations, most preferred first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CreationTier {
    Full,
    Reduced,
    Minimal,
}

impl CreationTier {
    pub const ALL: [CreationTier; 3] = [CreationTier::Full, CreationTier::Reduced, CreationTier::Minimal];

    pub fn options(&self, container: &str, monitor: ProgressMonitor) -> SummarizerOptions {
        match self {
            CreationTier::Full => SummarizerOptions {
                summary_type: Some(SummaryType::KeyPoints),
                format: Some(SummaryFormat::PlainText),
                length: Some(SummaryLength::Short),
                shared_context: Some(format!(
                    "Log output from the Docker container \"{}\". Focus on errors, warnings and restarts.",
                    container
                )),
                monitor,
            },
            CreationTier::Reduced => SummarizerOptions {
                summary_type: Some(SummaryType::Tldr),
                format: Some(SummaryFormat::PlainText),
                length: Some(SummaryLength::Short),
                shared_context: None,
                monitor,
            },
            CreationTier::Minimal => SummarizerOptions {
                summary_type: None,
                format: None,
                length: None,
                shared_context: None,
                monitor,
            },
        }
    }
}

impl std::fmt::Display for CreationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreationTier::Full => write!(f, "full"),
            CreationTier::Reduced => write!(f, "reduced"),
            CreationTier::Minimal => write!(f, "minimal"),
        }
    }
}

/// Environment that may expose a summarization capability
pub trait SummarizerHost: Send + Sync {
    /// The capability object, or `None` when the host has none
    fn capability(&self) -> Option<Arc<dyn SummarizerCapability>>;

    /// Identification string reported in diagnostics
    fn user_agent(&self) -> String;
}

/// Factory for summarizer instances plus the optional availability probes
#[async_trait]
pub trait SummarizerCapability: Send + Sync {
    /// Whether the versioned availability query exists
    fn has_availability(&self) -> bool {
        false
    }

    async fn availability(&self) -> Result<String, HostError> {
        Err(HostError::new("NotSupportedError", "availability() is not provided"))
    }

    /// Whether the legacy capabilities query exists
    fn has_capabilities(&self) -> bool {
        false
    }

    async fn capabilities(&self) -> Result<String, HostError> {
        Err(HostError::new("NotSupportedError", "capabilities() is not provided"))
    }

    async fn create(&self, options: SummarizerOptions) -> Result<Box<dyn SummarizerInstance>, HostError>;
}

/// A created summarizer; its callable method names vary by host
#[async_trait]
pub trait SummarizerInstance: Send + Sync {
    /// Method names this instance answers to
    fn methods(&self) -> Vec<String>;

    async fn call(&self, method: &str, input: &str) -> Result<String, HostError>;

    fn can_destroy(&self) -> bool {
        false
    }

    async fn destroy(&self) {}
}
