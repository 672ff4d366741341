use super::error::{Diagnostics, SummarizeError, SummarizeFailure};
use super::host::{
    Availability, CreationTier, HostError, ProgressMonitor, SummarizerCapability, SummarizerHost,
    SummarizerInstance,
};
use crate::api::ConsoleApi;
use crate::observability::{ConsoleMetrics, StructuredLogger};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// Log lines fetched for one summary
pub const SUMMARY_LOG_LINES: u32 = 500;

/// Characters kept from the end of the joined log text
pub const MAX_INPUT_CHARS: usize = 10_000;

pub const TRUNCATION_MARKER: &str = "[... earlier log output truncated ...]\n";

/// Instance method names tried in order
pub const CANDIDATE_METHODS: [&str; 3] = ["summarize", "generate", "run"];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum NegotiationState {
    Idle,
    CheckingAvailability,
    Unavailable,
    Downloading,
    Ready,
    Creating(CreationTier),
    Created,
    Summarizing(String),
    Done,
    Failed,
}

impl std::fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationState::Idle => write!(f, "idle"),
            NegotiationState::CheckingAvailability => write!(f, "checking_availability"),
            NegotiationState::Unavailable => write!(f, "unavailable"),
            NegotiationState::Downloading => write!(f, "downloading"),
            NegotiationState::Ready => write!(f, "ready"),
            NegotiationState::Creating(tier) => write!(f, "creating({})", tier),
            NegotiationState::Created => write!(f, "created"),
            NegotiationState::Summarizing(method) => write!(f, "summarizing({})", method),
            NegotiationState::Done => write!(f, "done"),
            NegotiationState::Failed => write!(f, "failed"),
        }
    }
}

/// Advisory messages raised while probing availability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    ModelUnavailable,
    DownloadStarting,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::ModelUnavailable => {
                "The summarization model reports itself unavailable; attempting anyway"
            }
            Notice::DownloadStarting => {
                "The summarization model must be downloaded first; this can take a while"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationEvent {
    State(NegotiationState),
    /// Download/creation progress, 0-100
    Progress(u8),
    Notice(Notice),
}

/// Log text ready for the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedContent {
    pub text: String,
    pub line_count: usize,
    pub truncated: bool,
}

/// Join the lines and keep the trailing window of text.
///
/// Returns `None` when there is nothing but whitespace.
pub fn prepare_content(lines: &[String]) -> Option<PreparedContent> {
    let joined = lines.join("\n");
    if joined.trim().is_empty() {
        return None;
    }

    let chars = joined.chars().count();
    if chars <= MAX_INPUT_CHARS {
        return Some(PreparedContent {
            text: joined,
            line_count: lines.len(),
            truncated: false,
        });
    }

    let tail: String = joined.chars().skip(chars - MAX_INPUT_CHARS).collect();
    Some(PreparedContent {
        text: format!("{}{}", TRUNCATION_MARKER, tail),
        line_count: lines.len(),
        truncated: true,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    pub container_name: String,
    pub summary: String,
    /// Lines fetched, before truncation
    pub line_count: usize,
    pub truncated: bool,
    pub tier: CreationTier,
    pub method: String,
    pub completed_at: DateTime<Utc>,
}

struct Negotiated {
    tier: CreationTier,
    method: String,
    summary: String,
}

/// Drives one summary request against whatever the host provides.
///
/// Each call to [`Negotiator::summarize`] creates and releases its own
/// summarizer instance.
pub struct Negotiator {
    host: Arc<dyn SummarizerHost>,
    api: Arc<dyn ConsoleApi>,
    timeout: Option<Duration>,
    events: Option<mpsc::UnboundedSender<NegotiationEvent>>,
    logger: StructuredLogger,
    metrics: ConsoleMetrics,
}

impl Negotiator {
    pub fn new(host: Arc<dyn SummarizerHost>, api: Arc<dyn ConsoleApi>) -> Self {
        Self {
            host,
            api,
            timeout: Some(DEFAULT_TIMEOUT),
            events: None,
            logger: StructuredLogger::new("summarizer"),
            metrics: ConsoleMetrics::new(),
        }
    }

    /// Overall deadline for creation plus invocation; `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stream state transitions, progress and notices to the returned receiver
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<NegotiationEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    pub async fn summarize(&self, container: &str) -> Result<LogSummary, SummarizeFailure> {
        let mut diagnostics = Diagnostics::collect(self.host.as_ref());
        self.set_state(container, NegotiationState::Idle);

        match self.run(container, &mut diagnostics).await {
            Ok(summary) => {
                self.set_state(container, NegotiationState::Done);
                self.metrics.inc_summarization("done");
                self.logger.log_summarize_outcome(container, "done", None);
                Ok(summary)
            }
            Err(error) => {
                self.set_state(container, NegotiationState::Failed);
                self.metrics.inc_summarization(error.kind());
                self.logger
                    .log_summarize_outcome(container, error.kind(), Some(&error.to_string()));
                Err(SummarizeFailure { error, diagnostics })
            }
        }
    }

    async fn run(
        &self,
        container: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<LogSummary, SummarizeError> {
        let capability = self
            .host
            .capability()
            .ok_or(SummarizeError::CapabilityMissing)?;

        let lines = self.api.logs(container, SUMMARY_LOG_LINES).await?;
        let content = prepare_content(&lines).ok_or(SummarizeError::NoContent)?;

        // Lives outside the deadline so the instance is released even on expiry
        let slot: Mutex<Option<Arc<dyn SummarizerInstance>>> = Mutex::new(None);

        let negotiation =
            self.negotiate(capability.as_ref(), container, &content.text, &slot, diagnostics);
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, negotiation)
                .await
                .unwrap_or_else(|_| Err(SummarizeError::TimedOut(limit))),
            None => negotiation.await,
        };

        let instance = slot.into_inner().unwrap_or_else(|p| p.into_inner());
        if let Some(instance) = instance {
            if instance.can_destroy() {
                instance.destroy().await;
            }
        }

        let negotiated = result?;
        Ok(LogSummary {
            container_name: container.to_string(),
            summary: negotiated.summary,
            line_count: content.line_count,
            truncated: content.truncated,
            tier: negotiated.tier,
            method: negotiated.method,
            completed_at: Utc::now(),
        })
    }

    async fn negotiate(
        &self,
        capability: &dyn SummarizerCapability,
        container: &str,
        text: &str,
        slot: &Mutex<Option<Arc<dyn SummarizerInstance>>>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Negotiated, SummarizeError> {
        self.probe(capability, container).await;

        let (tier, instance) = self.create(capability, container).await?;
        let instance: Arc<dyn SummarizerInstance> = Arc::from(instance);
        if let Ok(mut held) = slot.lock() {
            *held = Some(instance.clone());
        }

        diagnostics.methods = instance.methods();
        let method = CANDIDATE_METHODS
            .iter()
            .find(|candidate| diagnostics.methods.iter().any(|m| m == *candidate))
            .ok_or(SummarizeError::NoSummarizeMethod)?;

        self.set_state(container, NegotiationState::Summarizing(method.to_string()));
        let summary = instance
            .call(method, text)
            .await
            .map_err(SummarizeError::SummarizeFailed)?;

        Ok(Negotiated {
            tier,
            method: method.to_string(),
            summary,
        })
    }

    /// Query whichever availability probe the host has. Never fails the
    /// request: an unavailable model is still attempted.
    async fn probe(&self, capability: &dyn SummarizerCapability, container: &str) -> Availability {
        self.set_state(container, NegotiationState::CheckingAvailability);

        let raw = if capability.has_availability() {
            Some(capability.availability().await)
        } else if capability.has_capabilities() {
            Some(capability.capabilities().await)
        } else {
            None
        };

        let availability = match raw {
            None => Availability::Available,
            Some(Ok(raw)) => Availability::parse(&raw),
            Some(Err(e)) => {
                warn!(container = %container, error = %e, "Availability probe failed");
                Availability::Available
            }
        };

        match availability {
            Availability::Unavailable => {
                self.set_state(container, NegotiationState::Unavailable);
                self.emit(NegotiationEvent::Notice(Notice::ModelUnavailable));
            }
            Availability::Downloadable | Availability::Downloading => {
                self.set_state(container, NegotiationState::Downloading);
                self.emit(NegotiationEvent::Notice(Notice::DownloadStarting));
            }
            Availability::Available => self.set_state(container, NegotiationState::Ready),
        }
        availability
    }

    async fn create(
        &self,
        capability: &dyn SummarizerCapability,
        container: &str,
    ) -> Result<(CreationTier, Box<dyn SummarizerInstance>), SummarizeError> {
        let mut first_failure: Option<HostError> = None;

        for tier in CreationTier::ALL {
            self.set_state(container, NegotiationState::Creating(tier));
            match capability.create(tier.options(container, self.monitor())).await {
                Ok(instance) => {
                    self.set_state(container, NegotiationState::Created);
                    return Ok((tier, instance));
                }
                Err(e) => {
                    warn!(container = %container, tier = %tier, error = %e, "Summarizer creation failed");
                    first_failure.get_or_insert(e);
                }
            }
        }

        Err(SummarizeError::CreationFailed(first_failure.unwrap_or_else(|| {
            HostError::new("UnknownError", "no creation tier was attempted")
        })))
    }

    fn monitor(&self) -> ProgressMonitor {
        let events = self.events.clone();
        ProgressMonitor::new(move |percent| {
            if let Some(tx) = &events {
                let _ = tx.send(NegotiationEvent::Progress(percent));
            }
        })
    }

    fn set_state(&self, container: &str, state: NegotiationState) {
        self.logger.log_summarize_state(container, &state.to_string());
        self.emit(NegotiationEvent::State(state));
    }

    fn emit(&self, event: NegotiationEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
