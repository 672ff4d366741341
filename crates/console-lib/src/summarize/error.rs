//! Summarization failures, operator guidance and support diagnostics

use super::host::{HostError, SummarizerHost};
use crate::api::ApiError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SummarizeError {
    #[error("Summarization is not available in this environment")]
    CapabilityMissing,
    #[error("No log content to summarize")]
    NoContent,
    #[error("Failed to fetch logs: {0}")]
    LogFetch(#[from] ApiError),
    /// Every creation tier failed; carries the first (full) tier's failure
    #[error("Failed to create summarizer: {0}")]
    CreationFailed(HostError),
    #[error("Summarizer exposes no summarize, generate or run method")]
    NoSummarizeMethod,
    #[error("Summarization failed: {0}")]
    SummarizeFailed(HostError),
    #[error("Summarization did not finish within {0:?}")]
    TimedOut(Duration),
}

impl SummarizeError {
    /// Stable label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            SummarizeError::CapabilityMissing => "capability_missing",
            SummarizeError::NoContent => "no_content",
            SummarizeError::LogFetch(_) => "log_fetch",
            SummarizeError::CreationFailed(_) => "creation_failed",
            SummarizeError::NoSummarizeMethod => "no_summarize_method",
            SummarizeError::SummarizeFailed(_) => "summarize_failed",
            SummarizeError::TimedOut(_) => "timed_out",
        }
    }

    fn host_error(&self) -> Option<&HostError> {
        match self {
            SummarizeError::CreationFailed(e) | SummarizeError::SummarizeFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Operator-facing text for a failure. Known host failures get
/// remediation guidance; anything else is passed through verbatim.
pub fn guidance(error: &SummarizeError) -> String {
    let Some(host) = error.host_error() else {
        return error.to_string();
    };

    match host.name.as_str() {
        "NotSupportedError" => {
            return "The on-device model does not support this request. Check that the \
                    summarization model is enabled and supports the requested options."
                .to_string()
        }
        "InvalidStateError" => {
            return "The summarization model is not ready. Wait for the model download \
                    to finish, then try again."
                .to_string()
        }
        "AbortError" => return "The summarization request was aborted. Try again.".to_string(),
        _ => {}
    }

    if host.message.to_lowercase().contains("memory") || host.message.contains("RAM") {
        return "The device does not have enough memory to run the summarization model. \
                Close other applications and try again."
            .to_string();
    }

    error.to_string()
}

/// Environment facts attached to every surfaced failure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub user_agent: String,
    pub has_capability: bool,
    pub has_availability: bool,
    pub has_capabilities: bool,
    /// Method names found on the created instance, if one was created
    pub methods: Vec<String>,
}

impl Diagnostics {
    pub fn collect(host: &dyn SummarizerHost) -> Self {
        let capability = host.capability();
        Self {
            user_agent: host.user_agent(),
            has_capability: capability.is_some(),
            has_availability: capability.as_ref().is_some_and(|c| c.has_availability()),
            has_capabilities: capability.as_ref().is_some_and(|c| c.has_capabilities()),
            methods: Vec::new(),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let methods = if self.methods.is_empty() {
            "none".to_string()
        } else {
            self.methods.join(", ")
        };
        write!(
            f,
            "user agent: {}; summarizer: {}; availability(): {}; capabilities(): {}; methods: {}",
            self.user_agent, self.has_capability, self.has_availability, self.has_capabilities, methods
        )
    }
}

/// A terminal summarization failure as surfaced to the operator
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}\n\nDiagnostics: {diagnostics}", guidance(.error))]
pub struct SummarizeFailure {
    pub error: SummarizeError,
    pub diagnostics: Diagnostics,
}

impl SummarizeFailure {
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostics() -> Diagnostics {
        Diagnostics {
            user_agent: "nabd-console/0.1.0".to_string(),
            has_capability: true,
            has_availability: false,
            has_capabilities: true,
            methods: vec!["generate".to_string()],
        }
    }

    #[test]
    fn test_known_names_get_guidance() {
        let err = SummarizeError::CreationFailed(HostError::new("InvalidStateError", "not ready"));
        assert!(guidance(&err).contains("model download"));

        let err = SummarizeError::SummarizeFailed(HostError::new("AbortError", "stopped"));
        assert!(guidance(&err).contains("aborted"));

        let err = SummarizeError::CreationFailed(HostError::new("NotSupportedError", "nope"));
        assert!(guidance(&err).contains("does not support"));
    }

    #[test]
    fn test_memory_messages_get_guidance() {
        let err = SummarizeError::SummarizeFailed(HostError::new("UnknownError", "Out of Memory"));
        assert!(guidance(&err).contains("enough memory"));

        let err = SummarizeError::CreationFailed(HostError::new("OperationError", "needs 4GB RAM"));
        assert!(guidance(&err).contains("enough memory"));
    }

    #[test]
    fn test_unknown_failures_pass_through() {
        let err = SummarizeError::SummarizeFailed(HostError::new("OperationError", "tokenizer crashed"));
        assert_eq!(guidance(&err), "Summarization failed: OperationError: tokenizer crashed");
        assert_eq!(guidance(&SummarizeError::NoContent), "No log content to summarize");
    }

    #[test]
    fn test_failure_always_carries_diagnostics() {
        let failure = SummarizeFailure {
            error: SummarizeError::NoSummarizeMethod,
            diagnostics: diagnostics(),
        };
        let text = failure.to_string();
        assert!(text.starts_with("Summarizer exposes no summarize"));
        assert!(text.contains("user agent: nabd-console/0.1.0"));
        assert!(text.contains("capabilities(): true"));
        assert!(text.contains("methods: generate"));
        assert_eq!(failure.kind(), "no_summarize_method");
    }
}
