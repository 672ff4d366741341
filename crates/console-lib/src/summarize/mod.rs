//! On-demand log summarization through a host-provided model
//!
//! The [`Negotiator`] adapts to whatever surface the host exposes: it
//! probes availability, steps down through progressively simpler creation
//! configurations and picks whichever summarize method the instance has.

mod error;
mod host;
mod local;
mod negotiator;

pub use error::{guidance, Diagnostics, SummarizeError, SummarizeFailure};
pub use host::{
    Availability, CreationTier, HostError, ProgressMonitor, SummarizerCapability, SummarizerHost,
    SummarizerInstance, SummarizerOptions, SummaryFormat, SummaryLength, SummaryType,
};
pub use local::LocalModelHost;
pub use negotiator::{
    prepare_content, LogSummary, NegotiationEvent, NegotiationState, Negotiator, Notice,
    PreparedContent, CANDIDATE_METHODS, DEFAULT_TIMEOUT, MAX_INPUT_CHARS, SUMMARY_LOG_LINES,
    TRUNCATION_MARKER,
};
