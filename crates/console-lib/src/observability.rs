//! Observability infrastructure for the console
//!
//! Provides:
//! - Prometheus metrics (poll ticks, feed failures, tick latency,
//!   remediation requests, summarization outcomes)
//! - Structured logging with tracing

use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Histogram buckets for tick latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ConsoleMetricsInner> = OnceLock::new();

struct ConsoleMetricsInner {
    poll_ticks: IntCounterVec,
    feed_failures: IntCounterVec,
    tick_latency_seconds: HistogramVec,
    remediation_requests: IntCounterVec,
    summarizations: IntCounterVec,
}

impl ConsoleMetricsInner {
    fn new() -> Self {
        Self {
            poll_ticks: register_int_counter_vec!(
                "nabd_console_poll_ticks_total",
                "Poll ticks applied to a view",
                &["view"]
            )
            .expect("Failed to register poll_ticks_total"),

            feed_failures: register_int_counter_vec!(
                "nabd_console_feed_failures_total",
                "Feed fetches that failed and kept their last-known-good data",
                &["view", "feed"]
            )
            .expect("Failed to register feed_failures_total"),

            tick_latency_seconds: register_histogram_vec!(
                "nabd_console_tick_latency_seconds",
                "Time spent fetching all feeds of one tick",
                &["view"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            remediation_requests: register_int_counter_vec!(
                "nabd_console_remediation_requests_total",
                "Remediation requests issued by the operator",
                &["action", "outcome"]
            )
            .expect("Failed to register remediation_requests_total"),

            summarizations: register_int_counter_vec!(
                "nabd_console_summarizations_total",
                "Log summarization attempts by terminal outcome",
                &["outcome"]
            )
            .expect("Failed to register summarizations_total"),
        }
    }
}

/// Console metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ConsoleMetrics {
    _private: (),
}

impl Default for ConsoleMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ConsoleMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ConsoleMetricsInner {
        GLOBAL_METRICS.get_or_init(ConsoleMetricsInner::new)
    }

    /// Record an applied tick and how long its fetches took
    pub fn observe_tick(&self, view: &str, elapsed: Duration) {
        let inner = self.inner();
        inner.poll_ticks.with_label_values(&[view]).inc();
        inner
            .tick_latency_seconds
            .with_label_values(&[view])
            .observe(elapsed.as_secs_f64());
    }

    pub fn inc_feed_failure(&self, view: &str, feed: &str) {
        self.inner()
            .feed_failures
            .with_label_values(&[view, feed])
            .inc();
    }

    pub fn inc_remediation(&self, action: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.inner()
            .remediation_requests
            .with_label_values(&[action, outcome])
            .inc();
    }

    pub fn inc_summarization(&self, outcome: &str) {
        self.inner()
            .summarizations
            .with_label_values(&[outcome])
            .inc();
    }

    /// Current metrics in Prometheus text exposition format
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Structured logger for console events
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn log_poller_started(&self, interval: Duration) {
        info!(
            event = "poller_started",
            view = %self.component,
            interval_secs = interval.as_secs_f64(),
            "Started view poller"
        );
    }

    pub fn log_poller_stopped(&self, ticks: u64) {
        info!(
            event = "poller_stopped",
            view = %self.component,
            ticks = ticks,
            "Stopped view poller"
        );
    }

    pub fn log_tick(&self, generation: u64, failed_feeds: usize, elapsed: Duration) {
        debug!(
            event = "tick_applied",
            view = %self.component,
            generation = generation,
            failed_feeds = failed_feeds,
            elapsed_ms = elapsed.as_millis() as u64,
            "Applied poll tick"
        );
    }

    pub fn log_tick_discarded(&self) {
        debug!(
            event = "tick_discarded",
            view = %self.component,
            "Discarded tick results for stopped view"
        );
    }

    pub fn log_feed_failure(&self, feed: &str, error: &str) {
        warn!(
            event = "feed_failed",
            view = %self.component,
            feed = %feed,
            error = %error,
            "Feed fetch failed, keeping last-known-good data"
        );
    }

    pub fn log_remediation(&self, action: &str, target: Option<&str>, error: Option<&str>) {
        match error {
            None => info!(
                event = "remediation_requested",
                action = %action,
                target = ?target,
                "Remediation request accepted"
            ),
            Some(error) => warn!(
                event = "remediation_failed",
                action = %action,
                target = ?target,
                error = %error,
                "Remediation request failed"
            ),
        }
    }

    pub fn log_delayed_refresh(&self, delay: Duration) {
        debug!(
            event = "refresh_scheduled",
            view = %self.component,
            delay_ms = delay.as_millis() as u64,
            "Scheduled one-shot refresh"
        );
    }

    pub fn log_summarize_state(&self, container: &str, state: &str) {
        debug!(
            event = "summarize_state",
            container = %container,
            state = %state,
            "Summarizer state changed"
        );
    }

    pub fn log_summarize_outcome(&self, container: &str, outcome: &str, detail: Option<&str>) {
        match detail {
            None => info!(
                event = "summarize_done",
                container = %container,
                outcome = %outcome,
                "Log summary completed"
            ),
            Some(detail) => warn!(
                event = "summarize_failed",
                container = %container,
                outcome = %outcome,
                detail = %detail,
                "Log summary failed"
            ),
        }
    }
}
