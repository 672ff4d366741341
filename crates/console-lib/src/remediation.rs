//! Operator-initiated remediation requests
//!
//! A successful request schedules exactly one delayed refresh of the
//! affected view, so the operator sees the outcome without the view's
//! steady-state interval being tightened. Failed requests schedule
//! nothing.
//!
//! No cooldown or de-duplication is applied: concurrent requests are
//! sent independently and the server decides whether that is safe.

use crate::api::{ApiResult, ConsoleApi};
use crate::observability::{ConsoleMetrics, StructuredLogger};
use crate::poller::ViewRefresher;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Delay between an accepted request and the follow-up refresh
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_secs(2);

/// Handle to the one-shot refresh scheduled after a request
#[derive(Debug)]
pub struct ScheduledRefresh {
    handle: JoinHandle<()>,
    delay: Duration,
}

impl ScheduledRefresh {
    fn spawn(refresher: ViewRefresher, delay: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            refresher.refresh();
        });
        Self { handle, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until the refresh has been issued
    pub async fn issued(self) {
        let _ = self.handle.await;
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

/// Triggers the backend auto-heal check
pub struct RemediationTrigger {
    api: Arc<dyn ConsoleApi>,
    history: ViewRefresher,
    delay: Duration,
    logger: StructuredLogger,
    metrics: ConsoleMetrics,
}

impl RemediationTrigger {
    /// `history` refreshes the auto-heal event view
    pub fn new(api: Arc<dyn ConsoleApi>, history: ViewRefresher) -> Self {
        Self {
            api,
            history,
            delay: DEFAULT_REFRESH_DELAY,
            logger: StructuredLogger::new("autoheal"),
            metrics: ConsoleMetrics::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Request an auto-heal check; on success refresh history once after the delay
    pub async fn trigger(&self) -> ApiResult<ScheduledRefresh> {
        match self.api.trigger_autoheal().await {
            Ok(()) => {
                self.metrics.inc_remediation("autoheal_trigger", true);
                self.logger.log_remediation("autoheal_trigger", None, None);
                self.logger.log_delayed_refresh(self.delay);
                Ok(ScheduledRefresh::spawn(self.history.clone(), self.delay))
            }
            Err(e) => {
                self.metrics.inc_remediation("autoheal_trigger", false);
                self.logger
                    .log_remediation("autoheal_trigger", None, Some(&e.to_string()));
                Err(e)
            }
        }
    }
}

/// Restarts a single container from the dashboard
pub struct RestartAction {
    api: Arc<dyn ConsoleApi>,
    dashboard: ViewRefresher,
    delay: Duration,
    logger: StructuredLogger,
    metrics: ConsoleMetrics,
}

impl RestartAction {
    /// `dashboard` refreshes the container/metrics/alerts view
    pub fn new(api: Arc<dyn ConsoleApi>, dashboard: ViewRefresher) -> Self {
        Self {
            api,
            dashboard,
            delay: DEFAULT_REFRESH_DELAY,
            logger: StructuredLogger::new("dashboard"),
            metrics: ConsoleMetrics::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn restart(&self, name: &str) -> ApiResult<ScheduledRefresh> {
        match self.api.restart_container(name).await {
            Ok(()) => {
                self.metrics.inc_remediation("restart", true);
                self.logger.log_remediation("restart", Some(name), None);
                self.logger.log_delayed_refresh(self.delay);
                Ok(ScheduledRefresh::spawn(self.dashboard.clone(), self.delay))
            }
            Err(e) => {
                self.metrics.inc_remediation("restart", false);
                self.logger
                    .log_remediation("restart", Some(name), Some(&e.to_string()));
                Err(e)
            }
        }
    }
}
