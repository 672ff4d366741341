//! Fetch sets and view models for the console views
//!
//! - Dashboard: containers, metrics and alerts every 10 seconds
//! - Logs: the active container's recent lines every 5 seconds (opt-in)
//! - Auto-heal: remediation event history every 15 seconds

use crate::api::{ApiResult, ConsoleApi};
use crate::models::{Alert, AutoHealEvent, Container, MetricSample};
use crate::poller::{FeedSet, FeedSlot, TickReport};
use async_trait::async_trait;

/// Line counts offered by the logs view
pub const LOG_LINE_CHOICES: [u32; 4] = [50, 100, 200, 500];

/// Default number of log lines requested
pub const DEFAULT_LOG_LINES: u32 = 100;

/// Default number of auto-heal events requested
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

pub mod feeds {
    pub const CONTAINERS: &str = "containers";
    pub const METRICS: &str = "metrics";
    pub const ALERTS: &str = "alerts";
    pub const LOGS: &str = "logs";
    pub const AUTOHEAL_EVENTS: &str = "autoheal_events";
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardModel {
    pub containers: FeedSlot<Container>,
    pub metrics: FeedSlot<MetricSample>,
    pub alerts: FeedSlot<Alert>,
}

pub struct DashboardBatch {
    containers: ApiResult<Vec<Container>>,
    metrics: ApiResult<Vec<MetricSample>>,
    alerts: ApiResult<Vec<Alert>>,
}

/// Containers, current metrics and active alerts
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardFeeds;

#[async_trait]
impl FeedSet for DashboardFeeds {
    type Model = DashboardModel;
    type Batch = DashboardBatch;

    fn view(&self) -> &'static str {
        "dashboard"
    }

    async fn fetch(&self, api: &dyn ConsoleApi) -> Self::Batch {
        let (containers, metrics, alerts) =
            tokio::join!(api.containers(), api.metrics(), api.alerts());
        DashboardBatch {
            containers,
            metrics,
            alerts,
        }
    }

    fn apply(model: &mut Self::Model, batch: Self::Batch) -> TickReport {
        let mut report = TickReport::new();
        report.merge(feeds::CONTAINERS, &mut model.containers, batch.containers);
        report.merge(feeds::METRICS, &mut model.metrics, batch.metrics);
        report.merge(feeds::ALERTS, &mut model.alerts, batch.alerts);
        report
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogsModel {
    pub lines: FeedSlot<String>,
}

/// Recent log lines of the active container
#[derive(Debug, Clone)]
pub struct LogsFeeds {
    container: String,
    lines: u32,
}

impl LogsFeeds {
    pub fn new(container: impl Into<String>, lines: u32) -> Self {
        Self {
            container: container.into(),
            lines,
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }
}

#[async_trait]
impl FeedSet for LogsFeeds {
    type Model = LogsModel;
    type Batch = ApiResult<Vec<String>>;

    fn view(&self) -> &'static str {
        "logs"
    }

    async fn fetch(&self, api: &dyn ConsoleApi) -> Self::Batch {
        api.logs(&self.container, self.lines).await
    }

    fn apply(model: &mut Self::Model, batch: Self::Batch) -> TickReport {
        let mut report = TickReport::new();
        report.merge(feeds::LOGS, &mut model.lines, batch);
        report
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoHealModel {
    /// Most recent first, as returned by the server
    pub events: FeedSlot<AutoHealEvent>,
}

/// Auto-heal event history
#[derive(Debug, Clone, Copy)]
pub struct AutoHealFeeds {
    limit: u32,
}

impl AutoHealFeeds {
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }
}

impl Default for AutoHealFeeds {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[async_trait]
impl FeedSet for AutoHealFeeds {
    type Model = AutoHealModel;
    type Batch = ApiResult<Vec<AutoHealEvent>>;

    fn view(&self) -> &'static str {
        "autoheal"
    }

    async fn fetch(&self, api: &dyn ConsoleApi) -> Self::Batch {
        api.autoheal_history(self.limit).await
    }

    fn apply(model: &mut Self::Model, batch: Self::Batch) -> TickReport {
        let mut report = TickReport::new();
        report.merge(feeds::AUTOHEAL_EVENTS, &mut model.events, batch);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, Operation};
    use crate::models::AlertSeverity;
    use crate::poller::{FeedPoller, ViewState};
    use crate::testing::{self, FakeApi};
    use std::sync::Arc;
    use std::time::Duration;

    fn seeded_api() -> Arc<FakeApi> {
        let api = Arc::new(FakeApi::new());
        api.set_containers(vec![
            testing::container("1", "web", "running"),
            testing::container("2", "db", "running"),
        ]);
        api.set_metrics(vec![testing::sample("web", 0, 100, Some(200))]);
        api.set_alerts(vec![testing::alert(1, "db", AlertSeverity::Critical)]);
        api
    }

    #[tokio::test]
    async fn test_alerts_failure_keeps_previous_alerts() {
        let api = seeded_api();
        let mut state: ViewState<DashboardModel> = ViewState::default();

        let batch = DashboardFeeds.fetch(api.as_ref()).await;
        DashboardFeeds::apply(&mut state.model, batch);
        assert_eq!(state.model.alerts.len(), 1);

        api.set_containers(vec![testing::container("1", "web", "exited")]);
        api.set_metrics(vec![]);
        api.fail(
            "alerts",
            ApiError::server(Operation::Alerts, Some(500), Some("alerts db locked".into())),
        );

        let batch = DashboardFeeds.fetch(api.as_ref()).await;
        let report = DashboardFeeds::apply(&mut state.model, batch);

        assert_eq!(report.banner(), Some("alerts db locked".to_string()));
        assert_eq!(state.model.containers.len(), 1);
        assert!(!state.model.containers.items()[0].is_running());
        assert!(state.model.metrics.is_empty());
        assert_eq!(state.model.alerts.len(), 1);
        assert_eq!(state.model.alerts.items()[0].name, "db");
    }

    #[tokio::test]
    async fn test_all_feeds_fetched_each_tick() {
        let api = seeded_api();
        DashboardFeeds.fetch(api.as_ref()).await;
        assert_eq!(api.calls("containers"), 1);
        assert_eq!(api.calls("metrics"), 1);
        assert_eq!(api.calls("alerts"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_backend_gives_stable_model() {
        let api = seeded_api();
        let handle = FeedPoller::new(DashboardFeeds, api.clone(), Duration::from_secs(10)).start();

        handle.wait_for_generation(0).await.unwrap();
        let first = handle.snapshot().await.model;

        tokio::time::sleep(Duration::from_secs(30)).await;
        handle.wait_for_generation(3).await.unwrap();
        let later = handle.snapshot().await;

        assert_eq!(later.model, first);
        assert_eq!(later.error, None);
        handle.stop();
    }

    #[tokio::test]
    async fn test_logs_feed_requests_active_container() {
        let api = Arc::new(FakeApi::new());
        api.set_logs(vec!["line one".into(), "line two".into()]);
        let feeds = LogsFeeds::new("web", DEFAULT_LOG_LINES);

        let mut model = LogsModel::default();
        let batch = feeds.fetch(api.as_ref()).await;
        LogsFeeds::apply(&mut model, batch);

        assert_eq!(api.last_args("logs").as_deref(), Some("web:100"));
        assert_eq!(model.lines.len(), 2);

        api.fail("logs", ApiError::server(Operation::Logs, None, None));
        let batch = feeds.fetch(api.as_ref()).await;
        let report = LogsFeeds::apply(&mut model, batch);
        assert_eq!(report.banner().as_deref(), Some("Failed to fetch logs"));
        assert_eq!(model.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_autoheal_feed_uses_limit() {
        let api = Arc::new(FakeApi::new());
        api.set_events(vec![testing::event(2, "web", true), testing::event(1, "db", false)]);

        let mut model = AutoHealModel::default();
        let batch = AutoHealFeeds::new(20).fetch(api.as_ref()).await;
        AutoHealFeeds::apply(&mut model, batch);

        assert_eq!(api.last_args("autoheal_history").as_deref(), Some("20"));
        assert_eq!(model.events.items()[0].id, 2);
    }
}
