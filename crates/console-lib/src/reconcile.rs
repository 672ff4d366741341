//! Joins the dashboard feeds into render-ready rows
//!
//! Everything here is derived from the latest view model on every
//! render; nothing is cached between ticks.

use crate::models::{Container, ContainerState, MetricSample};
use crate::views::DashboardModel;
use serde::Serialize;
use std::collections::HashMap;

/// A container with its current metric, if the metrics feed has one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerRow<'a> {
    pub container: &'a Container,
    pub metric: Option<&'a MetricSample>,
}

impl ContainerRow<'_> {
    /// Memory usage as a percentage of the limit, when both are known
    pub fn memory_percent(&self) -> Option<f64> {
        let metric = self.metric?;
        match metric.memory_limit {
            Some(limit) if limit > 0 => Some(metric.memory_usage as f64 / limit as f64 * 100.0),
            _ => None,
        }
    }
}

/// Summary counters shown above the container list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardCounts {
    pub total: usize,
    pub running: usize,
    pub exited: usize,
    pub active_alerts: usize,
}

/// Pair every container with the metric sharing its name.
///
/// Container order is preserved. A container without a metric gets
/// `metric: None`; metrics for unknown names are ignored.
pub fn join<'a>(containers: &'a [Container], metrics: &'a [MetricSample]) -> Vec<ContainerRow<'a>> {
    let by_name: HashMap<&str, &MetricSample> =
        metrics.iter().map(|m| (m.name.as_str(), m)).collect();

    containers
        .iter()
        .map(|container| ContainerRow {
            container,
            metric: by_name.get(container.name.as_str()).copied(),
        })
        .collect()
}

/// Count containers by state and the active alerts
pub fn counts(model: &DashboardModel) -> DashboardCounts {
    let containers = model.containers.items();
    DashboardCounts {
        total: containers.len(),
        running: containers
            .iter()
            .filter(|c| c.state == ContainerState::Running)
            .count(),
        exited: containers
            .iter()
            .filter(|c| c.state == ContainerState::Exited)
            .count(),
        active_alerts: model.alerts.len(),
    }
}

/// Rows for the dashboard model
pub fn rows(model: &DashboardModel) -> Vec<ContainerRow<'_>> {
    join(model.containers.items(), model.metrics.items())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ConsoleApi;
    use crate::models::AlertSeverity;
    use crate::poller::FeedSet;
    use crate::testing::{self, FakeApi};
    use crate::views::DashboardFeeds;

    #[test]
    fn test_join_missing_metric_is_none() {
        let containers = vec![
            testing::container("1", "web", "running"),
            testing::container("2", "worker", "running"),
        ];
        let metrics = vec![
            testing::sample("web", 0, 50, Some(100)),
            testing::sample("ghost", 0, 1, None),
        ];

        let rows = join(&containers, &metrics);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].metric.map(|m| m.memory_usage), Some(50));
        assert_eq!(rows[0].memory_percent(), Some(50.0));
        assert!(rows[1].metric.is_none());
        assert_eq!(rows[1].memory_percent(), None);
    }

    #[tokio::test]
    async fn test_counts_from_states() {
        let api = FakeApi::new();
        api.set_containers(vec![
            testing::container("1", "a", "running"),
            testing::container("2", "b", "running"),
            testing::container("3", "c", "exited"),
        ]);
        api.set_alerts(vec![
            testing::alert(1, "a", AlertSeverity::Warning),
            testing::alert(2, "c", AlertSeverity::Info),
        ]);

        let mut model = DashboardModel::default();
        let batch = DashboardFeeds.fetch(&api as &dyn ConsoleApi).await;
        DashboardFeeds::apply(&mut model, batch);

        assert_eq!(
            counts(&model),
            DashboardCounts {
                total: 3,
                running: 2,
                exited: 1,
                active_alerts: 2,
            }
        );
    }

    #[test]
    fn test_counts_ignore_other_states() {
        let mut model = DashboardModel::default();
        assert_eq!(counts(&model), DashboardCounts::default());

        let mut report = crate::poller::TickReport::new();
        report.merge(
            "containers",
            &mut model.containers,
            Ok(vec![testing::container("1", "a", "paused")]),
        );
        let c = counts(&model);
        assert_eq!((c.total, c.running, c.exited), (1, 0, 0));
    }
}
