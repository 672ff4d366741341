//! Chart-ready projection of container metrics history

use crate::api::{ApiError, ApiResult, ConsoleApi, Operation};
use crate::models::{Container, MetricSample};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;

/// History windows offered by the charts view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TimeRange {
    LastHour,
    Last6Hours,
    #[default]
    Last24Hours,
    Last3Days,
    LastWeek,
}

impl TimeRange {
    pub const ALL: [TimeRange; 5] = [
        TimeRange::LastHour,
        TimeRange::Last6Hours,
        TimeRange::Last24Hours,
        TimeRange::Last3Days,
        TimeRange::LastWeek,
    ];

    pub fn hours(&self) -> u32 {
        match self {
            TimeRange::LastHour => 1,
            TimeRange::Last6Hours => 6,
            TimeRange::Last24Hours => 24,
            TimeRange::Last3Days => 72,
            TimeRange::LastWeek => 168,
        }
    }

    pub fn from_hours(hours: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.hours() == hours)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::LastHour => "Last Hour",
            TimeRange::Last6Hours => "Last 6 Hours",
            TimeRange::Last24Hours => "Last 24 Hours",
            TimeRange::Last3Days => "Last 3 Days",
            TimeRange::LastWeek => "Last Week",
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    /// Accepts hour counts (`24`) or suffixed forms (`24h`, `3d`, `1w`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let hours = if let Some(days) = s.strip_suffix('d') {
            days.parse::<u32>().ok().and_then(|d| d.checked_mul(24))
        } else if let Some(weeks) = s.strip_suffix('w') {
            weeks.parse::<u32>().ok().and_then(|w| w.checked_mul(168))
        } else {
            s.trim_end_matches('h').parse::<u32>().ok()
        };

        hours
            .and_then(Self::from_hours)
            .ok_or_else(|| format!("unsupported time range '{}', use 1, 6, 24, 72 or 168 hours", s))
    }
}

/// One chart sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    /// Axis label, `HH:MM`
    pub time: String,
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: Option<u64>,
    pub memory_percentage: f64,
    pub network_rx: u64,
    pub network_tx: u64,
}

/// Ordered history for one container over one range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub container: Container,
    pub range: TimeRange,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn cpu(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.points.iter().map(|p| (p.timestamp, p.cpu_percent)).collect()
    }

    pub fn memory_percentage(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.points
            .iter()
            .map(|p| (p.timestamp, p.memory_percentage))
            .collect()
    }

    pub fn network(&self) -> Vec<(DateTime<Utc>, u64, u64)> {
        self.points
            .iter()
            .map(|p| (p.timestamp, p.network_rx, p.network_tx))
            .collect()
    }
}

/// Memory usage as a percentage of the limit; 0 without a limit
pub fn memory_percentage(usage: u64, limit: Option<u64>) -> f64 {
    match limit {
        Some(limit) if limit > 0 => usage as f64 / limit as f64 * 100.0,
        _ => 0.0,
    }
}

/// Sort samples ascending by timestamp and derive chart fields
pub fn project(mut samples: Vec<MetricSample>) -> Vec<ChartPoint> {
    samples.sort_by_key(|s| s.timestamp);
    samples
        .into_iter()
        .map(|s| ChartPoint {
            time: s.timestamp.format("%H:%M").to_string(),
            memory_percentage: memory_percentage(s.memory_usage, s.memory_limit),
            timestamp: s.timestamp,
            cpu_percent: s.cpu_percent,
            memory_usage: s.memory_usage,
            memory_limit: s.memory_limit,
            network_rx: s.network_rx,
            network_tx: s.network_tx,
        })
        .collect()
}

/// Resolve a container by name and project its history over `range`.
///
/// Each call recomputes the whole series.
pub async fn load_series(
    api: &dyn ConsoleApi,
    container_name: &str,
    range: TimeRange,
) -> ApiResult<ChartSeries> {
    let containers = api.containers().await?;
    let container = containers
        .into_iter()
        .find(|c| c.name == container_name)
        .ok_or_else(|| {
            ApiError::server(
                Operation::MetricsHistory,
                None,
                Some("Container not found".to_string()),
            )
        })?;

    let samples = api.metrics_history(&container.id, range.hours()).await?;
    Ok(ChartSeries {
        points: project(samples),
        container,
        range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, FakeApi};

    #[test]
    fn test_project_sorts_ascending() {
        let samples = vec![
            testing::sample("web", 120, 30, Some(100)),
            testing::sample("web", 0, 10, Some(100)),
            testing::sample("web", 60, 20, Some(100)),
        ];

        let points = project(samples);
        let usages: Vec<u64> = points.iter().map(|p| p.memory_usage).collect();
        assert_eq!(usages, vec![10, 20, 30]);
        assert!(points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(points[2].memory_percentage, 30.0);
    }

    #[test]
    fn test_memory_percentage_without_limit() {
        assert_eq!(memory_percentage(500, None), 0.0);
        assert_eq!(memory_percentage(500, Some(0)), 0.0);
        assert_eq!(memory_percentage(256, Some(1024)), 25.0);
    }

    #[test]
    fn test_time_range_parsing() {
        assert_eq!("24".parse::<TimeRange>(), Ok(TimeRange::Last24Hours));
        assert_eq!("6h".parse::<TimeRange>(), Ok(TimeRange::Last6Hours));
        assert_eq!("3d".parse::<TimeRange>(), Ok(TimeRange::Last3Days));
        assert_eq!("1w".parse::<TimeRange>(), Ok(TimeRange::LastWeek));
        assert!("12".parse::<TimeRange>().is_err());
        assert!("200000000d".parse::<TimeRange>().is_err());
        assert!("100000000w".parse::<TimeRange>().is_err());
        assert_eq!(TimeRange::default().hours(), 24);
    }

    #[tokio::test]
    async fn test_load_series_resolves_id_by_name() {
        let api = FakeApi::new();
        api.set_containers(vec![testing::container("abc", "web", "running")]);
        api.set_history(vec![
            testing::sample("web", 10, 2, None),
            testing::sample("web", 5, 1, None),
        ]);

        let series = load_series(&api, "web", TimeRange::Last6Hours).await.unwrap();
        assert_eq!(api.last_args("metrics_history").as_deref(), Some("abc:6"));
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].memory_usage, 1);
        assert_eq!(series.cpu().len(), 2);

        let err = load_series(&api, "missing", TimeRange::LastHour)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Container not found");
    }
}
