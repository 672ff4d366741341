//! In-memory [`ConsoleApi`] used by unit tests

use crate::api::{ApiError, ApiResult, ConsoleApi};
use crate::models::{
    Alert, AlertSeverity, AutoHealEvent, Container, ContainerState, MetricSample,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct FakeApi {
    containers: Mutex<Vec<Container>>,
    metrics: Mutex<Vec<MetricSample>>,
    history: Mutex<Vec<MetricSample>>,
    logs: Mutex<Vec<String>>,
    events: Mutex<Vec<AutoHealEvent>>,
    alerts: Mutex<Vec<Alert>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    last_args: Mutex<HashMap<&'static str, String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_containers(&self, containers: Vec<Container>) {
        *self.containers.lock().unwrap() = containers;
    }

    pub fn set_metrics(&self, metrics: Vec<MetricSample>) {
        *self.metrics.lock().unwrap() = metrics;
    }

    pub fn set_history(&self, history: Vec<MetricSample>) {
        *self.history.lock().unwrap() = history;
    }

    pub fn set_logs(&self, logs: Vec<String>) {
        *self.logs.lock().unwrap() = logs;
    }

    pub fn set_events(&self, events: Vec<AutoHealEvent>) {
        *self.events.lock().unwrap() = events;
    }

    pub fn set_alerts(&self, alerts: Vec<Alert>) {
        *self.alerts.lock().unwrap() = alerts;
    }

    /// Make every call of `endpoint` fail with `error` until recovered
    pub fn fail(&self, endpoint: &'static str, error: ApiError) {
        self.failures.lock().unwrap().insert(endpoint, error);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.failures.lock().unwrap().remove(endpoint);
    }

    pub fn calls(&self, endpoint: &'static str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    pub fn last_args(&self, endpoint: &'static str) -> Option<String> {
        self.last_args.lock().unwrap().get(endpoint).cloned()
    }

    fn record(&self, endpoint: &'static str, args: String) -> ApiResult<()> {
        *self.calls.lock().unwrap().entry(endpoint).or_insert(0) += 1;
        self.last_args.lock().unwrap().insert(endpoint, args);
        match self.failures.lock().unwrap().get(endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ConsoleApi for FakeApi {
    async fn containers(&self) -> ApiResult<Vec<Container>> {
        self.record("containers", String::new())?;
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn metrics(&self) -> ApiResult<Vec<MetricSample>> {
        self.record("metrics", String::new())?;
        Ok(self.metrics.lock().unwrap().clone())
    }

    async fn metrics_history(&self, container_id: &str, hours: u32) -> ApiResult<Vec<MetricSample>> {
        self.record("metrics_history", format!("{}:{}", container_id, hours))?;
        Ok(self.history.lock().unwrap().clone())
    }

    async fn logs(&self, container: &str, lines: u32) -> ApiResult<Vec<String>> {
        self.record("logs", format!("{}:{}", container, lines))?;
        Ok(self.logs.lock().unwrap().clone())
    }

    async fn restart_container(&self, name: &str) -> ApiResult<()> {
        self.record("restart", name.to_string())
    }

    async fn autoheal_history(&self, limit: u32) -> ApiResult<Vec<AutoHealEvent>> {
        self.record("autoheal_history", limit.to_string())?;
        Ok(self.events.lock().unwrap().clone())
    }

    async fn trigger_autoheal(&self) -> ApiResult<()> {
        self.record("trigger", String::new())
    }

    async fn alerts(&self) -> ApiResult<Vec<Alert>> {
        self.record("alerts", String::new())?;
        Ok(self.alerts.lock().unwrap().clone())
    }
}

pub(crate) fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

pub(crate) fn container(id: &str, name: &str, state: &str) -> Container {
    Container {
        id: id.to_string(),
        name: name.to_string(),
        image: format!("{}:latest", name),
        state: ContainerState::from(state.to_string()),
        status: String::new(),
        created: None,
    }
}

pub(crate) fn sample(name: &str, secs: i64, usage: u64, limit: Option<u64>) -> MetricSample {
    MetricSample {
        name: name.to_string(),
        container_id: None,
        cpu_percent: 12.5,
        memory_usage: usage,
        memory_limit: limit,
        network_rx: 10,
        network_tx: 20,
        timestamp: ts(secs),
    }
}

pub(crate) fn alert(id: i64, name: &str, severity: AlertSeverity) -> Alert {
    Alert {
        id,
        name: name.to_string(),
        alert_type: "cpu".to_string(),
        severity,
        message: format!("{} is hot", name),
        timestamp: ts(id),
    }
}

pub(crate) fn event(id: i64, name: &str, success: bool) -> AutoHealEvent {
    AutoHealEvent {
        id,
        name: name.to_string(),
        container_id: format!("id-{}", name),
        action: "restart".to_string(),
        reason: "container exited".to_string(),
        success,
        timestamp: ts(id),
    }
}
