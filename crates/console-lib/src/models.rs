//! Core data models for the nabd API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state reported by the container engine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContainerState {
    Running,
    Exited,
    /// Any other engine state (paused, restarting, created, ...), kept verbatim
    Other(String),
}

impl From<String> for ContainerState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "running" => ContainerState::Running,
            "exited" => ContainerState::Exited,
            _ => ContainerState::Other(value),
        }
    }
}

impl From<ContainerState> for String {
    fn from(state: ContainerState) -> Self {
        state.as_str().to_string()
    }
}

impl ContainerState {
    pub fn as_str(&self) -> &str {
        match self {
            ContainerState::Running => "running",
            ContainerState::Exited => "exited",
            ContainerState::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container as listed by `GET /api/containers`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    pub image: String,
    pub state: ContainerState,
    /// Human-readable status text, e.g. "Up 3 hours"
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl Container {
    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }
}

/// Resource usage sample for one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Container name; the join key against [`Container::name`]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    pub cpu_percent: f64,
    pub memory_usage: u64,
    /// Absent or zero when the container runs without a memory limit
    #[serde(default)]
    pub memory_limit: Option<u64>,
    #[serde(default)]
    pub network_rx: u64,
    #[serde(default)]
    pub network_tx: u64,
    pub timestamp: DateTime<Utc>,
}

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
            AlertSeverity::Unknown => write!(f, "unknown"),
        }
    }
}

/// Active alert raised by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Auto-heal action recorded by the backend detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoHealEvent {
    pub id: i64,
    pub name: String,
    pub container_id: String,
    pub action: String,
    pub reason: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// `{ "data": [...] }` envelope used by every collection endpoint.
/// A `null` payload is read as an empty collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct DataEnvelope<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub data: Vec<T>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `{ "error": "..." }` envelope returned on failure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<String>,
}
