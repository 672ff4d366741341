//! Console configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Console configuration, layered defaults → file → `NABD_*` environment
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Base URL of the nabd backend
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Dashboard poll interval (containers, metrics, alerts)
    #[serde(default = "default_dashboard_interval")]
    pub dashboard_interval_secs: u64,

    /// Logs auto-refresh interval
    #[serde(default = "default_logs_interval")]
    pub logs_interval_secs: u64,

    /// Auto-heal history poll interval
    #[serde(default = "default_autoheal_interval")]
    pub autoheal_interval_secs: u64,

    /// Delay before the one-shot refresh after a remediation request
    #[serde(default = "default_refresh_delay")]
    pub remediation_refresh_delay_ms: u64,

    /// Number of auto-heal events requested per poll
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    /// Overall deadline for summarizer creation and invocation, 0 disables it
    #[serde(default = "default_summarize_timeout")]
    pub summarize_timeout_secs: u64,

    /// Endpoint of a local model runtime used for log summaries
    #[serde(default)]
    pub summarizer_endpoint: Option<String>,

    /// Override for the credential file location
    #[serde(default)]
    pub credential_path: Option<PathBuf>,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_dashboard_interval() -> u64 {
    10
}

fn default_logs_interval() -> u64 {
    5
}

fn default_autoheal_interval() -> u64 {
    15
}

fn default_refresh_delay() -> u64 {
    2000
}

fn default_history_limit() -> u32 {
    50
}

fn default_summarize_timeout() -> u64 {
    600
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout(),
            dashboard_interval_secs: default_dashboard_interval(),
            logs_interval_secs: default_logs_interval(),
            autoheal_interval_secs: default_autoheal_interval(),
            remediation_refresh_delay_ms: default_refresh_delay(),
            history_limit: default_history_limit(),
            summarize_timeout_secs: default_summarize_timeout(),
            summarizer_endpoint: None,
            credential_path: None,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from an optional file and the environment.
    ///
    /// When `path` is `None` the default location
    /// (`~/.config/nabd/config.toml`) is used if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(p) => {
                builder = builder.add_source(config::File::from(p).required(true));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let config = builder
            .add_source(config::Environment::with_prefix("NABD"))
            .build()
            .context("Failed to read console configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse console configuration")
    }

    fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("nabd").join("config.toml"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn dashboard_interval(&self) -> Duration {
        Duration::from_secs(self.dashboard_interval_secs)
    }

    pub fn logs_interval(&self) -> Duration {
        Duration::from_secs(self.logs_interval_secs)
    }

    pub fn autoheal_interval(&self) -> Duration {
        Duration::from_secs(self.autoheal_interval_secs)
    }

    pub fn remediation_refresh_delay(&self) -> Duration {
        Duration::from_millis(self.remediation_refresh_delay_ms)
    }

    pub fn summarize_timeout(&self) -> Option<Duration> {
        match self.summarize_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
