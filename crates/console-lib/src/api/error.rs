//! API error taxonomy

use thiserror::Error;

/// Operations against the nabd API, each with its own fallback message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    Containers,
    Metrics,
    MetricsHistory,
    Logs,
    Restart,
    AutoHealHistory,
    AutoHealTrigger,
    Alerts,
}

impl Operation {
    /// Message shown when the server gives no usable error text
    pub fn default_error(&self) -> &'static str {
        match self {
            Operation::Login => "Invalid token",
            Operation::Containers | Operation::Metrics | Operation::Alerts => {
                "Failed to fetch data"
            }
            Operation::MetricsHistory => "Failed to fetch metrics data",
            Operation::Logs => "Failed to fetch logs",
            Operation::Restart => "Failed to restart container",
            Operation::AutoHealHistory => "Failed to fetch auto-heal events",
            Operation::AutoHealTrigger => "Failed to trigger auto-heal",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Login => "login",
            Operation::Containers => "containers",
            Operation::Metrics => "metrics",
            Operation::MetricsHistory => "metrics_history",
            Operation::Logs => "logs",
            Operation::Restart => "restart",
            Operation::AutoHealHistory => "autoheal_history",
            Operation::AutoHealTrigger => "autoheal_trigger",
            Operation::Alerts => "alerts",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Any failed fetch: transport failure or non-success status
    #[error("{message}")]
    Server {
        operation: Operation,
        status: Option<u16>,
        message: String,
    },
    /// The credential was rejected; it has been cleared and the
    /// operator must log in again
    #[error("Session expired, please log in again")]
    AuthExpired,
}

impl ApiError {
    /// Build a server error, falling back to the operation's default text
    /// when the envelope message is absent or blank
    pub fn server(operation: Operation, status: Option<u16>, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| operation.default_error().to_string());
        ApiError::Server {
            operation,
            status,
            message,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_message_falls_back() {
        let err = ApiError::server(Operation::Logs, Some(500), Some("  ".to_string()));
        assert_eq!(err.to_string(), "Failed to fetch logs");

        let err = ApiError::server(Operation::AutoHealTrigger, None, None);
        assert_eq!(err.to_string(), "Failed to trigger auto-heal");
    }

    #[test]
    fn test_envelope_message_wins() {
        let err = ApiError::server(
            Operation::Restart,
            Some(500),
            Some("container not found".to_string()),
        );
        assert_eq!(err.to_string(), "container not found");
    }
}
