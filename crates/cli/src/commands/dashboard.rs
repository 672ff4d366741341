//! Container dashboard and restart

use anyhow::Result;
use colored::Colorize;
use console_lib::poller::ViewState;
use console_lib::reconcile::{self, ContainerRow};
use console_lib::remediation::RestartAction;
use console_lib::views::{DashboardFeeds, DashboardModel};
use console_lib::Alert;
use serde::Serialize;
use tabled::Tabled;

use super::{drive, start_view};
use crate::output::{
    color_cpu, color_severity, color_status, format_bytes, format_percent, print_heading,
    print_info, print_json, print_success, print_table, OutputFormat,
};
use crate::session::Session;

#[derive(Tabled)]
struct ContainerTableRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Mem %")]
    memory_percent: String,
}

impl From<&ContainerRow<'_>> for ContainerTableRow {
    fn from(row: &ContainerRow<'_>) -> Self {
        let (cpu, memory) = match row.metric {
            Some(m) => (color_cpu(m.cpu_percent), format_bytes(m.memory_usage)),
            None => ("-".to_string(), "-".to_string()),
        };
        Self {
            name: row.container.name.clone(),
            image: row.container.image.clone(),
            state: color_status(row.container.state.as_str()),
            status: row.container.status.clone(),
            cpu,
            memory,
            memory_percent: row
                .memory_percent()
                .map(format_percent)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Tabled)]
struct AlertTableRow {
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Type")]
    alert_type: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Time")]
    time: String,
}

impl From<&Alert> for AlertTableRow {
    fn from(alert: &Alert) -> Self {
        Self {
            severity: color_severity(alert.severity),
            container: alert.name.clone(),
            alert_type: alert.alert_type.clone(),
            message: alert.message.clone(),
            time: alert.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Serialize)]
struct DashboardJson<'a> {
    counts: reconcile::DashboardCounts,
    containers: Vec<ContainerRow<'a>>,
    alerts: &'a [Alert],
    error: Option<&'a str>,
}

fn render(state: &ViewState<DashboardModel>, format: OutputFormat) -> Result<()> {
    let model = &state.model;
    let rows = reconcile::rows(model);

    if format == OutputFormat::Json {
        return print_json(&DashboardJson {
            counts: reconcile::counts(model),
            containers: rows,
            alerts: model.alerts.items(),
            error: state.error.as_deref(),
        });
    }

    let counts = reconcile::counts(model);
    print_heading("Containers");
    println!(
        "Total: {}   Running: {}   Exited: {}   Active alerts: {}",
        counts.total.to_string().bold(),
        counts.running.to_string().green(),
        counts.exited.to_string().red(),
        counts.active_alerts.to_string().yellow()
    );
    println!();

    let table: Vec<ContainerTableRow> = rows.iter().map(ContainerTableRow::from).collect();
    print_table(&table, "No containers found");

    if !model.alerts.is_empty() {
        println!();
        print_heading("Active Alerts");
        let alerts: Vec<AlertTableRow> = model.alerts.items().iter().map(AlertTableRow::from).collect();
        print_table(&alerts, "No active alerts");
    }
    Ok(())
}

/// Show containers, metrics and alerts
pub async fn show(session: &Session, watch: bool, format: OutputFormat) -> Result<()> {
    session.require_login()?;
    let handle = start_view(DashboardFeeds, session, session.config.dashboard_interval())?;
    drive(&handle, session, watch, format, |state| render(state, format)).await
}

/// Restart a container, then show the dashboard after the follow-up refresh
pub async fn restart(session: &Session, name: &str, format: OutputFormat) -> Result<()> {
    session.require_login()?;
    let handle = start_view(DashboardFeeds, session, session.config.dashboard_interval())?;
    let generation = handle.wait_for_generation(0).await?;

    let action = RestartAction::new(session.api(), handle.refresher())
        .with_delay(session.config.remediation_refresh_delay());
    let scheduled = action.restart(name).await?;
    if format == OutputFormat::Table {
        print_success(&format!("Restart requested for {}", name.cyan()));
        print_info(&format!("Refreshing in {:?}", scheduled.delay()));
    }

    scheduled.issued().await;
    handle.wait_for_generation(generation).await?;
    session.ensure_active()?;

    let state = handle.read().await;
    render(&state, format)?;
    drop(state);
    handle.stop();
    Ok(())
}
