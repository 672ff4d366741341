//! Auto-heal history and trigger

use anyhow::Result;
use console_lib::poller::{PollHandle, ViewState};
use console_lib::remediation::RemediationTrigger;
use console_lib::views::{AutoHealFeeds, AutoHealModel};
use console_lib::AutoHealEvent;
use tabled::Tabled;

use super::{drive, start_view};
use crate::output::{
    color_status, print_heading, print_info, print_json, print_success, print_table, OutputFormat,
};
use crate::session::Session;

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&AutoHealEvent> for EventRow {
    fn from(event: &AutoHealEvent) -> Self {
        Self {
            time: event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            container: event.name.clone(),
            action: event.action.clone(),
            reason: event.reason.clone(),
            result: color_status(if event.success { "success" } else { "failed" }),
        }
    }
}

fn render(state: &ViewState<AutoHealModel>, format: OutputFormat) -> Result<()> {
    let events = state.model.events.items();
    if format == OutputFormat::Json {
        return print_json(events);
    }

    print_heading("Auto-Heal History");
    let rows: Vec<EventRow> = events.iter().map(EventRow::from).collect();
    print_table(&rows, "No auto-heal events recorded");
    Ok(())
}

fn start(session: &Session, limit: Option<u32>) -> Result<PollHandle<AutoHealFeeds>> {
    let feeds = AutoHealFeeds::new(limit.unwrap_or(session.config.history_limit));
    start_view(feeds, session, session.config.autoheal_interval())
}

/// Show recent auto-heal events
pub async fn history(
    session: &Session,
    limit: Option<u32>,
    watch: bool,
    format: OutputFormat,
) -> Result<()> {
    session.require_login()?;
    let handle = start(session, limit)?;
    drive(&handle, session, watch, format, |state| render(state, format)).await
}

/// Ask the backend to run an auto-heal check, then show the refreshed history
pub async fn trigger(session: &Session, format: OutputFormat) -> Result<()> {
    session.require_login()?;
    let handle = start(session, None)?;
    let generation = handle.wait_for_generation(0).await?;

    let trigger = RemediationTrigger::new(session.api(), handle.refresher())
        .with_delay(session.config.remediation_refresh_delay());
    let scheduled = trigger.trigger().await?;
    if format == OutputFormat::Table {
        print_success("Auto-heal check triggered");
        print_info(&format!("Refreshing history in {:?}", scheduled.delay()));
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
