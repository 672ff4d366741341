//! AI log summary for one container

use anyhow::Result;
use colored::Colorize;
use console_lib::summarize::{
    LocalModelHost, DEFAULT_TIMEOUT, NegotiationEvent, NegotiationState, Negotiator,
};
use std::sync::Arc;

use crate::output::{print_heading, print_info, print_json, print_warning, OutputFormat};
use crate::session::Session;

fn describe(state: &NegotiationState) -> Option<String> {
    let text = match state {
        NegotiationState::CheckingAvailability => "Checking model availability...".to_string(),
        NegotiationState::Ready => "Model ready".to_string(),
        NegotiationState::Downloading => "Model download in progress".to_string(),
        NegotiationState::Creating(tier) => format!("Creating summarizer ({} configuration)", tier),
        NegotiationState::Summarizing(method) => format!("Summarizing via {}()", method),
        _ => return None,
    };
    Some(text)
}

pub async fn run(session: &Session, container: &str, format: OutputFormat) -> Result<()> {
    session.require_login()?;
    let host_timeout = session
        .config
        .summarize_timeout()
        .unwrap_or(DEFAULT_TIMEOUT)
        .max(session.config.request_timeout());
    let host = LocalModelHost::new(session.config.summarizer_endpoint.as_deref(), host_timeout)?;

    let mut negotiator =
        Negotiator::new(Arc::new(host), session.api()).with_timeout(session.config.summarize_timeout());
    let mut events = negotiator.subscribe();

    let show_progress = format == OutputFormat::Table;
    let printer = tokio::spawn(async move {
        let mut last_progress = None;
        while let Some(event) = events.recv().await {
            if !show_progress {
                continue;
            }
            match event {
                NegotiationEvent::State(state) => {
                    if let Some(text) = describe(&state) {
                        print_info(&text);
                    }
                }
                NegotiationEvent::Progress(percent) => {
                    if last_progress != Some(percent) {
                        print_info(&format!("Loading model: {}%", percent));
                        last_progress = Some(percent);
                    }
                }
                NegotiationEvent::Notice(notice) => print_warning(notice.message()),
            }
        }
    });

    let result = negotiator.summarize(container).await;
    drop(negotiator);
    let _ = printer.await;

    let summary = result?;
    session.ensure_active()?;

    if format == OutputFormat::Json {
        return print_json(&summary);
    }

    println!();
    print_heading(&format!("Log summary: {}", summary.container_name));
    println!("{}", summary.summary);
    println!();
    let mut footer = format!(
        "Based on {} log lines, generated {}",
        summary.line_count,
        summary.completed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if summary.truncated {
        footer.push_str(" (input truncated to the most recent output)");
    }
    println!("{}", footer.dimmed());
    Ok(())
}
