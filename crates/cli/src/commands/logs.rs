//! Container log viewer

use anyhow::Result;
use colored::Colorize;
use console_lib::views::LogsFeeds;

use super::{drive, start_view};
use crate::output::{print_heading, print_json, OutputFormat};
use crate::session::Session;

/// Print the most recent lines of a container, re-fetching while `follow` is set
pub async fn show(
    session: &Session,
    container: &str,
    lines: u32,
    follow: bool,
    format: OutputFormat,
) -> Result<()> {
    session.require_login()?;
    let feeds = LogsFeeds::new(container, lines);
    let handle = start_view(feeds, session, session.config.logs_interval())?;

    drive(&handle, session, follow, format, |state| {
        let lines = state.model.lines.items();
        if format == OutputFormat::Json {
            return print_json(lines);
        }

        print_heading(&format!("Logs: {} (last {} lines)", container, lines.len()));
        if lines.is_empty() {
            println!("{}", "No logs available".yellow());
        }
        for line in lines {
            println!("{}", line);
        }
        Ok(())
    })
    .await
}
