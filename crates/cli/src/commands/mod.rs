//! Subcommand implementations

pub mod auth;
pub mod autoheal;
pub mod charts;
pub mod dashboard;
pub mod logs;
pub mod summarize;

use crate::output::{self, OutputFormat};
use crate::session::Session;
use anyhow::Result;
use console_lib::poller::{FeedPollerBuilder, FeedSet, PollHandle, ViewState};
use std::time::Duration;

/// Start the poller for one view
pub fn start_view<F: FeedSet>(
    feeds: F,
    session: &Session,
    interval: Duration,
) -> Result<PollHandle<F>> {
    let poller = FeedPollerBuilder::new()
        .feeds(feeds)
        .api(session.api())
        .interval(interval)
        .build()?;
    Ok(poller.start())
}

/// Render a polled view: once after the first tick, or on every tick
/// until Ctrl-C when `watch` is set.
pub async fn drive<F: FeedSet>(
    handle: &PollHandle<F>,
    session: &Session,
    watch: bool,
    format: OutputFormat,
    mut render: impl FnMut(&ViewState<F::Model>) -> Result<()>,
) -> Result<()> {
    let mut generation = 0;
    loop {
        tokio::select! {
            next = handle.wait_for_generation(generation) => generation = next?,
            _ = tokio::signal::ctrl_c(), if watch => break,
        }
        session.ensure_active()?;

        if watch && format == OutputFormat::Table {
            output::clear_screen();
        }
        {
            let state = handle.read().await;
            render(&state)?;
            if format == OutputFormat::Table {
                if let Some(error) = &state.error {
                    output::print_error(error);
                }
            }
        }

        if !watch {
            break;
        }
    }

    handle.stop();
    Ok(())
}
