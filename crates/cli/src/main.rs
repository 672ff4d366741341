//! nabd operations console
//!
//! A command-line console for monitoring Docker containers through the
//! nabd backend: live dashboard, logs, metric history, auto-heal
//! remediation and AI log summaries.

mod commands;
mod output;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{auth, autoheal, charts, dashboard, logs, summarize};
use console_lib::timeseries::TimeRange;
use console_lib::views::{DEFAULT_LOG_LINES, LOG_LINE_CHOICES};
use console_lib::ConsoleMetrics;
use session::Session;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// nabd operations console
#[derive(Parser)]
#[command(name = "nabd")]
#[command(author, version, about = "Operations console for nabd container monitoring", long_about = None)]
pub struct Cli {
    /// API endpoint URL (overrides the configuration file)
    #[arg(long, env = "NABD_API_URL")]
    pub api_url: Option<String>,

    /// Path to a configuration file (defaults to ~/.config/nabd/config.toml)
    #[arg(long, env = "NABD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with an admin token
    Login {
        /// Admin token issued by the backend
        #[arg(long, env = "NABD_ADMIN_TOKEN", hide_env_values = true)]
        token: String,
    },

    /// Forget the stored credential
    Logout,

    /// Show containers, resource usage and active alerts
    Dashboard {
        /// Keep refreshing until interrupted
        #[arg(long, short)]
        watch: bool,
    },

    /// Show recent logs of a container
    Logs {
        /// Container name
        container: String,

        /// Number of lines (50, 100, 200 or 500)
        #[arg(long, short = 'n', default_value_t = DEFAULT_LOG_LINES, value_parser = parse_log_lines)]
        lines: u32,

        /// Keep refreshing until interrupted
        #[arg(long, short)]
        follow: bool,
    },

    /// Restart a container
    Restart {
        /// Container name
        name: String,
    },

    /// Auto-heal history and manual trigger
    #[command(subcommand)]
    Autoheal(AutohealCommands),

    /// Show metric history of a container
    Charts {
        /// Container name
        container: String,

        /// Time range (1h, 6h, 24h, 3d or 1w)
        #[arg(long, short, default_value = "24h")]
        range: TimeRange,
    },

    /// Summarize recent logs of a container with a local model
    Summarize {
        /// Container name
        container: String,
    },
}

#[derive(Subcommand)]
pub enum AutohealCommands {
    /// Show recent auto-heal events
    History {
        /// Number of events to fetch
        #[arg(long, short)]
        limit: Option<u32>,

        /// Keep refreshing until interrupted
        #[arg(long, short)]
        watch: bool,
    },

    /// Run an auto-heal check now
    Trigger,
}

fn parse_log_lines(value: &str) -> Result<u32, String> {
    let lines: u32 = value.parse().map_err(|_| format!("'{}' is not a number", value))?;
    if LOG_LINE_CHOICES.contains(&lines) {
        Ok(lines)
    } else {
        Err(format!("lines must be one of {:?}", LOG_LINE_CHOICES))
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let session = Session::open(cli.config.as_deref(), cli.api_url.as_deref())?;
    let format = cli.format;

    match &cli.command {
        Commands::Login { token } => auth::login(&session, token).await?,
        Commands::Logout => auth::logout(&session)?,
        Commands::Dashboard { watch } => dashboard::show(&session, *watch, format).await?,
        Commands::Logs {
            container,
            lines,
            follow,
        } => logs::show(&session, container, *lines, *follow, format).await?,
        Commands::Restart { name } => dashboard::restart(&session, name, format).await?,
        Commands::Autoheal(cmd) => match cmd {
            AutohealCommands::History { limit, watch } => {
                autoheal::history(&session, *limit, *watch, format).await?
            }
            AutohealCommands::Trigger => autoheal::trigger(&session, format).await?,
        },
        Commands::Charts { container, range } => {
            charts::show(&session, container, *range, format).await?
        }
        Commands::Summarize { container } => summarize::run(&session, container, format).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let result = run(&cli).await;

    if cli.metrics {
        eprintln!("{}", ConsoleMetrics::new().gather_text());
    }
    if let Err(e) = &result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
