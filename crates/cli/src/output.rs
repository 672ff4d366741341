//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use console_lib::AlertSeverity;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table, or a note when there is nothing to show
pub fn print_table<T: Tabled>(items: &[T], empty: &str) {
    if items.is_empty() {
        println!("{}", empty.yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Clear the terminal before redrawing a watched view
pub fn clear_screen() {
    print!("\x1B[2J\x1B[H");
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Color a container state or status word
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "running" | "success" | "ok" => status.green().to_string(),
        "restarting" | "paused" | "created" => status.yellow().to_string(),
        "exited" | "dead" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

pub fn color_severity(severity: AlertSeverity) -> String {
    let text = severity.to_string();
    match severity {
        AlertSeverity::Critical => text.red().bold().to_string(),
        AlertSeverity::Warning => text.yellow().to_string(),
        AlertSeverity::Info => text.blue().to_string(),
        AlertSeverity::Unknown => text,
    }
}

/// Color CPU usage: red above 80%, yellow above 50%
pub fn color_cpu(percent: f64) -> String {
    let formatted = format_percent(percent);
    if percent > 80.0 {
        formatted.red().to_string()
    } else if percent > 50.0 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(12.345), "12.3%");
        assert_eq!(format_percent(0.0), "0.0%");
    }
}
