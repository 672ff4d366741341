//! Metric history for one container

use anyhow::Result;
use colored::Colorize;
use console_lib::timeseries::{self, ChartPoint, TimeRange};
use tabled::Tabled;

use crate::output::{
    color_cpu, format_bytes, format_percent, print_heading, print_json, print_table, OutputFormat,
};
use crate::session::Session;

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Mem %")]
    memory_percent: String,
    #[tabled(rename = "Net RX")]
    rx: String,
    #[tabled(rename = "Net TX")]
    tx: String,
}

impl From<&ChartPoint> for PointRow {
    fn from(point: &ChartPoint) -> Self {
        Self {
            time: point.time.clone(),
            cpu: color_cpu(point.cpu_percent),
            memory: format_bytes(point.memory_usage),
            memory_percent: format_percent(point.memory_percentage),
            rx: format_bytes(point.network_rx),
            tx: format_bytes(point.network_tx),
        }
    }
}

pub async fn show(
    session: &Session,
    container: &str,
    range: TimeRange,
    format: OutputFormat,
) -> Result<()> {
    session.require_login()?;
    let api = session.api();
    let series = timeseries::load_series(api.as_ref(), container, range).await?;

    if format == OutputFormat::Json {
        return print_json(&series);
    }

    print_heading(&format!("{} ({})", series.container.name, range.label()));
    println!("Image: {}   State: {}", series.container.image.cyan(), series.container.state);
    println!();

    let rows: Vec<PointRow> = series.points.iter().map(PointRow::from).collect();
    print_table(&rows, "No metrics data available for this range");

    if let (Some(first), Some(last)) = (series.points.first(), series.points.last()) {
        let peak_cpu = series
            .points
            .iter()
            .map(|p| p.cpu_percent)
            .fold(0.0_f64, f64::max);
        println!();
        println!(
            "{} samples from {} to {}, peak CPU {}",
            series.points.len(),
            first.timestamp.format("%Y-%m-%d %H:%M"),
            last.timestamp.format("%Y-%m-%d %H:%M"),
            format_percent(peak_cpu)
        );
    }
    Ok(())
}
