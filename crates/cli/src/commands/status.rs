//! Agent status, service health and metric summary commands

use anyhow::Result;
use chrono::{TimeZone, Utc};
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_status, format_ratio, format_timestamp, print_heading, print_json, print_rows,
    OutputFormat,
};

/// Row for service health table
#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

/// Row for metric summary table
#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Avg")]
    avg: String,
    #[tabled(rename = "Min")]
    min: String,
    #[tabled(rename = "Max")]
    max: String,
    #[tabled(rename = "Samples")]
    count: usize,
}

/// Show the agent status report
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.status().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_heading("Agent Status");
            let state = if report.is_running { "running" } else { "stopped" };
            println!("Control loop:           {}", color_status(state));

            let monitoring = &report.monitoring;
            let monitoring_state = if monitoring.is_monitoring { "running" } else { "stopped" };
            println!("Monitoring:             {}", color_status(monitoring_state));
            println!("Interval:               {}s", monitoring.monitoring_interval);
            println!("Series tracked:         {}", monitoring.metrics_collected);
            println!("Active alerts:          {}", monitoring.active_alerts);
            println!();

            println!("{}", "Activity".bold());
            println!("{}", "-".repeat(50));
            println!("Decisions (last hour):  {}", report.recent_decisions.len());
            println!("Recent executions:      {}", report.execution_history.len());

            let succeeded = report
                .execution_history
                .iter()
                .filter(|e| e.success)
                .count();
            if !report.execution_history.is_empty() {
                let rate = succeeded as f64 / report.execution_history.len() as f64;
                println!("Success rate:           {}", format_ratio(rate));
            }

            let learning = &report.learning_summary;
            println!("Outcomes learned:       {}", learning.total_actions_learned);
            if let Some(best) = &learning.most_effective_action {
                println!(
                    "Most effective action:  {} ({})",
                    best.action.to_string().cyan(),
                    format_ratio(best.effectiveness)
                );
            }
        }
    }

    Ok(())
}

/// Show per-service health
pub async fn show_services(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report = client.services().await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!(
                "{} {}",
                "Overall:".bold(),
                color_status(&report.status.to_string())
            );
            println!();

            let rows: Vec<ServiceRow> = report
                .services
                .iter()
                .map(|(name, health)| ServiceRow {
                    service: name.clone(),
                    status: color_status(&health.status.to_string()),
                    message: health.message.clone().unwrap_or_default(),
                    last_check: Utc
                        .timestamp_opt(health.last_check_timestamp, 0)
                        .single()
                        .map(|ts| format_timestamp(&ts))
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            print_rows(rows, "No services registered");
        }
    }

    Ok(())
}

/// Show metric statistics over the last `hours`
pub async fn show_summary(client: &ApiClient, hours: u32, format: OutputFormat) -> Result<()> {
    let summary = client.metrics_summary(hours).await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_heading(&format!("Metrics Summary (last {}h)", summary.period_hours));

            let rows: Vec<MetricRow> = summary
                .metrics
                .iter()
                .map(|(name, stats)| MetricRow {
                    metric: name.clone(),
                    avg: format!("{:.2}", stats.avg),
                    min: format!("{:.2}", stats.min),
                    max: format!("{:.2}", stats.max),
                    count: stats.count,
                })
                .collect();
            print_rows(rows, "No metrics collected in this period");
            println!("\nTotal datapoints: {}", summary.total_datapoints);
        }
    }

    Ok(())
}
