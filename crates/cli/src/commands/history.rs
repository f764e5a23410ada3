//! Decision, execution and learning history commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_priority, color_status, format_ratio, format_seconds, format_timestamp, print_heading,
    print_info, print_json, print_rows, OutputFormat,
};

/// Row for decisions table
#[derive(Tabled)]
struct DecisionRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Reasoning")]
    reasoning: String,
}

/// Row for executions table
#[derive(Tabled)]
struct ExecutionRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Row for action effectiveness table
#[derive(Tabled)]
struct EffectivenessRow {
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Effectiveness")]
    effectiveness: String,
}

/// Show decisions made in the last hour
pub async fn show_decisions(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let decisions = client.decisions().await?;

    match format {
        OutputFormat::Json => print_json(&decisions)?,
        OutputFormat::Table => {
            let rows: Vec<DecisionRow> = decisions
                .iter()
                .map(|d| DecisionRow {
                    timestamp: format_timestamp(&d.timestamp),
                    action: d.action.to_string(),
                    priority: color_priority(d.priority),
                    target: d.target.clone(),
                    reasoning: d.reasoning.clone(),
                })
                .collect();
            print_rows(rows, "No decisions in the last hour");
        }
    }

    Ok(())
}

/// Show the most recent action executions
pub async fn show_executions(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let executions = client.executions().await?;

    match format {
        OutputFormat::Json => print_json(&executions)?,
        OutputFormat::Table => {
            let rows: Vec<ExecutionRow> = executions
                .iter()
                .map(|e| ExecutionRow {
                    timestamp: format_timestamp(&e.timestamp),
                    result: color_status(if e.success { "success" } else { "failed" }),
                    duration: format_seconds(e.execution_time),
                    message: e.message.clone(),
                })
                .collect();
            print_rows(rows, "No actions executed yet");
        }
    }

    Ok(())
}

/// Show what the learning module has picked up
pub async fn show_learning(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary = client.learning().await?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_heading("Learning Summary");
            println!("Outcomes learned:       {}", summary.total_actions_learned);
            println!("Action types tracked:   {}", summary.action_types_tracked);
            println!("Patterns discovered:    {}", summary.patterns_discovered);
            println!("Learned thresholds:     {}", summary.learned_thresholds);
            println!();

            if summary.action_effectiveness_by_type.is_empty() {
                print_info("No action outcomes recorded yet");
                return Ok(());
            }

            let rows: Vec<EffectivenessRow> = summary
                .action_effectiveness_by_type
                .iter()
                .map(|(action, effectiveness)| EffectivenessRow {
                    action: action.to_string(),
                    effectiveness: format_ratio(*effectiveness),
                })
                .collect();
            print_rows(rows, "No action outcomes recorded yet");

            if let Some(best) = &summary.most_effective_action {
                println!(
                    "\n{} {} ({})",
                    "Most effective:".bold(),
                    best.action.to_string().green(),
                    format_ratio(best.effectiveness)
                );
            }
        }
    }

    Ok(())
}
