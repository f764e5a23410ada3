//! opsloop CLI
//!
//! A command-line tool for inspecting a running opsloop agent and for
//! previewing the infrastructure and deployment plans it would create.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{history, plan, status};
use opsloop_lib::CloudProvider;
use std::path::PathBuf;

/// opsloop CLI
#[derive(Parser)]
#[command(name = "opsctl")]
#[command(author, version, about = "CLI for the opsloop autonomous operations agent", long_about = None)]
pub struct Cli {
    /// Agent API URL (can also be set via OPSLOOP_API_URL env var)
    #[arg(long, env = "OPSLOOP_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show agent status
    Status,

    /// Show decisions made in the last hour
    Decisions,

    /// Show recent action executions
    Executions,

    /// Show the learning summary
    Learning,

    /// Show service health
    Services,

    /// Show metric statistics
    Summary {
        /// Look-back window in hours
        #[arg(long, default_value_t = 1)]
        hours: u32,
    },

    /// Preview plans for a project context without contacting the agent
    #[command(subcommand)]
    Plan(PlanCommands),
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Show the infrastructure plan
    Infra {
        /// Project context JSON file
        #[arg(long)]
        context: PathBuf,

        /// Cloud provider (aws, gcp, azure)
        #[arg(long, default_value = "aws")]
        cloud: CloudProvider,
    },

    /// Show the deployment pipeline
    Deploy {
        /// Project context JSON file
        #[arg(long)]
        context: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Plans are computed locally
    if let Commands::Plan(plan_cmd) = &cli.command {
        return match plan_cmd {
            PlanCommands::Infra { context, cloud } => {
                plan::show_infrastructure(context, *cloud, cli.format)
            }
            PlanCommands::Deploy { context } => plan::show_deployment(context, cli.format),
        };
    }

    let api_url = config::Config::load()?.api_url(cli.api_url.as_deref());
    if cli.verbose {
        output::print_info(&format!("Using agent at {}", api_url));
    }
    let client = client::ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Status => status::show_status(&client, cli.format).await?,
        Commands::Services => status::show_services(&client, cli.format).await?,
        Commands::Summary { hours } => status::show_summary(&client, hours, cli.format).await?,
        Commands::Decisions => history::show_decisions(&client, cli.format).await?,
        Commands::Executions => history::show_executions(&client, cli.format).await?,
        Commands::Learning => history::show_learning(&client, cli.format).await?,
        Commands::Plan(_) => {}
    }

    Ok(())
}
