//! opsloop agent - autonomous operations control loop
//!
//! Loads the project context, plans and deploys, then runs the
//! monitor-decide-act-learn loop until interrupted. Health, status and
//! Prometheus metrics are served over HTTP.

use anyhow::{Context, Result};
use opsloop_lib::{Agent, Capabilities, StructuredLogger};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting opsloop-agent");

    // Load configuration
    let config = config::AgentConfig::load()?;
    info!(
        node_name = %config.node_name,
        cloud = %config.control_loop.default_cloud,
        interval_secs = config.control_loop.monitoring_interval_secs,
        "Agent configured"
    );

    let logger = StructuredLogger::new(&config.node_name);
    let agent = Arc::new(Agent::new(
        config.control_loop.clone(),
        Capabilities::simulated(),
        logger,
    ));

    if let Some(path) = &config.learning_data_path {
        if path.exists() {
            if let Err(e) = agent.learning().load_from(path).await {
                warn!(error = %e, path = %path.display(), "Failed to restore learning data, starting fresh");
            }
        }
    }

    if config.context_file.is_none() {
        warn!("No context file configured, using default project context");
    }
    agent.set_project_context(config.project_context()?).await;

    let infrastructure = agent.setup_infrastructure().await?;
    info!(
        plan = %serde_json::to_string(&infrastructure)?,
        "Infrastructure plan ready"
    );

    if config.deploy_on_start {
        let report = agent.deploy().await?;
        info!(
            deployment_id = %report.deployment_id,
            success = report.overall_success,
            stages = report.stage_results.len(),
            "Initial deployment finished"
        );
    }

    // Start health and status server
    let app_state = Arc::new(api::AppState::new(Arc::clone(&agent)));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    agent.start_monitoring().await?;

    // Wait for shutdown signal
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutdown signal received");
        }
        result = api_handle => {
            match result {
                Ok(Ok(())) => warn!("API server exited"),
                Ok(Err(e)) => warn!(error = %e, "API server failed"),
                Err(e) => warn!(error = %e, "API server task panicked"),
            }
        }
    }

    agent.stop().await;

    if let Some(path) = &config.learning_data_path {
        if let Err(e) = agent.learning().save_to(path).await {
            warn!(error = %e, path = %path.display(), "Failed to save learning data");
        }
    }

    Ok(())
}
