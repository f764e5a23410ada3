//! Agent configuration

use anyhow::{Context, Result};
use opsloop_lib::{LoopConfig, ProjectContext};
use serde::Deserialize;
use std::path::PathBuf;

/// Agent configuration
///
/// Read from an optional `opsloop.toml` in the working directory, then from
/// `OPSLOOP_*` environment variables (e.g. `OPSLOOP_DEFAULT_CLOUD=gcp`,
/// `OPSLOOP_SERVICES=web,api`).
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Name attached to every structured log record
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for health/status/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Where learned knowledge is restored from and saved to
    #[serde(default)]
    pub learning_data_path: Option<PathBuf>,

    /// JSON file holding the project context
    #[serde(default)]
    pub context_file: Option<PathBuf>,

    /// Run the deployment pipeline before monitoring starts
    #[serde(default = "default_deploy_on_start")]
    pub deploy_on_start: bool,

    #[serde(flatten)]
    pub control_loop: LoopConfig,
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "opsloop".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_deploy_on_start() -> bool {
    true
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            api_port: default_api_port(),
            learning_data_path: None,
            context_file: None,
            deploy_on_start: default_deploy_on_start(),
            control_loop: LoopConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("opsloop").required(false))
            .add_source(
                config::Environment::with_prefix("OPSLOOP")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("services"),
            )
            .build()
            .context("Failed to read agent configuration")?;

        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    /// Project context from `context_file`, or defaults when none is set
    pub fn project_context(&self) -> Result<ProjectContext> {
        match &self.context_file {
            Some(path) => {
                let data = std::fs::read(path)
                    .with_context(|| format!("Failed to read context file {:?}", path))?;
                serde_json::from_slice(&data)
                    .with_context(|| format!("Invalid project context in {:?}", path))
            }
            None => Ok(ProjectContext::default()),
        }
    }
}
