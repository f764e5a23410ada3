//! Control loop configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Cloud provider used by the scale handlers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    #[default]
    Aws,
    Gcp,
    Azure,
    Generic,
}

impl FromStr for CloudProvider {
    type Err = std::convert::Infallible;

    /// Unrecognized providers fall back to [`CloudProvider::Generic`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "aws" => CloudProvider::Aws,
            "gcp" => CloudProvider::Gcp,
            "azure" => CloudProvider::Azure,
            _ => CloudProvider::Generic,
        })
    }
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "aws"),
            CloudProvider::Gcp => write!(f, "gcp"),
            CloudProvider::Azure => write!(f, "azure"),
            CloudProvider::Generic => write!(f, "generic"),
        }
    }
}

/// Configuration consumed by the control loop core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    #[serde(default)]
    pub default_cloud: CloudProvider,

    /// Metric collection and decision loop interval in seconds
    #[serde(default = "default_monitoring_interval")]
    pub monitoring_interval_secs: u64,

    /// Alert evaluation interval in seconds
    #[serde(default = "default_alert_interval")]
    pub alert_interval_secs: u64,

    /// Service health check interval in seconds
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,

    /// Per-service health check timeout in seconds
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_secs: u64,

    /// Gates the scaling analyzer
    #[serde(default = "default_true")]
    pub auto_scale: bool,

    /// Gates the healing analyzer
    #[serde(default = "default_true")]
    pub auto_heal: bool,

    /// Backoff after a failed decision cycle, in seconds
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,

    /// Delay between heal attempts, in seconds
    #[serde(default = "default_heal_retry_delay")]
    pub heal_retry_delay_secs: u64,

    /// Services checked by the health checker
    #[serde(default = "default_services")]
    pub services: Vec<String>,
}

fn default_monitoring_interval() -> u64 {
    60
}

fn default_alert_interval() -> u64 {
    30
}

fn default_health_interval() -> u64 {
    60
}

fn default_health_check_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_error_backoff() -> u64 {
    10
}

fn default_heal_retry_delay() -> u64 {
    5
}

fn default_services() -> Vec<String> {
    ["web", "api", "database", "cache", "queue"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            default_cloud: CloudProvider::default(),
            monitoring_interval_secs: default_monitoring_interval(),
            alert_interval_secs: default_alert_interval(),
            health_interval_secs: default_health_interval(),
            health_check_timeout_secs: default_health_check_timeout(),
            auto_scale: true,
            auto_heal: true,
            error_backoff_secs: default_error_backoff(),
            heal_retry_delay_secs: default_heal_retry_delay(),
            services: default_services(),
        }
    }
}

impl LoopConfig {
    pub fn monitoring_interval(&self) -> Duration {
        Duration::from_secs(self.monitoring_interval_secs.max(1))
    }

    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_interval_secs.max(1))
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval_secs.max(1))
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs.max(1))
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn heal_retry_delay(&self) -> Duration {
        Duration::from_secs(self.heal_retry_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_config_default() {
        let config = LoopConfig::default();
        assert_eq!(config.default_cloud, CloudProvider::Aws);
        assert_eq!(config.monitoring_interval(), Duration::from_secs(60));
        assert_eq!(config.alert_interval(), Duration::from_secs(30));
        assert_eq!(config.health_interval(), Duration::from_secs(60));
        assert_eq!(config.error_backoff(), Duration::from_secs(10));
        assert!(config.auto_scale);
        assert!(config.auto_heal);
        assert_eq!(config.services.len(), 5);
    }

    #[test]
    fn test_loop_config_partial_deserialize() {
        let config: LoopConfig =
            serde_json::from_str(r#"{"default_cloud":"gcp","auto_heal":false}"#).unwrap();
        assert_eq!(config.default_cloud, CloudProvider::Gcp);
        assert!(!config.auto_heal);
        assert!(config.auto_scale);
        assert_eq!(config.monitoring_interval_secs, 60);
    }

    #[test]
    fn test_cloud_provider_from_str_falls_back_to_generic() {
        assert_eq!("AWS".parse::<CloudProvider>().unwrap(), CloudProvider::Aws);
        assert_eq!("azure".parse::<CloudProvider>().unwrap(), CloudProvider::Azure);
        assert_eq!(
            "digitalocean".parse::<CloudProvider>().unwrap(),
            CloudProvider::Generic
        );
    }
}
