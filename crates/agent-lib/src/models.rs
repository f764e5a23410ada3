//! Core data models shared by the monitoring, decision, execution and
//! learning subsystems

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Lower bound for reported response times, in seconds
pub const MIN_RESPONSE_TIME_SECS: f64 = 0.1;

/// Raw metric values produced by a metric source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_usage: f64,
    /// Seconds
    pub response_time: f64,
    /// Percent of failed requests
    pub error_rate: f64,
    pub request_count: u64,
}

/// Deployment status as last recorded by the deployment collaborator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    #[default]
    Unknown,
    Stable,
    InProgress,
    Failed,
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentStatus::Unknown => write!(f, "unknown"),
            DeploymentStatus::Stable => write!(f, "stable"),
            DeploymentStatus::InProgress => write!(f, "in_progress"),
            DeploymentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Point-in-time health snapshot of the managed application
///
/// Built through [`SystemState::new`], which clamps percentages to `[0, 100]`
/// and response time to at least [`MIN_RESPONSE_TIME_SECS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_usage: f64,
    pub response_time: f64,
    pub error_rate: f64,
    pub request_count: u64,
    pub service_health: BTreeMap<String, bool>,
    pub alerts: Vec<Alert>,
    pub deployment_status: DeploymentStatus,
    pub last_deployment: Option<DateTime<Utc>>,
    pub captured_at: DateTime<Utc>,
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

impl SystemState {
    pub fn new(
        sample: MetricSample,
        service_health: BTreeMap<String, bool>,
        alerts: Vec<Alert>,
        deployment_status: DeploymentStatus,
        last_deployment: Option<DateTime<Utc>>,
    ) -> Self {
        let response_time = if sample.response_time.is_nan() {
            MIN_RESPONSE_TIME_SECS
        } else {
            sample.response_time.max(MIN_RESPONSE_TIME_SECS)
        };

        Self {
            cpu_usage: clamp_percent(sample.cpu_usage),
            memory_usage: clamp_percent(sample.memory_usage),
            disk_usage: clamp_percent(sample.disk_usage),
            network_usage: clamp_percent(sample.network_usage),
            response_time,
            error_rate: sample.error_rate.max(0.0),
            request_count: sample.request_count,
            service_health,
            alerts,
            deployment_status,
            last_deployment,
            captured_at: Utc::now(),
        }
    }

    /// State built from metrics alone, with no services, alerts or deployment
    pub fn from_sample(sample: MetricSample) -> Self {
        Self::new(
            sample,
            BTreeMap::new(),
            Vec::new(),
            DeploymentStatus::Unknown,
            None,
        )
    }

    pub fn with_service(mut self, name: impl Into<String>, healthy: bool) -> Self {
        self.service_health.insert(name.into(), healthy);
        self
    }

    pub fn with_alert(mut self, alert: Alert) -> Self {
        self.alerts.push(alert);
        self
    }

    pub fn with_last_deployment(mut self, at: DateTime<Utc>) -> Self {
        self.last_deployment = Some(at);
        self.deployment_status = DeploymentStatus::Stable;
        self
    }

    pub fn healthy_service_count(&self) -> usize {
        self.service_health.values().filter(|healthy| **healthy).count()
    }

    pub fn unhealthy_services(&self) -> impl Iterator<Item = &str> {
        self.service_health
            .iter()
            .filter(|(_, healthy)| !**healthy)
            .map(|(name, _)| name.as_str())
    }
}

/// Alert classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Performance,
    Storage,
    Error,
    Security,
    Health,
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::Performance => write!(f, "performance"),
            AlertType::Storage => write!(f, "storage"),
            AlertType::Error => write!(f, "error"),
            AlertType::Security => write!(f, "security"),
            AlertType::Health => write!(f, "health"),
        }
    }
}

/// Alert severity levels, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Low => write!(f, "low"),
            AlertSeverity::Medium => write!(f, "medium"),
            AlertSeverity::High => write!(f, "high"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// A detected anomaly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Create an alert stamped with the current time
    pub fn new(alert_type: AlertType, severity: AlertSeverity, message: impl Into<String>) -> Self {
        Self::at(alert_type, severity, message, Utc::now())
    }

    /// Create an alert with an explicit timestamp
    pub fn at(
        alert_type: AlertType,
        severity: AlertSeverity,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: format!("{}-alert-{}", alert_type, Uuid::new_v4().simple()),
            alert_type,
            severity,
            message: message.into(),
            timestamp,
        }
    }

    /// Whether the alert is older than `ttl` at `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.timestamp > ttl
    }
}

/// Expected load tier reported by code analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatedScale {
    #[default]
    Small,
    Medium,
    Large,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRequirements {
    #[serde(default)]
    pub estimated_scale: EstimatedScale,
    #[serde(default)]
    pub caching: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRequirements {
    /// "high" selects a blue/green rollout
    #[serde(default)]
    pub scaling_requirements: Option<String>,
}

/// Environment the managed application runs in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

/// Project description supplied once by the repository analysis collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectContext {
    pub repo_url: String,
    /// Tech-stack label such as "python", "nodejs" or "backend"
    pub project_type: String,
    pub languages: Vec<String>,
    pub frameworks: Vec<String>,
    pub database_usage: Vec<String>,
    pub performance_requirements: PerformanceRequirements,
    pub security_requirements: Vec<String>,
    pub build_tools: Vec<String>,
    pub deployment_requirements: DeploymentRequirements,
    pub environment: Environment,
}

impl ProjectContext {
    pub fn new(project_type: impl Into<String>) -> Self {
        Self {
            project_type: project_type.into(),
            ..Default::default()
        }
    }

    pub fn estimated_scale(&self) -> EstimatedScale {
        self.performance_requirements.estimated_scale
    }

    pub fn caching_enabled(&self) -> bool {
        self.performance_requirements.caching
    }

    pub fn uses_build_tool(&self, tool: &str) -> bool {
        self.build_tools.iter().any(|t| t == tool)
    }

    pub fn requires(&self, security_requirement: &str) -> bool {
        self.security_requirements
            .iter()
            .any(|r| r == security_requirement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_state_clamps_metrics() {
        let state = SystemState::from_sample(MetricSample {
            cpu_usage: 140.0,
            memory_usage: -3.0,
            disk_usage: 50.0,
            network_usage: f64::NAN,
            response_time: 0.01,
            error_rate: -1.0,
            request_count: 10,
        });

        assert_eq!(state.cpu_usage, 100.0);
        assert_eq!(state.memory_usage, 0.0);
        assert_eq!(state.disk_usage, 50.0);
        assert_eq!(state.network_usage, 0.0);
        assert_eq!(state.response_time, MIN_RESPONSE_TIME_SECS);
        assert_eq!(state.error_rate, 0.0);
    }

    #[test]
    fn test_service_counts() {
        let state = SystemState::from_sample(MetricSample::default())
            .with_service("api", true)
            .with_service("cache", false)
            .with_service("web", true);

        assert_eq!(state.healthy_service_count(), 2);
        assert_eq!(state.unhealthy_services().collect::<Vec<_>>(), vec!["cache"]);
    }

    #[test]
    fn test_alert_expiry() {
        let now = Utc::now();
        let old = Alert::at(
            AlertType::Storage,
            AlertSeverity::Medium,
            "disk",
            now - Duration::minutes(61),
        );
        let fresh = Alert::at(AlertType::Storage, AlertSeverity::Medium, "disk", now);

        assert!(old.is_expired(now, Duration::hours(1)));
        assert!(!fresh.is_expired(now, Duration::hours(1)));
        assert_ne!(old.id, fresh.id);
        assert!(old.id.starts_with("storage-alert-"));
    }

    #[test]
    fn test_project_context_defaults_to_production() {
        let ctx: ProjectContext = serde_json::from_str(r#"{"project_type":"python"}"#).unwrap();
        assert_eq!(ctx.environment, Environment::Production);
        assert_eq!(ctx.estimated_scale(), EstimatedScale::Small);
        assert!(!ctx.caching_enabled());
    }
}
