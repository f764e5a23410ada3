//! Service health tracking
//!
//! Keeps the last known status of every monitored service. The health
//! checker writes into the registry; state snapshots and the status API
//! read from it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a monitored service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Last check reported the service healthy
    Healthy,
    /// The check itself failed or timed out; the service state is uncertain
    Degraded,
    /// Last check reported the service down
    Unhealthy,
}

impl ServiceStatus {
    /// Returns true unless the service is known to be down
    pub fn is_operational(&self) -> bool {
        matches!(self, ServiceStatus::Healthy | ServiceStatus::Degraded)
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Healthy => write!(f, "healthy"),
            ServiceStatus::Degraded => write!(f, "degraded"),
            ServiceStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Last observed health of one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ServiceHealth {
    pub fn healthy() -> Self {
        Self {
            status: ServiceStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ServiceStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ServiceStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Aggregate health report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ServiceStatus,
    pub services: BTreeMap<String, ServiceHealth>,
}

impl HealthReport {
    /// Worst status across all services
    pub fn compute_status(services: &BTreeMap<String, ServiceHealth>) -> ServiceStatus {
        let mut has_degraded = false;

        for health in services.values() {
            match health.status {
                ServiceStatus::Unhealthy => return ServiceStatus::Unhealthy,
                ServiceStatus::Degraded => has_degraded = true,
                ServiceStatus::Healthy => {}
            }
        }

        if has_degraded {
            ServiceStatus::Degraded
        } else {
            ServiceStatus::Healthy
        }
    }
}

/// Registry of monitored services and their last known health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    services: Arc<RwLock<HashMap<String, ServiceHealth>>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            services: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry pre-populated with healthy entries for `names`
    pub fn with_services<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let services = names
            .into_iter()
            .map(|name| (name.as_ref().to_string(), ServiceHealth::healthy()))
            .collect();
        Self {
            services: Arc::new(RwLock::new(services)),
        }
    }

    /// Register a service with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut services = self.services.write().await;
        services
            .entry(name.to_string())
            .or_insert_with(ServiceHealth::healthy);
    }

    pub async fn update(&self, name: &str, health: ServiceHealth) {
        let mut services = self.services.write().await;
        services.insert(name.to_string(), health);
    }

    /// Full report, copied out of the lock
    pub async fn report(&self) -> HealthReport {
        let services: BTreeMap<String, ServiceHealth> = self
            .services
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let status = HealthReport::compute_status(&services);
        HealthReport { status, services }
    }

    /// Service name to operational flag, as carried by a system state snapshot
    pub async fn health_map(&self) -> BTreeMap<String, bool> {
        self.services
            .read()
            .await
            .iter()
            .map(|(name, health)| (name.clone(), health.status.is_operational()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let report = registry.report().await;

        assert_eq!(report.status, ServiceStatus::Healthy);
        assert!(report.services.is_empty());
    }

    #[tokio::test]
    async fn test_register_does_not_overwrite_existing_status() {
        let registry = HealthRegistry::new();
        registry.register("api").await;
        registry
            .update("api", ServiceHealth::unhealthy("connection refused"))
            .await;
        registry.register("api").await;

        let report = registry.report().await;
        assert_eq!(report.services["api"].status, ServiceStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_degraded_service_still_operational() {
        let registry = HealthRegistry::with_services(["api", "cache"]);
        registry
            .update("cache", ServiceHealth::degraded("health check timed out"))
            .await;

        let report = registry.report().await;
        assert_eq!(report.status, ServiceStatus::Degraded);

        let map = registry.health_map().await;
        assert_eq!(map.get("cache"), Some(&true));
        assert_eq!(map.get("api"), Some(&true));
    }

    #[tokio::test]
    async fn test_unhealthy_service_reported_down() {
        let registry = HealthRegistry::with_services(["api", "database"]);
        registry
            .update("database", ServiceHealth::unhealthy("health check failed"))
            .await;

        let report = registry.report().await;
        assert_eq!(report.status, ServiceStatus::Unhealthy);
        assert_eq!(registry.health_map().await.get("database"), Some(&false));
        assert_eq!(
            report.services.keys().collect::<Vec<_>>(),
            vec!["api", "database"]
        );
    }
}
