//! Monitoring subsystem
//!
//! Produces [`SystemState`](crate::models::SystemState) snapshots on demand
//! and keeps the alert set, metric history and service health current
//! through independently scheduled background tasks.

mod alerts;
mod series;
mod source;
mod system;

pub use alerts::{evaluate_thresholds, AlertStore, ALERT_TTL_MINS};
pub use series::{MetricPoint, MetricStats, MetricStore, MetricsSummary, METRIC_RETENTION_HOURS};
pub use source::{SimulatedMetricSource, SimulatedSecurityFeed, SimulatedServiceChecker};
pub use system::{MonitoringStatus, MonitoringSystem, MonitoringSystemBuilder};

use crate::error::Result;
use crate::models::{Alert, MetricSample};

use async_trait::async_trait;

/// Source of raw system metrics
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn sample(&self) -> Result<MetricSample>;
}

/// Liveness check for a named service
#[async_trait]
pub trait ServiceChecker: Send + Sync {
    /// `Ok(false)` means the service answered and is down; `Err` means the
    /// check itself could not complete
    async fn check(&self, service: &str) -> Result<bool>;
}

/// Source of security findings not derivable from metrics
#[async_trait]
pub trait SecurityFeed: Send + Sync {
    async fn poll(&self) -> Vec<Alert>;
}
