//! Active alert set
//!
//! Alerts are appended by the alert and health checkers and read by the
//! state snapshot. Append and prune happen under a single write guard;
//! readers get a copy.

use crate::models::{Alert, AlertSeverity, AlertType, MetricSample};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Alerts older than this are dropped on the next check pass
pub const ALERT_TTL_MINS: i64 = 60;

/// Fixed alerting thresholds applied to a sample
pub fn evaluate_thresholds(sample: &MetricSample, now: DateTime<Utc>) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if sample.cpu_usage > 90.0 {
        alerts.push(Alert::at(
            AlertType::Performance,
            AlertSeverity::High,
            format!("High CPU usage: {:.2}%", sample.cpu_usage),
            now,
        ));
    }
    if sample.memory_usage > 90.0 {
        alerts.push(Alert::at(
            AlertType::Performance,
            AlertSeverity::High,
            format!("High memory usage: {:.2}%", sample.memory_usage),
            now,
        ));
    }
    if sample.disk_usage > 85.0 {
        alerts.push(Alert::at(
            AlertType::Storage,
            AlertSeverity::Medium,
            format!("High disk usage: {:.2}%", sample.disk_usage),
            now,
        ));
    }
    if sample.response_time > 3.0 {
        alerts.push(Alert::at(
            AlertType::Performance,
            AlertSeverity::Medium,
            format!("Slow response time: {:.3}s", sample.response_time),
            now,
        ));
    }
    if sample.error_rate > 5.0 {
        alerts.push(Alert::at(
            AlertType::Error,
            AlertSeverity::High,
            format!("High error rate: {:.2}%", sample.error_rate),
            now,
        ));
    }

    alerts
}

#[derive(Debug, Clone, Default)]
pub struct AlertStore {
    alerts: Arc<RwLock<Vec<Alert>>>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append new alerts and drop expired ones atomically
    ///
    /// Returns the number of alerts still active.
    pub async fn extend_and_prune(&self, new_alerts: Vec<Alert>, now: DateTime<Utc>) -> usize {
        let ttl = Duration::minutes(ALERT_TTL_MINS);
        let mut alerts = self.alerts.write().await;
        alerts.extend(new_alerts);
        alerts.retain(|alert| !alert.is_expired(now, ttl));
        alerts.len()
    }

    pub async fn push(&self, alert: Alert) {
        self.alerts.write().await.push(alert);
    }

    pub async fn snapshot(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.alerts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.alerts.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_raise_expected_alerts() {
        let sample = MetricSample {
            cpu_usage: 95.0,
            memory_usage: 50.0,
            disk_usage: 88.0,
            network_usage: 10.0,
            response_time: 3.5,
            error_rate: 6.0,
            request_count: 10,
        };
        let alerts = evaluate_thresholds(&sample, Utc::now());

        let kinds: Vec<(AlertType, AlertSeverity)> =
            alerts.iter().map(|a| (a.alert_type, a.severity)).collect();
        assert_eq!(
            kinds,
            vec![
                (AlertType::Performance, AlertSeverity::High),
                (AlertType::Storage, AlertSeverity::Medium),
                (AlertType::Performance, AlertSeverity::Medium),
                (AlertType::Error, AlertSeverity::High),
            ]
        );
    }

    #[test]
    fn test_quiet_sample_raises_nothing() {
        let sample = MetricSample {
            cpu_usage: 40.0,
            memory_usage: 50.0,
            disk_usage: 30.0,
            response_time: 0.8,
            error_rate: 1.0,
            ..Default::default()
        };
        assert!(evaluate_thresholds(&sample, Utc::now()).is_empty());
    }

    #[tokio::test]
    async fn test_expired_alerts_pruned_on_extend() {
        let store = AlertStore::new();
        let now = Utc::now();
        store
            .push(Alert::at(
                AlertType::Storage,
                AlertSeverity::Medium,
                "old",
                now - Duration::minutes(ALERT_TTL_MINS + 5),
            ))
            .await;
        assert_eq!(store.len().await, 1);

        let fresh = Alert::at(AlertType::Error, AlertSeverity::High, "new", now);
        let remaining = store.extend_and_prune(vec![fresh], now).await;

        assert_eq!(remaining, 1);
        assert_eq!(store.snapshot().await[0].message, "new");
    }
}
