//! Observability infrastructure for the control loop
//!
//! Provides:
//! - Prometheus metrics (cycle and action latency, decision and action counts,
//!   active alerts, stored samples, learned outcomes)
//! - Structured logging of loop events with tracing

use crate::decision::Decision;
use crate::executor::ExecutionResult;
use crate::models::{Alert, AlertSeverity};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for cycle and action latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    cycle_latency_seconds: Histogram,
    action_latency_seconds: Histogram,
    decisions_total: IntCounterVec,
    action_successes: IntCounter,
    action_failures: IntCounter,
    cycle_errors: IntCounter,
    active_alerts: IntGauge,
    metric_samples: IntGauge,
    learned_outcomes: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "opsloop_cycle_latency_seconds",
                "Time spent in one monitor-decide-act-learn cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            action_latency_seconds: register_histogram!(
                "opsloop_action_latency_seconds",
                "Time spent executing a single decision",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register action_latency_seconds"),

            decisions_total: register_int_counter_vec!(
                "opsloop_decisions_total",
                "Decisions emitted by the decision engine",
                &["action", "priority"]
            )
            .expect("Failed to register decisions_total"),

            action_successes: register_int_counter!(
                "opsloop_action_successes_total",
                "Actions that completed successfully"
            )
            .expect("Failed to register action_successes_total"),

            action_failures: register_int_counter!(
                "opsloop_action_failures_total",
                "Actions that failed"
            )
            .expect("Failed to register action_failures_total"),

            cycle_errors: register_int_counter!(
                "opsloop_cycle_errors_total",
                "Decision cycles aborted by an error"
            )
            .expect("Failed to register cycle_errors_total"),

            active_alerts: register_int_gauge!(
                "opsloop_active_alerts",
                "Alerts currently active"
            )
            .expect("Failed to register active_alerts"),

            metric_samples: register_int_gauge!(
                "opsloop_metric_samples",
                "Metric data points held in the time series store"
            )
            .expect("Failed to register metric_samples"),

            learned_outcomes: register_int_gauge!(
                "opsloop_learned_outcomes",
                "Action outcomes retained by the learning module"
            )
            .expect("Failed to register learned_outcomes"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new)
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    /// Record one finished action
    pub fn observe_action(&self, duration_secs: f64, success: bool) {
        self.inner().action_latency_seconds.observe(duration_secs);
        if success {
            self.inner().action_successes.inc();
        } else {
            self.inner().action_failures.inc();
        }
    }

    pub fn inc_decision(&self, decision: &Decision) {
        let priority = decision.priority.to_string();
        self.inner()
            .decisions_total
            .with_label_values(&[decision.action_type.as_str(), priority.as_str()])
            .inc();
    }

    pub fn inc_cycle_errors(&self) {
        self.inner().cycle_errors.inc();
    }

    pub fn set_active_alerts(&self, count: usize) {
        self.inner().active_alerts.set(count as i64);
    }

    pub fn set_metric_samples(&self, count: usize) {
        self.inner().metric_samples.set(count as i64);
    }

    pub fn set_learned_outcomes(&self, count: usize) {
        self.inner().learned_outcomes.set(count as i64);
    }
}

/// Structured logger for control loop events
///
/// Every record carries an `event` field so log pipelines can filter on
/// loop activity.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    pub fn log_decision(&self, decision: &Decision) {
        info!(
            event = "decision_made",
            node = %self.node_name,
            action = %decision.action_type,
            priority = %decision.priority,
            target = %decision.target,
            reasoning = %decision.reasoning,
            "Decision made"
        );
    }

    pub fn log_action(&self, decision: &Decision, result: &ExecutionResult) {
        if result.success {
            info!(
                event = "action_executed",
                node = %self.node_name,
                action = %decision.action_type,
                target = %decision.target,
                success = true,
                execution_time = result.execution_time,
                message = %result.message,
                "Action executed"
            );
        } else {
            warn!(
                event = "action_executed",
                node = %self.node_name,
                action = %decision.action_type,
                target = %decision.target,
                success = false,
                retryable = result.retryable,
                execution_time = result.execution_time,
                message = %result.message,
                "Action failed"
            );
        }
    }

    pub fn log_alert(&self, alert: &Alert) {
        match alert.severity {
            AlertSeverity::High | AlertSeverity::Critical => {
                warn!(
                    event = "alert_raised",
                    node = %self.node_name,
                    alert_id = %alert.id,
                    alert_type = %alert.alert_type,
                    severity = %alert.severity,
                    message = %alert.message,
                    "Alert raised"
                );
            }
            _ => {
                info!(
                    event = "alert_raised",
                    node = %self.node_name,
                    alert_id = %alert.id,
                    alert_type = %alert.alert_type,
                    severity = %alert.severity,
                    message = %alert.message,
                    "Alert raised"
                );
            }
        }
    }

    pub fn log_cycle_failure(&self, error: &dyn std::fmt::Display, backoff_secs: u64) {
        error!(
            event = "cycle_failed",
            node = %self.node_name,
            error = %error,
            backoff_secs = backoff_secs,
            "Decision cycle failed, backing off"
        );
    }

    pub fn log_learning_update(&self, outcomes: usize, patterns: usize) {
        info!(
            event = "learning_updated",
            node = %self.node_name,
            outcomes = outcomes,
            patterns_discovered = patterns,
            "Learning module updated"
        );
    }

    pub fn log_startup(&self, version: &str, cloud: &str) {
        info!(
            event = "agent_started",
            node = %self.node_name,
            agent_version = %version,
            cloud = %cloud,
            "Control loop agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            reason = %reason,
            "Control loop agent shutting down"
        );
    }
}
