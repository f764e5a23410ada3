//! Rule analyzers
//!
//! Each analyzer inspects one concern of a [`SystemState`] and proposes
//! zero or more decisions. Analyzers are pure: they hold no state beyond
//! their enable flag and read thresholds from the input.

use super::{ActionType, Decision, Priority, Thresholds};
use crate::models::{AlertSeverity, AlertType, Environment, ProjectContext, SystemState};
use chrono::{DateTime, Duration, Utc};

/// Deployments younger than this are blamed for error spikes
pub const RECENT_DEPLOYMENT_WINDOW_MINS: i64 = 60;

/// Local hours before which usage counts as off-hours
pub const BUSINESS_HOURS_START: u32 = 8;

/// Local hours after which usage counts as off-hours
pub const BUSINESS_HOURS_END: u32 = 18;

/// Everything an analyzer may look at for one cycle
pub struct AnalysisInput<'a> {
    pub state: &'a SystemState,
    pub context: &'a ProjectContext,
    pub thresholds: &'a Thresholds,
    pub now: DateTime<Utc>,
    /// Local hour of day, 0..=23
    pub local_hour: u32,
}

/// One independent concern of the decision engine
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    fn analyze(&self, input: &AnalysisInput<'_>) -> Vec<Decision>;
}

/// CPU, memory and latency driven scaling. Gated by `auto_scale`.
pub struct PerformanceAnalyzer {
    pub enabled: bool,
}

impl Analyzer for PerformanceAnalyzer {
    fn name(&self) -> &'static str {
        "performance"
    }

    fn analyze(&self, input: &AnalysisInput<'_>) -> Vec<Decision> {
        if !self.enabled {
            return Vec::new();
        }

        let state = input.state;
        let thresholds = input.thresholds;
        let mut decisions = Vec::new();

        if state.cpu_usage > thresholds.cpu_scale_up {
            decisions.push(
                Decision::new(ActionType::ScaleUp, Priority::High, "compute")
                    .param("metric", "cpu")
                    .param("increase", "25%")
                    .reasoning(format!(
                        "CPU usage at {:.1}% exceeds threshold {:.1}%",
                        state.cpu_usage, thresholds.cpu_scale_up
                    ))
                    .expected_outcome("Reduced CPU load and improved response times")
                    .at(input.now),
            );
        } else if state.cpu_usage < thresholds.cpu_scale_down {
            decisions.push(
                Decision::new(ActionType::ScaleDown, Priority::Low, "compute")
                    .param("metric", "cpu")
                    .param("decrease", "20%")
                    .reasoning(format!(
                        "CPU usage at {:.1}% is below threshold {:.1}%",
                        state.cpu_usage, thresholds.cpu_scale_down
                    ))
                    .expected_outcome("Cost optimization while maintaining performance")
                    .at(input.now),
            );
        }

        if state.memory_usage > thresholds.memory_scale_up {
            decisions.push(
                Decision::new(ActionType::ScaleUp, Priority::High, "memory")
                    .param("metric", "memory")
                    .param("increase", "30%")
                    .reasoning(format!(
                        "Memory usage at {:.1}% exceeds threshold {:.1}%",
                        state.memory_usage, thresholds.memory_scale_up
                    ))
                    .expected_outcome("Prevented out-of-memory errors")
                    .at(input.now),
            );
        }

        if state.response_time > thresholds.response_time {
            let reasoning = format!(
                "Response time {:.2}s exceeds threshold {:.2}s",
                state.response_time, thresholds.response_time
            );
            let decision = if input.context.caching_enabled() {
                Decision::new(ActionType::OptimizePerformance, Priority::Medium, "cache")
                    .param("action", "increase_cache_size")
                    .param("amount", "50%")
                    .expected_outcome("Improved response times through better caching")
            } else {
                Decision::new(ActionType::ScaleUp, Priority::Medium, "compute")
                    .param("metric", "instances")
                    .param("increase", "1")
                    .expected_outcome("Improved response times through horizontal scaling")
            };
            decisions.push(decision.reasoning(reasoning).at(input.now));
        }

        decisions
    }
}

/// Service healing, error-rate remediation and disk cleanup. Gated by
/// `auto_heal`.
pub struct HealthAnalyzer {
    pub enabled: bool,
}

impl Analyzer for HealthAnalyzer {
    fn name(&self) -> &'static str {
        "health"
    }

    fn analyze(&self, input: &AnalysisInput<'_>) -> Vec<Decision> {
        if !self.enabled {
            return Vec::new();
        }

        let state = input.state;
        let thresholds = input.thresholds;
        let mut decisions = Vec::new();

        for service in state.unhealthy_services() {
            decisions.push(
                Decision::new(ActionType::HealService, Priority::Critical, service)
                    .param("action", "restart")
                    .param("max_attempts", 3)
                    .reasoning(format!("Service {} is unhealthy", service))
                    .expected_outcome("Service restoration")
                    .rollback("action", "manual_intervention_required")
                    .at(input.now),
            );
        }

        if state.error_rate > thresholds.error_rate {
            let recently_deployed = state
                .last_deployment
                .map(|at| input.now - at < Duration::minutes(RECENT_DEPLOYMENT_WINDOW_MINS))
                .unwrap_or(false);

            if recently_deployed {
                decisions.push(
                    Decision::new(ActionType::Rollback, Priority::Critical, "deployment")
                        .param("target", "previous_stable")
                        .reasoning(format!(
                            "Error rate {:.2}% after recent deployment",
                            state.error_rate
                        ))
                        .expected_outcome("Restored system stability")
                        .at(input.now),
                );
            } else {
                decisions.push(
                    Decision::new(ActionType::RestartService, Priority::High, "application")
                        .param("graceful", true)
                        .param("timeout", "30s")
                        .reasoning(format!("High error rate {:.2}% detected", state.error_rate))
                        .expected_outcome("Cleared potential memory leaks or deadlocks")
                        .at(input.now),
                );
            }
        }

        if state.disk_usage > thresholds.disk_usage {
            decisions.push(
                Decision::new(ActionType::OptimizePerformance, Priority::Medium, "storage")
                    .param("action", "cleanup_logs")
                    .param("retention", "7d")
                    .reasoning(format!("Disk usage at {:.1}% is critical", state.disk_usage))
                    .expected_outcome("Free disk space and prevent service interruption")
                    .at(input.now),
            );
        }

        decisions
    }
}

/// Reactions to security and certificate alerts
pub struct SecurityAnalyzer;

impl Analyzer for SecurityAnalyzer {
    fn name(&self) -> &'static str {
        "security"
    }

    fn analyze(&self, input: &AnalysisInput<'_>) -> Vec<Decision> {
        let mut decisions = Vec::new();

        for alert in input
            .state
            .alerts
            .iter()
            .filter(|a| a.alert_type == AlertType::Security && a.severity >= AlertSeverity::High)
        {
            decisions.push(
                Decision::new(ActionType::UpdateSecurity, Priority::Critical, "firewall")
                    .param("action", "block_suspicious_ips")
                    .param("alert_id", alert.id.clone())
                    .reasoning(format!("High severity security alert: {}", alert.message))
                    .expected_outcome("Mitigated security threat")
                    .at(input.now),
            );
        }

        for alert in &input.state.alerts {
            let message = alert.message.to_lowercase();
            if message.contains("ssl") && message.contains("expir") {
                decisions.push(
                    Decision::new(ActionType::UpdateSecurity, Priority::High, "certificates")
                        .param("action", "renew_certificates")
                        .param("alert_id", alert.id.clone())
                        .reasoning("SSL certificate expiring soon")
                        .expected_outcome("Maintained secure connections")
                        .at(input.now),
                );
            }
        }

        decisions
    }
}

/// Cost optimizations. The off-hours scale-down follows `auto_scale`.
pub struct CostAnalyzer {
    pub scaling_enabled: bool,
}

impl CostAnalyzer {
    fn is_off_hours(hour: u32) -> bool {
        hour < BUSINESS_HOURS_START || hour > BUSINESS_HOURS_END
    }
}

impl Analyzer for CostAnalyzer {
    fn name(&self) -> &'static str {
        "cost"
    }

    fn analyze(&self, input: &AnalysisInput<'_>) -> Vec<Decision> {
        let state = input.state;
        let mut decisions = Vec::new();

        if self.scaling_enabled
            && Self::is_off_hours(input.local_hour)
            && input.context.environment != Environment::Production
            && state.cpu_usage < 20.0
            && state.memory_usage < 30.0
        {
            decisions.push(
                Decision::new(ActionType::ScaleDown, Priority::Low, "compute")
                    .param("schedule", "off_hours")
                    .param("reduction", "50%")
                    .reasoning("Low usage during off-hours detected")
                    .expected_outcome("Reduced infrastructure costs")
                    .at(input.now),
            );
        }

        if state.cpu_usage < 5.0 && state.memory_usage < 10.0 {
            decisions.push(
                Decision::new(ActionType::OptimizePerformance, Priority::Low, "resources")
                    .param("action", "identify_unused")
                    .param("threshold", "1h")
                    .reasoning("Very low resource utilization detected")
                    .expected_outcome("Cost savings through resource optimization")
                    .at(input.now),
            );
        }

        decisions
    }
}
