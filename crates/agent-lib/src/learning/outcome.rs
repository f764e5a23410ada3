//! Action outcomes and their estimation

use crate::decision::{ActionType, Decision};
use crate::models::SystemState;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Effect of one action, measured as before minus after
///
/// Positive improvements mean the metric went down (or, for health, that
/// more services are healthy).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMetrics {
    pub cpu_improvement: f64,
    pub memory_improvement: f64,
    pub response_time_improvement: f64,
    pub error_rate_improvement: f64,
    pub health_improvement: i64,
    /// Weighted indicator sum in `[0, 1]`
    pub overall_effectiveness: f64,
}

impl OutcomeMetrics {
    pub fn between(before: &SystemState, after: &SystemState) -> Self {
        let cpu_improvement = before.cpu_usage - after.cpu_usage;
        let response_time_improvement = before.response_time - after.response_time;
        let error_rate_improvement = before.error_rate - after.error_rate;
        let health_improvement =
            after.healthy_service_count() as i64 - before.healthy_service_count() as i64;

        let mut effectiveness = 0.0;
        if cpu_improvement > 0.0 {
            effectiveness += 0.3;
        }
        if response_time_improvement > 0.0 {
            effectiveness += 0.3;
        }
        if error_rate_improvement > 0.0 {
            effectiveness += 0.2;
        }
        if health_improvement > 0 {
            effectiveness += 0.2;
        }

        Self {
            cpu_improvement,
            memory_improvement: before.memory_usage - after.memory_usage,
            response_time_improvement,
            error_rate_improvement,
            health_improvement,
            overall_effectiveness: effectiveness,
        }
    }
}

/// Coarse classification of the state an action was taken in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateCategory {
    HighLoad,
    LowLoad,
    HighErrors,
    SlowResponse,
    Normal,
}

impl StateCategory {
    /// First matching rule wins: load, then errors, then latency
    pub fn of(state: &SystemState) -> Self {
        if state.cpu_usage > 80.0 || state.memory_usage > 80.0 {
            StateCategory::HighLoad
        } else if state.cpu_usage < 30.0 && state.memory_usage < 40.0 {
            StateCategory::LowLoad
        } else if state.error_rate > 5.0 {
            StateCategory::HighErrors
        } else if state.response_time > 2.0 {
            StateCategory::SlowResponse
        } else {
            StateCategory::Normal
        }
    }
}

impl std::fmt::Display for StateCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateCategory::HighLoad => write!(f, "high_load"),
            StateCategory::LowLoad => write!(f, "low_load"),
            StateCategory::HighErrors => write!(f, "high_errors"),
            StateCategory::SlowResponse => write!(f, "slow_response"),
            StateCategory::Normal => write!(f, "normal"),
        }
    }
}

/// Learning record for one executed decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub decision: Decision,
    pub execution_success: bool,
    pub state_before: SystemState,
    /// Absent when the effect was not measured
    pub state_after: Option<SystemState>,
    pub metrics: OutcomeMetrics,
    pub timestamp: DateTime<Utc>,
}

impl ActionOutcome {
    pub fn new(
        decision: Decision,
        execution_success: bool,
        state_before: SystemState,
        state_after: Option<SystemState>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let metrics = state_after
            .as_ref()
            .map(|after| OutcomeMetrics::between(&state_before, after))
            .unwrap_or_default();

        Self {
            decision,
            execution_success,
            state_before,
            state_after,
            metrics,
            timestamp,
        }
    }

    pub fn effectiveness(&self) -> f64 {
        self.metrics.overall_effectiveness
    }
}

/// Supplies the state observed after an action
pub trait OutcomeEstimator: Send + Sync {
    fn estimate_after(&self, decision: &Decision, before: &SystemState) -> Option<SystemState>;
}

/// Synthesizes plausible after-states from the action type
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedOutcomeEstimator;

impl OutcomeEstimator for SimulatedOutcomeEstimator {
    fn estimate_after(&self, decision: &Decision, before: &SystemState) -> Option<SystemState> {
        let mut rng = rand::thread_rng();
        let mut after = before.clone();
        after.captured_at = Utc::now();

        match decision.action_type {
            ActionType::ScaleUp => {
                after.cpu_usage = (before.cpu_usage - rng.gen_range(10.0..25.0)).max(10.0);
                after.response_time = (before.response_time - rng.gen_range(0.2..0.8)).max(0.1);
            }
            ActionType::ScaleDown => {
                after.cpu_usage = (before.cpu_usage + rng.gen_range(5.0..15.0)).min(100.0);
            }
            ActionType::RestartService => {
                after.error_rate = (before.error_rate - rng.gen_range(2.0..5.0)).max(0.0);
                after.response_time = (before.response_time - rng.gen_range(0.3..1.0)).max(0.1);
            }
            ActionType::HealService => {
                for healthy in after.service_health.values_mut() {
                    if !*healthy {
                        *healthy = rng.gen_bool(0.8);
                    }
                }
            }
            ActionType::OptimizePerformance => {
                after.cpu_usage = (before.cpu_usage - rng.gen_range(5.0..15.0)).max(5.0);
                after.memory_usage = (before.memory_usage - rng.gen_range(5.0..20.0)).max(5.0);
                after.response_time = (before.response_time - rng.gen_range(0.1..0.5)).max(0.1);
            }
            _ => {}
        }

        Some(after)
    }
}
