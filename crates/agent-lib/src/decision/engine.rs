//! Decision engine
//!
//! Runs the analyzers over one [`SystemState`], orders their proposals by
//! priority and keeps a rolling history for status reporting.

use super::analyzers::{
    AnalysisInput, Analyzer, CostAnalyzer, HealthAnalyzer, PerformanceAnalyzer, SecurityAnalyzer,
};
use super::planning::{self, DeploymentPlan, InfrastructurePlan};
use super::{Decision, DecisionSummary, LearnedAdjustments, Thresholds};
use crate::config::{CloudProvider, LoopConfig};
use crate::models::{ProjectContext, SystemState};
use chrono::{DateTime, Duration, Local, Timelike, Utc};
use std::cmp::Reverse;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Upper bound on decisions emitted per cycle
pub const MAX_DECISIONS_PER_CYCLE: usize = 5;

/// How long emitted decisions are kept
pub const DECISION_HISTORY_HOURS: i64 = 24;

/// Window reported by [`DecisionEngine::recent_decisions`]
pub const RECENT_DECISION_MINS: i64 = 60;

pub struct DecisionEngine {
    analyzers: Vec<Box<dyn Analyzer>>,
    thresholds: Thresholds,
    cloud_provider: CloudProvider,
    history: VecDeque<Decision>,
}

impl DecisionEngine {
    pub fn new(config: &LoopConfig) -> Self {
        let analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(PerformanceAnalyzer {
                enabled: config.auto_scale,
            }),
            Box::new(HealthAnalyzer {
                enabled: config.auto_heal,
            }),
            Box::new(SecurityAnalyzer),
            Box::new(CostAnalyzer {
                scaling_enabled: config.auto_scale,
            }),
        ];

        Self {
            analyzers,
            thresholds: Thresholds::default(),
            cloud_provider: config.default_cloud,
            history: VecDeque::new(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Replace the active thresholds with defaults plus learned overrides
    pub fn apply_learning(&mut self, adjustments: &LearnedAdjustments) {
        let thresholds = Thresholds::with_adjustments(adjustments);
        if thresholds != self.thresholds {
            info!(
                cpu_scale_up = thresholds.cpu_scale_up,
                cpu_scale_down = thresholds.cpu_scale_down,
                "Applying learned thresholds"
            );
        }
        self.thresholds = thresholds;
    }

    /// Decide for the current wall-clock time
    pub fn make_decisions(&mut self, state: &SystemState, context: &ProjectContext) -> Vec<Decision> {
        self.make_decisions_at(state, context, Utc::now(), Local::now().hour())
    }

    /// Decide as of `now`, with `local_hour` driving the off-hours rule
    pub fn make_decisions_at(
        &mut self,
        state: &SystemState,
        context: &ProjectContext,
        now: DateTime<Utc>,
        local_hour: u32,
    ) -> Vec<Decision> {
        let input = AnalysisInput {
            state,
            context,
            thresholds: &self.thresholds,
            now,
            local_hour,
        };

        let mut decisions = Vec::new();
        for analyzer in &self.analyzers {
            let proposed = analyzer.analyze(&input);
            if !proposed.is_empty() {
                debug!(analyzer = analyzer.name(), count = proposed.len(), "Analyzer proposed decisions");
            }
            decisions.extend(proposed);
        }

        // stable: equal priorities keep analyzer order
        decisions.sort_by_key(|d| Reverse(d.priority));
        decisions.truncate(MAX_DECISIONS_PER_CYCLE);

        self.history.extend(decisions.iter().cloned());
        self.prune_history(now);

        decisions
    }

    fn prune_history(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::hours(DECISION_HISTORY_HOURS);
        self.history.retain(|d| d.timestamp > cutoff);
    }

    /// Decisions emitted in the last hour
    pub fn recent_decisions(&self) -> Vec<DecisionSummary> {
        self.recent_decisions_at(Utc::now())
    }

    pub fn recent_decisions_at(&self, now: DateTime<Utc>) -> Vec<DecisionSummary> {
        let cutoff = now - Duration::minutes(RECENT_DECISION_MINS);
        self.history
            .iter()
            .filter(|d| d.timestamp > cutoff)
            .map(Decision::summary)
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn create_infrastructure_plan(&self, context: &ProjectContext) -> InfrastructurePlan {
        info!(cloud = %self.cloud_provider, "Creating infrastructure plan");
        planning::create_infrastructure_plan(context, self.cloud_provider)
    }

    pub fn create_deployment_plan(&self, context: &ProjectContext) -> DeploymentPlan {
        info!(project_type = %context.project_type, "Creating deployment plan");
        planning::create_deployment_plan(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{ActionType, Priority};
    use crate::models::{Alert, AlertSeverity, AlertType, Environment, MetricSample};

    const BUSINESS_HOUR: u32 = 12;

    fn sample(cpu: f64, memory: f64) -> MetricSample {
        MetricSample {
            cpu_usage: cpu,
            memory_usage: memory,
            disk_usage: 40.0,
            network_usage: 20.0,
            response_time: 0.5,
            error_rate: 0.5,
            request_count: 100,
        }
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::new(&LoopConfig::default())
    }

    fn decide(engine: &mut DecisionEngine, state: &SystemState, ctx: &ProjectContext) -> Vec<Decision> {
        engine.make_decisions_at(state, ctx, Utc::now(), BUSINESS_HOUR)
    }

    #[test]
    fn test_high_cpu_scales_up_compute() {
        let state = SystemState::from_sample(sample(85.0, 50.0));
        let decisions = decide(&mut engine(), &state, &ProjectContext::default());

        assert!(decisions.iter().any(|d| d.action_type == ActionType::ScaleUp
            && d.target == "compute"
            && d.priority == Priority::High));
    }

    #[test]
    fn test_unhealthy_service_yields_one_critical_heal() {
        let state = SystemState::from_sample(sample(50.0, 50.0))
            .with_service("api", true)
            .with_service("database", false);
        let decisions = decide(&mut engine(), &state, &ProjectContext::default());

        let heals: Vec<&Decision> = decisions
            .iter()
            .filter(|d| d.action_type == ActionType::HealService)
            .collect();
        assert_eq!(heals.len(), 1);
        assert_eq!(heals[0].target, "database");
        assert_eq!(heals[0].priority, Priority::Critical);
        assert_eq!(decisions[0].action_type, ActionType::HealService);
    }

    #[test]
    fn test_errors_after_recent_deployment_roll_back() {
        let now = Utc::now();
        let mut metrics = sample(50.0, 50.0);
        metrics.error_rate = 10.0;
        let state =
            SystemState::from_sample(metrics.clone()).with_last_deployment(now - Duration::minutes(5));

        let decisions = engine().make_decisions_at(&state, &ProjectContext::default(), now, BUSINESS_HOUR);
        assert!(decisions.iter().any(|d| d.action_type == ActionType::Rollback));
        assert!(!decisions.iter().any(|d| d.action_type == ActionType::RestartService));

        let state = SystemState::from_sample(metrics).with_last_deployment(now - Duration::hours(3));
        let decisions = engine().make_decisions_at(&state, &ProjectContext::default(), now, BUSINESS_HOUR);
        assert!(decisions.iter().any(|d| d.action_type == ActionType::RestartService));
        assert!(!decisions.iter().any(|d| d.action_type == ActionType::Rollback));
    }

    #[test]
    fn test_output_bounded_and_sorted() {
        let mut metrics = sample(95.0, 95.0);
        metrics.disk_usage = 95.0;
        metrics.response_time = 4.0;
        metrics.error_rate = 12.0;
        let mut state = SystemState::from_sample(metrics);
        for service in ["web", "api", "database", "cache"] {
            state = state.with_service(service, false);
        }
        let state = state.with_alert(Alert::new(
            AlertType::Security,
            AlertSeverity::High,
            "Suspicious login attempts detected",
        ));

        let decisions = decide(&mut engine(), &state, &ProjectContext::default());
        assert_eq!(decisions.len(), MAX_DECISIONS_PER_CYCLE);
        assert!(decisions.windows(2).all(|w| w[0].priority >= w[1].priority));
        assert!(decisions.iter().all(|d| d.priority == Priority::Critical));
        // health analyzer runs before security
        assert_eq!(decisions[0].action_type, ActionType::HealService);
    }

    #[test]
    fn test_output_bounded_and_sorted_across_states() {
        let now = Utc::now();
        let mut dev = ProjectContext::new("python");
        dev.environment = Environment::Development;
        let mut cases = 0;

        for cpu in [10.0, 50.0, 85.0, 95.0] {
            for memory in [20.0, 60.0, 90.0] {
                for disk in [40.0, 95.0] {
                    for error_rate in [0.5, 12.0] {
                        for response_time in [0.5, 4.0] {
                            for (unhealthy, alert, recent_deploy) in [
                                (false, false, false),
                                (true, false, false),
                                (false, true, false),
                                (true, true, true),
                            ] {
                                let mut metrics = sample(cpu, memory);
                                metrics.disk_usage = disk;
                                metrics.error_rate = error_rate;
                                metrics.response_time = response_time;

                                let mut state = SystemState::from_sample(metrics)
                                    .with_service("api", true)
                                    .with_service("database", !unhealthy);
                                if alert {
                                    state = state.with_alert(Alert::new(
                                        AlertType::Security,
                                        AlertSeverity::Critical,
                                        "Suspicious login attempts detected",
                                    ));
                                }
                                if recent_deploy {
                                    state = state.with_last_deployment(now - Duration::minutes(10));
                                }

                                for (ctx, hour) in [(&dev, 22), (&ProjectContext::default(), BUSINESS_HOUR)] {
                                    let decisions = engine().make_decisions_at(&state, ctx, now, hour);
                                    assert!(decisions.len() <= MAX_DECISIONS_PER_CYCLE);
                                    assert!(
                                        decisions.windows(2).all(|w| w[0].priority >= w[1].priority),
                                        "unsorted decisions for cpu={} memory={} disk={}",
                                        cpu,
                                        memory,
                                        disk
                                    );
                                    cases += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
        assert_eq!(cases, 4 * 3 * 2 * 2 * 2 * 4 * 2);
    }

    #[test]
    fn test_response_time_prefers_cache_when_enabled() {
        let mut metrics = sample(50.0, 50.0);
        metrics.response_time = 3.0;
        let state = SystemState::from_sample(metrics);

        let mut ctx = ProjectContext::default();
        ctx.performance_requirements.caching = true;
        let decisions = decide(&mut engine(), &state, &ctx);
        assert_eq!(decisions[0].action_type, ActionType::OptimizePerformance);
        assert_eq!(decisions[0].target, "cache");

        let decisions = decide(&mut engine(), &state, &ProjectContext::default());
        assert_eq!(decisions[0].action_type, ActionType::ScaleUp);
        assert_eq!(decisions[0].str_param("metric"), Some("instances"));
        assert_eq!(decisions[0].priority, Priority::Medium);
    }

    #[test]
    fn test_security_and_ssl_alerts() {
        let state = SystemState::from_sample(sample(50.0, 50.0))
            .with_alert(Alert::new(AlertType::Security, AlertSeverity::Medium, "SSL certificate expiring in 7 days"))
            .with_alert(Alert::new(AlertType::Security, AlertSeverity::Low, "Port scan observed"));

        let decisions = decide(&mut engine(), &state, &ProjectContext::default());
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].target, "certificates");
        assert_eq!(decisions[0].priority, Priority::High);
    }

    #[test]
    fn test_off_hours_scale_down_only_outside_production() {
        let state = SystemState::from_sample(sample(15.0, 20.0));
        let is_off_hours_scale_down =
            |d: &Decision| d.str_param("schedule") == Some("off_hours");

        let mut dev = ProjectContext::new("python");
        dev.environment = Environment::Development;
        let decisions = engine().make_decisions_at(&state, &dev, Utc::now(), 22);
        assert!(decisions.iter().any(is_off_hours_scale_down));

        let prod = ProjectContext::new("python");
        let decisions = engine().make_decisions_at(&state, &prod, Utc::now(), 22);
        assert!(!decisions.iter().any(is_off_hours_scale_down));

        let decisions = engine().make_decisions_at(&state, &dev, Utc::now(), BUSINESS_HOUR);
        assert!(!decisions.iter().any(is_off_hours_scale_down));
    }

    #[test]
    fn test_auto_flags_disable_analyzers() {
        let config = LoopConfig {
            auto_scale: false,
            auto_heal: false,
            ..LoopConfig::default()
        };
        let mut engine = DecisionEngine::new(&config);

        let mut metrics = sample(95.0, 95.0);
        metrics.error_rate = 20.0;
        let state = SystemState::from_sample(metrics).with_service("api", false);

        assert!(decide(&mut engine, &state, &ProjectContext::default()).is_empty());
    }

    #[test]
    fn test_idle_resources_flagged() {
        let state = SystemState::from_sample(sample(2.0, 5.0));
        let decisions = decide(&mut engine(), &state, &ProjectContext::default());

        assert!(decisions
            .iter()
            .any(|d| d.target == "resources" && d.str_param("action") == Some("identify_unused")));
    }

    #[test]
    fn test_history_pruned_after_a_day() {
        let mut engine = engine();
        let now = Utc::now();
        let state = SystemState::from_sample(sample(85.0, 50.0));
        let ctx = ProjectContext::default();

        engine.make_decisions_at(&state, &ctx, now - Duration::hours(30), BUSINESS_HOUR);
        assert_eq!(engine.history_len(), 1);
        engine.make_decisions_at(&state, &ctx, now - Duration::hours(2), BUSINESS_HOUR);
        assert_eq!(engine.history_len(), 1);
        engine.make_decisions_at(&state, &ctx, now, BUSINESS_HOUR);
        assert_eq!(engine.history_len(), 2);

        assert_eq!(engine.recent_decisions_at(now).len(), 1);
    }

    #[test]
    fn test_learned_threshold_changes_behavior() {
        let mut engine = engine();
        let state = SystemState::from_sample(sample(75.0, 50.0));
        assert!(decide(&mut engine, &state, &ProjectContext::default()).is_empty());

        engine.apply_learning(&LearnedAdjustments {
            scale_up_cpu: Some((70.0, 8)),
            scale_down_cpu: None,
        });
        assert_eq!(engine.thresholds().cpu_scale_up, 70.0);
        let decisions = decide(&mut engine, &state, &ProjectContext::default());
        assert_eq!(decisions[0].action_type, ActionType::ScaleUp);
    }
}
