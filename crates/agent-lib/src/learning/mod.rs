//! Outcome learning
//!
//! The [`LearningModule`] scores every executed decision against the state
//! observed afterwards and keeps bounded samples per action type:
//! - success rate and effectiveness (last 100 each)
//! - CPU values at which scaling proved effective (last 50)
//! - effectiveness by hour of day (last 20 per hour)
//! - effectiveness by [`StateCategory`] (last 30 per category)
//!
//! The engine reads the learned CPU thresholds at the start of the next
//! cycle through [`LearningModule::learned_adjustments`].

mod outcome;
mod ring;

pub use outcome::{
    ActionOutcome, OutcomeEstimator, OutcomeMetrics, SimulatedOutcomeEstimator, StateCategory,
};
pub use ring::RingBuffer;

use crate::decision::{ActionType, Decision, LearnedAdjustments};
use crate::error::Result;
use crate::executor::ExecutionResult;
use crate::models::SystemState;
use crate::observability::AgentMetrics;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub const EFFECTIVENESS_SAMPLES: usize = 100;
pub const THRESHOLD_SAMPLES: usize = 50;
pub const TIMING_SAMPLES: usize = 20;
pub const CONTEXT_SAMPLES: usize = 30;

/// Full outcome records are kept this long
pub const OUTCOME_RETENTION_DAYS: i64 = 7;

/// Outcomes above this effectiveness contribute threshold samples
pub const EFFECTIVE_OUTCOME: f64 = 0.5;

/// Threshold sample key for an action, e.g. `scale_up_cpu_threshold`
pub fn threshold_key(action: ActionType) -> String {
    format!("{}_cpu_threshold", action)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ActionStats {
    success_rate: RingBuffer<f64>,
    effectiveness: RingBuffer<f64>,
}

impl Default for ActionStats {
    fn default() -> Self {
        Self {
            success_rate: RingBuffer::new(EFFECTIVENESS_SAMPLES),
            effectiveness: RingBuffer::new(EFFECTIVENESS_SAMPLES),
        }
    }
}

/// Everything the module has learned; persisted as JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Knowledge {
    outcomes: Vec<ActionOutcome>,
    effectiveness: BTreeMap<ActionType, ActionStats>,
    thresholds: BTreeMap<String, RingBuffer<f64>>,
    timing: BTreeMap<ActionType, BTreeMap<u32, RingBuffer<f64>>>,
    context: BTreeMap<ActionType, BTreeMap<StateCategory, RingBuffer<f64>>>,
}

impl Knowledge {
    fn learn(&mut self, outcome: &ActionOutcome) {
        let action = outcome.decision.action_type;
        let effectiveness = outcome.effectiveness();

        let stats = self.effectiveness.entry(action).or_default();
        stats
            .success_rate
            .push(if outcome.execution_success { 1.0 } else { 0.0 });
        stats.effectiveness.push(effectiveness);

        if matches!(action, ActionType::ScaleUp | ActionType::ScaleDown) {
            let samples = self
                .thresholds
                .entry(threshold_key(action))
                .or_insert_with(|| RingBuffer::new(THRESHOLD_SAMPLES));
            if effectiveness > EFFECTIVE_OUTCOME {
                samples.push(outcome.state_before.cpu_usage);
            }
        }

        self.timing
            .entry(action)
            .or_default()
            .entry(outcome.timestamp.hour())
            .or_insert_with(|| RingBuffer::new(TIMING_SAMPLES))
            .push(effectiveness);

        self.context
            .entry(action)
            .or_default()
            .entry(StateCategory::of(&outcome.state_before))
            .or_insert_with(|| RingBuffer::new(CONTEXT_SAMPLES))
            .push(effectiveness);
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::days(OUTCOME_RETENTION_DAYS);
        self.outcomes.retain(|o| o.timestamp > cutoff);
    }

    fn threshold_samples(&self, action: ActionType) -> Option<&RingBuffer<f64>> {
        self.thresholds.get(&threshold_key(action))
    }

    fn pattern_count(&self) -> usize {
        self.timing.len() + self.context.values().map(BTreeMap::len).sum::<usize>()
    }
}

/// Guidance for one action type derived from past outcomes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Mean execution success rate
    pub confidence: f64,
    pub expected_effectiveness: f64,
    /// Mean CPU at which the action proved effective
    pub suggested_threshold: Option<f64>,
    /// Hour of day (UTC) with the highest mean effectiveness
    pub best_timing: Option<u32>,
    /// Mean effectiveness in states like the one given
    pub context_effectiveness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveAction {
    pub action: ActionType,
    pub effectiveness: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningSummary {
    pub total_actions_learned: usize,
    pub action_types_tracked: usize,
    pub patterns_discovered: usize,
    pub learned_thresholds: usize,
    pub action_effectiveness_by_type: BTreeMap<ActionType, f64>,
    pub most_effective_action: Option<EffectiveAction>,
}

pub struct LearningModule {
    estimator: Arc<dyn OutcomeEstimator>,
    knowledge: RwLock<Knowledge>,
    metrics: AgentMetrics,
}

impl LearningModule {
    pub fn new(estimator: Arc<dyn OutcomeEstimator>) -> Self {
        Self {
            estimator,
            knowledge: RwLock::new(Knowledge::default()),
            metrics: AgentMetrics::new(),
        }
    }

    /// Learn from decisions executed against `before`
    pub async fn update_from_actions(
        &self,
        executed: &[(Decision, ExecutionResult)],
        before: &SystemState,
    ) {
        let now = Utc::now();
        let outcomes: Vec<_> = executed
            .iter()
            .map(|(decision, result)| {
                let after = self.estimator.estimate_after(decision, before);
                ActionOutcome::new(decision.clone(), result.success, before.clone(), after, now)
            })
            .collect();

        let count = outcomes.len();
        self.record_outcomes(outcomes, now).await;
        debug!(decisions = count, "Updated learning from executed decisions");
    }

    /// Learn from an already measured outcome
    pub async fn record_outcome(&self, outcome: ActionOutcome) {
        self.record_outcomes(vec![outcome], Utc::now()).await;
    }

    async fn record_outcomes(&self, outcomes: Vec<ActionOutcome>, now: DateTime<Utc>) {
        let mut knowledge = self.knowledge.write().await;
        for outcome in outcomes {
            knowledge.learn(&outcome);
            knowledge.outcomes.push(outcome);
        }
        knowledge.prune(now);
        self.metrics.set_learned_outcomes(knowledge.outcomes.len());
    }

    pub async fn get_decision_recommendations(
        &self,
        action: ActionType,
        state: &SystemState,
    ) -> Recommendation {
        let knowledge = self.knowledge.read().await;
        let mut recommendation = Recommendation::default();

        if let Some(stats) = knowledge.effectiveness.get(&action) {
            recommendation.confidence = stats.success_rate.mean().unwrap_or(0.0);
            recommendation.expected_effectiveness = stats.effectiveness.mean().unwrap_or(0.0);
        }

        recommendation.suggested_threshold =
            knowledge.threshold_samples(action).and_then(RingBuffer::mean);

        if let Some(hours) = knowledge.timing.get(&action) {
            let mut best = 0.0;
            for (hour, samples) in hours {
                if let Some(mean) = samples.mean() {
                    if mean > best {
                        best = mean;
                        recommendation.best_timing = Some(*hour);
                    }
                }
            }
        }

        recommendation.context_effectiveness = knowledge
            .context
            .get(&action)
            .and_then(|categories| categories.get(&StateCategory::of(state)))
            .and_then(RingBuffer::mean);

        recommendation
    }

    pub async fn learning_summary(&self) -> LearningSummary {
        let knowledge = self.knowledge.read().await;

        let action_effectiveness: BTreeMap<ActionType, f64> = knowledge
            .effectiveness
            .iter()
            .filter_map(|(action, stats)| {
                stats
                    .effectiveness
                    .mean()
                    .map(|mean| (*action, (mean * 1000.0).round() / 1000.0))
            })
            .collect();

        let most_effective_action = action_effectiveness
            .iter()
            .fold(None::<EffectiveAction>, |best, (action, effectiveness)| match best {
                Some(b) if b.effectiveness >= *effectiveness => Some(b),
                _ => Some(EffectiveAction {
                    action: *action,
                    effectiveness: *effectiveness,
                }),
            });

        LearningSummary {
            total_actions_learned: knowledge.outcomes.len(),
            action_types_tracked: knowledge.effectiveness.len(),
            patterns_discovered: knowledge.pattern_count(),
            learned_thresholds: knowledge.thresholds.len(),
            action_effectiveness_by_type: action_effectiveness,
            most_effective_action,
        }
    }

    /// Learned threshold samples by key, oldest first
    pub async fn learned_thresholds(&self) -> BTreeMap<String, Vec<f64>> {
        self.knowledge
            .read()
            .await
            .thresholds
            .iter()
            .map(|(key, samples)| (key.clone(), samples.to_vec()))
            .collect()
    }

    /// Threshold knowledge for the decision engine
    pub async fn learned_adjustments(&self) -> LearnedAdjustments {
        let knowledge = self.knowledge.read().await;
        let learned = |action| {
            knowledge
                .threshold_samples(action)
                .and_then(|samples| samples.mean().map(|mean| (mean, samples.len())))
        };

        LearnedAdjustments {
            scale_up_cpu: learned(ActionType::ScaleUp),
            scale_down_cpu: learned(ActionType::ScaleDown),
        }
    }

    /// Write learned knowledge to `path` as JSON
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let json = {
            let knowledge = self.knowledge.read().await;
            serde_json::to_vec_pretty(&*knowledge)?
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;

        info!(path = %path.display(), "Learning data saved");
        Ok(())
    }

    /// Replace learned knowledge with the contents of `path`
    pub async fn load_from(&self, path: &Path) -> Result<()> {
        let data = fs::read(path)?;
        let mut loaded: Knowledge = serde_json::from_slice(&data).map_err(|e| {
            crate::error::AgentError::Persistence(format!("{}: {}", path.display(), e))
        })?;
        loaded.prune(Utc::now());

        let mut knowledge = self.knowledge.write().await;
        *knowledge = loaded;
        self.metrics.set_learned_outcomes(knowledge.outcomes.len());

        info!(
            path = %path.display(),
            outcomes = knowledge.outcomes.len(),
            "Learning data loaded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Priority;
    use crate::models::MetricSample;

    struct NoEstimate;

    impl OutcomeEstimator for NoEstimate {
        fn estimate_after(&self, _: &Decision, _: &SystemState) -> Option<SystemState> {
            None
        }
    }

    /// Always reports the CPU dropping by ten points
    struct CpuDrop;

    impl OutcomeEstimator for CpuDrop {
        fn estimate_after(&self, _: &Decision, before: &SystemState) -> Option<SystemState> {
            let mut after = before.clone();
            after.cpu_usage -= 10.0;
            after.response_time -= 0.05;
            Some(after)
        }
    }

    fn state(cpu: f64) -> SystemState {
        SystemState::from_sample(MetricSample {
            cpu_usage: cpu,
            memory_usage: 60.0,
            disk_usage: 40.0,
            network_usage: 20.0,
            response_time: 1.0,
            error_rate: 1.0,
            request_count: 500,
        })
    }

    /// Outcome for `action` at `cpu` with effectiveness 0.6 or 0.0
    fn outcome(action: ActionType, cpu: f64, effective: bool, at: DateTime<Utc>) -> ActionOutcome {
        let before = state(cpu);
        let mut after = before.clone();
        if effective {
            after.cpu_usage -= 5.0;
            after.response_time -= 0.1;
        }
        let decision = Decision::new(action, Priority::High, "compute");
        ActionOutcome::new(decision, true, before, Some(after), at)
    }

    #[tokio::test]
    async fn test_threshold_learning_keeps_only_effective_samples() {
        let module = LearningModule::new(Arc::new(NoEstimate));
        let now = Utc::now();

        for i in 0..10 {
            let effective = i % 2 == 0;
            module
                .record_outcome(outcome(ActionType::ScaleUp, 80.0 + i as f64, effective, now))
                .await;
        }

        let thresholds = module.learned_thresholds().await;
        assert_eq!(
            thresholds["scale_up_cpu_threshold"],
            vec![80.0, 82.0, 84.0, 86.0, 88.0]
        );
    }

    #[tokio::test]
    async fn test_threshold_samples_are_capped() {
        let module = LearningModule::new(Arc::new(NoEstimate));
        let now = Utc::now();

        for i in 0..60 {
            module
                .record_outcome(outcome(ActionType::ScaleUp, i as f64, true, now))
                .await;
        }

        let samples = &module.learned_thresholds().await["scale_up_cpu_threshold"];
        assert_eq!(samples.len(), THRESHOLD_SAMPLES);
        assert_eq!(samples[0], 10.0);
        assert_eq!(samples[49], 59.0);
    }

    #[tokio::test]
    async fn test_recommendations_default_when_empty() {
        let module = LearningModule::new(Arc::new(NoEstimate));
        let rec = module
            .get_decision_recommendations(ActionType::ScaleUp, &state(50.0))
            .await;
        assert_eq!(rec, Recommendation::default());
    }

    #[tokio::test]
    async fn test_recommendations_from_outcomes() {
        let module = LearningModule::new(Arc::new(NoEstimate));
        let at = DateTime::parse_from_rfc3339("2024-06-01T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = at + Duration::hours(3);

        // outcome records are pruned, ring buffers are not
        module.record_outcome(outcome(ActionType::ScaleUp, 85.0, true, at)).await;
        module.record_outcome(outcome(ActionType::ScaleUp, 90.0, false, later)).await;

        let rec = module
            .get_decision_recommendations(ActionType::ScaleUp, &state(85.0))
            .await;
        assert_eq!(rec.confidence, 1.0);
        assert!((rec.expected_effectiveness - 0.3).abs() < 1e-9);
        assert_eq!(rec.suggested_threshold, Some(85.0));
        assert_eq!(rec.best_timing, Some(14));
        assert!((rec.context_effectiveness.unwrap() - 0.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_old_outcomes_are_pruned_but_patterns_kept() {
        let module = LearningModule::new(Arc::new(NoEstimate));
        let old = Utc::now() - Duration::days(OUTCOME_RETENTION_DAYS + 1);

        module.record_outcome(outcome(ActionType::ScaleUp, 85.0, true, old)).await;

        let summary = module.learning_summary().await;
        assert_eq!(summary.total_actions_learned, 0);
        assert_eq!(summary.action_types_tracked, 1);
        assert_eq!(module.learned_adjustments().await.scale_up_cpu, Some((85.0, 1)));
    }

    #[tokio::test]
    async fn test_update_from_actions_uses_estimator() {
        let module = LearningModule::new(Arc::new(CpuDrop));
        let before = state(88.0);
        let executed = vec![
            (
                Decision::new(ActionType::ScaleUp, Priority::High, "compute"),
                ExecutionResult::success("AWS scale up completed"),
            ),
            (
                Decision::new(ActionType::RestartService, Priority::Medium, "web"),
                ExecutionResult::failure("Service restart failed", true),
            ),
        ];

        module.update_from_actions(&executed, &before).await;

        let summary = module.learning_summary().await;
        assert_eq!(summary.total_actions_learned, 2);
        assert_eq!(summary.action_types_tracked, 2);
        assert_eq!(summary.learned_thresholds, 1);
        assert_eq!(summary.action_effectiveness_by_type[&ActionType::ScaleUp], 0.6);

        let restart = module
            .get_decision_recommendations(ActionType::RestartService, &before)
            .await;
        assert_eq!(restart.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_summary_picks_most_effective_action() {
        let module = LearningModule::new(Arc::new(NoEstimate));
        let now = Utc::now();

        module.record_outcome(outcome(ActionType::ScaleUp, 85.0, true, now)).await;
        module.record_outcome(outcome(ActionType::ScaleDown, 20.0, false, now)).await;

        let summary = module.learning_summary().await;
        let best = summary.most_effective_action.unwrap();
        assert_eq!(best.action, ActionType::ScaleUp);
        assert_eq!(best.effectiveness, 0.6);
        assert_eq!(summary.learned_thresholds, 2);
        assert_eq!(summary.patterns_discovered, 4);
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learning").join("knowledge.json");
        let now = Utc::now();

        let module = LearningModule::new(Arc::new(NoEstimate));
        for cpu in [82.0, 84.0, 86.0, 88.0, 90.0] {
            module.record_outcome(outcome(ActionType::ScaleUp, cpu, true, now)).await;
        }
        module.save_to(&path).await.unwrap();

        let restored = LearningModule::new(Arc::new(NoEstimate));
        restored.load_from(&path).await.unwrap();

        assert_eq!(restored.learned_adjustments().await.scale_up_cpu, Some((86.0, 5)));
        assert_eq!(restored.learning_summary().await, module.learning_summary().await);
    }

    #[tokio::test]
    async fn test_load_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowledge.json");
        std::fs::write(&path, b"not json").unwrap();

        let module = LearningModule::new(Arc::new(NoEstimate));
        let err = module.load_from(&path).await.unwrap_err();
        assert!(matches!(err, crate::error::AgentError::Persistence(_)));
    }
}
