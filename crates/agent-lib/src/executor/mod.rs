//! Action execution
//!
//! The [`ActionExecutor`] dispatches decisions to per-action handlers and runs
//! deployment pipelines stage by stage. Every path ends in an
//! [`ExecutionResult`]; nothing here returns an error to the control loop.

mod command;
mod handlers;
mod pipeline;
mod provider;
mod result;

pub use command::{CommandRunner, SimulatedCommandRunner};
pub use handlers::{ActionHandler, HandlerContext, DEFAULT_HEAL_ATTEMPTS};
pub use pipeline::{DeploymentReport, StageResult};
pub use provider::{scale_command, ScaleDirection};
pub use result::{ExecutionResult, ExecutionSummary};

use crate::config::LoopConfig;
use crate::decision::{ActionType, Decision, DeploymentPlan, PRODUCTION_DEPLOY_STAGE};
use crate::observability::AgentMetrics;
use chrono::Utc;
use handlers::{
    HealHandler, OptimizeHandler, RestartHandler, RollbackHandler, ScaleHandler,
    UpdateConfigHandler, UpdateSecurityHandler,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Number of results kept for status reporting
pub const EXECUTION_HISTORY_LIMIT: usize = 10;

pub struct ActionExecutor {
    handlers: HashMap<ActionType, Box<dyn ActionHandler>>,
    ctx: HandlerContext,
    history: Mutex<VecDeque<ExecutionResult>>,
    metrics: AgentMetrics,
}

impl ActionExecutor {
    pub fn new(config: &LoopConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let mut handlers: HashMap<ActionType, Box<dyn ActionHandler>> = HashMap::new();
        handlers.insert(
            ActionType::ScaleUp,
            Box::new(ScaleHandler {
                direction: ScaleDirection::Up,
            }),
        );
        handlers.insert(
            ActionType::ScaleDown,
            Box::new(ScaleHandler {
                direction: ScaleDirection::Down,
            }),
        );
        handlers.insert(ActionType::RestartService, Box::new(RestartHandler));
        handlers.insert(ActionType::Rollback, Box::new(RollbackHandler));
        handlers.insert(ActionType::HealService, Box::new(HealHandler));
        handlers.insert(ActionType::OptimizePerformance, Box::new(OptimizeHandler));
        handlers.insert(ActionType::UpdateSecurity, Box::new(UpdateSecurityHandler));
        handlers.insert(ActionType::UpdateConfig, Box::new(UpdateConfigHandler));

        Self {
            handlers,
            ctx: HandlerContext {
                runner,
                cloud_provider: config.default_cloud,
                heal_retry_delay: config.heal_retry_delay(),
            },
            history: Mutex::new(VecDeque::with_capacity(EXECUTION_HISTORY_LIMIT)),
            metrics: AgentMetrics::new(),
        }
    }

    /// Action types with a registered handler
    pub fn supported_actions(&self) -> Vec<ActionType> {
        let mut actions: Vec<_> = self.handlers.keys().copied().collect();
        actions.sort();
        actions
    }

    /// Execute one decision, timing it and recording the result
    pub async fn execute_action(&self, decision: &Decision) -> ExecutionResult {
        let started = Instant::now();
        info!(
            action = %decision.action_type,
            target = %decision.target,
            priority = %decision.priority,
            "Executing action"
        );

        let result = match self.handlers.get(&decision.action_type) {
            Some(handler) => handler.execute(decision, &self.ctx).await,
            None => {
                warn!(action = %decision.action_type, "No handler for action type");
                ExecutionResult::failure(
                    format!("Unknown action type: {}", decision.action_type),
                    false,
                )
            }
        };

        let elapsed = started.elapsed().as_secs_f64();
        let result = result.timed(elapsed);
        self.metrics.observe_action(elapsed, result.success);
        self.record(result.clone()).await;
        result
    }

    /// Run a deployment pipeline
    ///
    /// A failed stage aborts the run, except for the production deploy stage
    /// which only marks the run as failed.
    pub async fn execute_deployment(&self, plan: &DeploymentPlan) -> DeploymentReport {
        let start_time = Utc::now();
        let deployment_id = pipeline::deployment_id(start_time);
        info!(
            deployment_id = %deployment_id,
            strategy = %plan.strategy,
            stages = plan.stages.len(),
            "Starting deployment"
        );

        let mut overall_success = true;
        let mut stage_results = Vec::with_capacity(plan.stages.len());

        for stage in &plan.stages {
            let started = Instant::now();
            let result = pipeline::execute_stage(self.ctx.runner.as_ref(), stage, Utc::now())
                .await
                .timed(started.elapsed().as_secs_f64());
            let success = result.success;

            stage_results.push(StageResult {
                stage: stage.name.clone(),
                result,
            });

            if !success {
                overall_success = false;
                warn!(
                    deployment_id = %deployment_id,
                    stage = %stage.name,
                    kind = stage.action.kind(),
                    "Deployment stage failed"
                );
                if stage.name != PRODUCTION_DEPLOY_STAGE {
                    break;
                }
            }
        }

        let report = DeploymentReport {
            deployment_id,
            overall_success,
            stage_results,
            start_time,
            end_time: Utc::now(),
        };
        info!(
            deployment_id = %report.deployment_id,
            success = report.overall_success,
            "Deployment finished"
        );
        report
    }

    /// Recent executions, oldest first
    pub async fn execution_history(&self) -> Vec<ExecutionSummary> {
        self.history.lock().await.iter().map(|r| r.summary()).collect()
    }

    async fn record(&self, result: ExecutionResult) {
        let mut history = self.history.lock().await;
        if history.len() == EXECUTION_HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(result);
    }
}
