//! Control loop
//!
//! [`Agent`] owns the monitoring system, decision engine, executor and
//! learning module. Lifecycle:
//! 1. [`Agent::set_project_context`]
//! 2. [`Agent::setup_infrastructure`] and [`Agent::deploy`]
//! 3. [`Agent::start_monitoring`], which starts the monitoring tasks and the
//!    decision loop
//! 4. [`Agent::stop`]

use crate::config::LoopConfig;
use crate::decision::{
    Decision, DecisionEngine, DecisionSummary, DeploymentPlan, InfrastructurePlan, Thresholds,
};
use crate::error::{AgentError, Result};
use crate::executor::{
    ActionExecutor, CommandRunner, DeploymentReport, ExecutionResult, ExecutionSummary,
    SimulatedCommandRunner,
};
use crate::learning::{LearningModule, LearningSummary, OutcomeEstimator, SimulatedOutcomeEstimator};
use crate::models::{DeploymentStatus, ProjectContext};
use crate::monitoring::{
    MetricSource, MonitoringStatus, MonitoringSystem, SecurityFeed, ServiceChecker,
    SimulatedMetricSource, SimulatedSecurityFeed, SimulatedServiceChecker,
};
use crate::observability::{AgentMetrics, StructuredLogger};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// External capabilities the agent drives
#[derive(Clone)]
pub struct Capabilities {
    pub metric_source: Arc<dyn MetricSource>,
    pub service_checker: Arc<dyn ServiceChecker>,
    pub security_feed: Arc<dyn SecurityFeed>,
    pub command_runner: Arc<dyn CommandRunner>,
    pub outcome_estimator: Arc<dyn OutcomeEstimator>,
}

impl Capabilities {
    pub fn simulated() -> Self {
        Self {
            metric_source: Arc::new(SimulatedMetricSource),
            service_checker: Arc::new(SimulatedServiceChecker::default()),
            security_feed: Arc::new(SimulatedSecurityFeed::default()),
            command_runner: Arc::new(SimulatedCommandRunner::default()),
            outcome_estimator: Arc::new(SimulatedOutcomeEstimator),
        }
    }
}

/// Outbound status report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub is_running: bool,
    pub monitoring: MonitoringStatus,
    pub recent_decisions: Vec<DecisionSummary>,
    pub execution_history: Vec<ExecutionSummary>,
    pub learning_summary: LearningSummary,
}

pub struct Agent {
    config: LoopConfig,
    monitoring: Arc<MonitoringSystem>,
    engine: Mutex<DecisionEngine>,
    executor: ActionExecutor,
    learning: LearningModule,
    context: RwLock<Option<ProjectContext>>,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
    metrics: AgentMetrics,
    logger: StructuredLogger,
}

impl Agent {
    pub fn new(config: LoopConfig, capabilities: Capabilities, logger: StructuredLogger) -> Self {
        let monitoring = MonitoringSystem::builder()
            .config(config.clone())
            .metric_source(capabilities.metric_source)
            .service_checker(capabilities.service_checker)
            .security_feed(capabilities.security_feed)
            .logger(logger.clone())
            .build();
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            monitoring: Arc::new(monitoring),
            engine: Mutex::new(DecisionEngine::new(&config)),
            executor: ActionExecutor::new(&config, capabilities.command_runner),
            learning: LearningModule::new(capabilities.outcome_estimator),
            context: RwLock::new(None),
            running: AtomicBool::new(false),
            shutdown_tx,
            loop_task: Mutex::new(None),
            metrics: AgentMetrics::new(),
            logger,
            config,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn monitoring(&self) -> &Arc<MonitoringSystem> {
        &self.monitoring
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn learning(&self) -> &LearningModule {
        &self.learning
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn set_project_context(&self, context: ProjectContext) {
        info!(
            project_type = %context.project_type,
            environment = ?context.environment,
            "Project context set"
        );
        *self.context.write().await = Some(context);
    }

    pub async fn project_context(&self) -> Option<ProjectContext> {
        self.context.read().await.clone()
    }

    async fn require_context(&self, operation: &str) -> Result<ProjectContext> {
        self.project_context().await.ok_or_else(|| {
            AgentError::Precondition(format!(
                "project context must be set before {}",
                operation
            ))
        })
    }

    /// Thresholds the engine is currently deciding with
    pub async fn thresholds(&self) -> Thresholds {
        self.engine.lock().await.thresholds().clone()
    }

    pub async fn setup_infrastructure(&self) -> Result<InfrastructurePlan> {
        let context = self.require_context("infrastructure setup").await?;
        let plan = self.engine.lock().await.create_infrastructure_plan(&context);
        info!(
            cloud = %plan.cloud_provider,
            instances = plan.compute.instances,
            databases = plan.databases.len(),
            "Infrastructure plan created"
        );
        Ok(plan)
    }

    pub async fn deployment_plan(&self) -> Result<DeploymentPlan> {
        let context = self.require_context("deployment planning").await?;
        Ok(self.engine.lock().await.create_deployment_plan(&context))
    }

    /// Plan and run the deployment pipeline
    pub async fn deploy(&self) -> Result<DeploymentReport> {
        let plan = self.deployment_plan().await?;
        let report = self.executor.execute_deployment(&plan).await;

        if report.overall_success {
            self.monitoring
                .record_deployment(DeploymentStatus::Stable, report.end_time)
                .await;
        } else {
            warn!(deployment_id = %report.deployment_id, "Deployment did not complete cleanly");
        }
        Ok(report)
    }

    /// Start the monitoring tasks and the decision loop
    pub async fn start_monitoring(self: &Arc<Self>) -> Result<()> {
        self.require_context("monitoring").await?;
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.monitoring.start().await;

        let this = Arc::clone(self);
        let shutdown = self.shutdown_tx.subscribe();
        *self.loop_task.lock().await = Some(tokio::spawn(this.decision_loop(shutdown)));

        self.logger
            .log_startup(env!("CARGO_PKG_VERSION"), &self.config.default_cloud.to_string());
        Ok(())
    }

    /// One pass of observe, decide, act and learn
    pub async fn run_cycle(&self) -> Result<Vec<ExecutionResult>> {
        let started = Instant::now();
        let context = self.require_context("running a decision cycle").await?;

        let adjustments = self.learning.learned_adjustments().await;
        let state = self.monitoring.get_system_state().await?;

        let decisions: Vec<Decision> = {
            let mut engine = self.engine.lock().await;
            engine.apply_learning(&adjustments);
            engine.make_decisions(&state, &context)
        };

        let mut executed = Vec::with_capacity(decisions.len());
        for decision in decisions {
            self.logger.log_decision(&decision);
            self.metrics.inc_decision(&decision);

            let result = self.executor.execute_action(&decision).await;
            self.logger.log_action(&decision, &result);
            executed.push((decision, result));
        }

        if !executed.is_empty() {
            self.learning.update_from_actions(&executed, &state).await;
            let summary = self.learning.learning_summary().await;
            self.logger
                .log_learning_update(summary.total_actions_learned, summary.patterns_discovered);
        }

        self.metrics
            .observe_cycle_latency(started.elapsed().as_secs_f64());
        debug!(executed = executed.len(), "Decision cycle finished");

        Ok(executed.into_iter().map(|(_, result)| result).collect())
    }

    async fn decision_loop(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let backoff = self.config.error_backoff();
        let mut ticker = interval(self.config.monitoring_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // A panicking capability takes down only this cycle's task
                    let this = Arc::clone(&self);
                    let failure = match tokio::spawn(async move { this.run_cycle().await }).await {
                        Ok(Ok(_)) => None,
                        Ok(Err(e)) => Some(e.to_string()),
                        Err(e) => Some(format!("decision cycle aborted: {}", e)),
                    };
                    if let Some(error) = failure {
                        self.metrics.inc_cycle_errors();
                        self.logger.log_cycle_failure(&error, backoff.as_secs());
                        tokio::select! {
                            _ = tokio::time::sleep(backoff) => {}
                            _ = shutdown.recv() => break,
                        }
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        debug!("Decision loop stopped");
    }

    /// Stop the decision loop and the monitoring tasks
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.loop_task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Decision loop ended abnormally");
            }
        }
        self.monitoring.stop().await;
        self.logger.log_shutdown("stop requested");
    }

    pub async fn recent_decisions(&self) -> Vec<DecisionSummary> {
        self.engine.lock().await.recent_decisions()
    }

    pub async fn status(&self) -> StatusReport {
        StatusReport {
            is_running: self.is_running(),
            monitoring: self.monitoring.status().await,
            recent_decisions: self.recent_decisions().await,
            execution_history: self.executor.execution_history().await,
            learning_summary: self.learning.learning_summary().await,
        }
    }
}
