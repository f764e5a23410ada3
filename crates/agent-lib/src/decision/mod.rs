//! Decision engine
//!
//! Turns a system snapshot and project context into a short, prioritized
//! list of corrective actions, and produces the one-shot infrastructure
//! and deployment plans.

pub mod analyzers;
pub mod engine;
pub mod planning;
pub mod thresholds;
pub mod types;

pub use analyzers::{AnalysisInput, Analyzer};
pub use engine::{DecisionEngine, MAX_DECISIONS_PER_CYCLE};
pub use planning::{
    create_deployment_plan, create_infrastructure_plan, BuildConfig, DeploymentPlan,
    DeploymentStrategy, InfrastructurePlan, PipelineStage, StageAction, PRODUCTION_DEPLOY_STAGE,
};
pub use thresholds::{LearnedAdjustments, Thresholds};
pub use types::{ActionType, Decision, DecisionSummary, Priority};
