//! One-shot infrastructure and deployment planning
//!
//! Pure transformations of a [`ProjectContext`] into structured plans
//! consumed by the provisioning and deployment collaborators. Nothing here
//! touches loop state.

use crate::config::CloudProvider;
use crate::models::{EstimatedScale, ProjectContext};
use serde::{Deserialize, Serialize};

/// Name of the stage whose failure does not abort a pipeline run
pub const PRODUCTION_DEPLOY_STAGE: &str = "deploy_production";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeRequirements {
    pub cpu: u32,
    pub memory_gb: f64,
    pub storage_gb: u32,
    pub instances: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "lowercase")]
pub enum DatabasePlan {
    Postgresql {
        instance_type: String,
        storage_gb: u32,
        backup_retention_days: u32,
        multi_az: bool,
    },
    Redis {
        instance_type: String,
        memory_gb: u32,
        backup: bool,
    },
    Mongodb {
        instance_type: String,
        storage_gb: u32,
        replica_set: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkingPlan {
    pub load_balancer: bool,
    pub cdn: bool,
    pub vpc: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPlan {
    pub firewall: bool,
    pub waf: bool,
    pub ssl_certificates: bool,
    pub secret_management: bool,
    pub vulnerability_scanning: bool,
    pub identity_management: bool,
    pub force_https: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringPlan {
    pub metrics: bool,
    pub logs: bool,
    pub tracing: bool,
    pub alerting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingPlan {
    pub enabled: bool,
    pub min_instances: u32,
    pub max_instances: u32,
    pub target_cpu: u32,
    pub target_memory: u32,
    pub scale_up_threshold: u32,
    pub scale_down_threshold: u32,
}

/// Resources the provisioning collaborator should create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructurePlan {
    pub cloud_provider: CloudProvider,
    pub compute: ComputeRequirements,
    pub databases: Vec<DatabasePlan>,
    pub networking: NetworkingPlan,
    pub security: SecurityPlan,
    pub monitoring: MonitoringPlan,
    pub scaling: ScalingPlan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStrategy {
    Rolling,
    BlueGreen,
    Canary,
}

impl std::fmt::Display for DeploymentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentStrategy::Rolling => write!(f, "rolling"),
            DeploymentStrategy::BlueGreen => write!(f, "blue_green"),
            DeploymentStrategy::Canary => write!(f, "canary"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JavaBuildTool {
    Maven,
    Gradle,
}

/// Build settings keyed by runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "runtime", rename_all = "lowercase")]
pub enum BuildConfig {
    Nodejs {
        version: String,
        install_cmd: String,
        build_cmd: String,
        artifact_path: String,
    },
    Python {
        version: String,
        install_cmd: String,
        build_cmd: String,
        artifact_path: String,
    },
    Java {
        version: String,
        build_tool: JavaBuildTool,
        build_cmd: String,
        artifact_path: String,
    },
    Docker {
        dockerfile: String,
    },
}

impl BuildConfig {
    pub fn runtime(&self) -> &'static str {
        match self {
            BuildConfig::Nodejs { .. } => "nodejs",
            BuildConfig::Python { .. } => "python",
            BuildConfig::Java { .. } => "java",
            BuildConfig::Docker { .. } => "docker",
        }
    }
}

/// What a pipeline stage does
///
/// Stage kinds this agent does not know deserialize to
/// [`StageAction::Unknown`] and fail when executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageAction {
    SourceControl {
        trigger: String,
        branch: String,
    },
    Build {
        build: BuildConfig,
    },
    Test {
        #[serde(default)]
        parallel: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coverage_threshold: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suite: Option<String>,
    },
    Security {
        #[serde(default)]
        sast: bool,
        #[serde(default)]
        dependency_check: bool,
    },
    Deploy {
        environment: String,
        #[serde(default)]
        auto_approve: bool,
    },
    #[serde(other)]
    Unknown,
}

impl StageAction {
    pub fn kind(&self) -> &'static str {
        match self {
            StageAction::SourceControl { .. } => "source_control",
            StageAction::Build { .. } => "build",
            StageAction::Test { .. } => "test",
            StageAction::Security { .. } => "security",
            StageAction::Deploy { .. } => "deploy",
            StageAction::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub name: String,
    #[serde(flatten)]
    pub action: StageAction,
}

impl PipelineStage {
    pub fn new(name: impl Into<String>, action: StageAction) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestingPlan {
    pub unit_tests: bool,
    pub integration_tests: bool,
    pub performance_tests: bool,
    pub security_tests: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackPolicy {
    pub automatic: bool,
    pub conditions: Vec<String>,
    pub max_rollback_time: String,
}

/// Pipeline the deployment collaborator should run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub strategy: DeploymentStrategy,
    pub stages: Vec<PipelineStage>,
    pub testing: TestingPlan,
    pub rollback: RollbackPolicy,
}

pub fn create_infrastructure_plan(
    context: &ProjectContext,
    cloud_provider: CloudProvider,
) -> InfrastructurePlan {
    let scale = context.estimated_scale();

    let networking = if scale == EstimatedScale::Small {
        NetworkingPlan::default()
    } else {
        NetworkingPlan {
            load_balancer: true,
            cdn: true,
            vpc: true,
        }
    };

    InfrastructurePlan {
        cloud_provider,
        compute: compute_requirements(context),
        databases: context
            .database_usage
            .iter()
            .filter_map(|db| database_plan(db))
            .collect(),
        networking,
        security: security_plan(context),
        monitoring: MonitoringPlan {
            metrics: true,
            logs: true,
            tracing: scale != EstimatedScale::Small,
            alerting: true,
        },
        scaling: scaling_plan(scale),
    }
}

pub fn create_deployment_plan(context: &ProjectContext) -> DeploymentPlan {
    let scale = context.estimated_scale();

    let strategy = if context.deployment_requirements.scaling_requirements.as_deref() == Some("high")
    {
        DeploymentStrategy::BlueGreen
    } else if scale == EstimatedScale::Large {
        DeploymentStrategy::Canary
    } else {
        DeploymentStrategy::Rolling
    };

    DeploymentPlan {
        strategy,
        stages: pipeline_stages(context),
        testing: TestingPlan {
            unit_tests: true,
            integration_tests: true,
            performance_tests: scale != EstimatedScale::Small,
            security_tests: !context.security_requirements.is_empty(),
        },
        rollback: RollbackPolicy {
            automatic: true,
            conditions: vec!["error_rate > 5%".to_string(), "response_time > 2s".to_string()],
            max_rollback_time: "5m".to_string(),
        },
    }
}

fn compute_requirements(context: &ProjectContext) -> ComputeRequirements {
    let mut compute = ComputeRequirements {
        cpu: 1,
        memory_gb: 1.0,
        storage_gb: 10,
        instances: 1,
    };

    if matches!(context.project_type.as_str(), "web_backend" | "backend") {
        compute.cpu = 2;
        compute.memory_gb = 2.0;
    }

    match context.estimated_scale() {
        EstimatedScale::Small => {}
        EstimatedScale::Medium => {
            compute.cpu *= 2;
            compute.memory_gb *= 2.0;
            compute.instances = 2;
        }
        EstimatedScale::Large => {
            compute.cpu *= 4;
            compute.memory_gb *= 4.0;
            compute.instances = 3;
        }
    }

    if context.caching_enabled() {
        compute.memory_gb *= 1.5;
    }

    compute
}

fn database_plan(engine: &str) -> Option<DatabasePlan> {
    match engine {
        "postgresql" => Some(DatabasePlan::Postgresql {
            instance_type: "db.t3.micro".to_string(),
            storage_gb: 20,
            backup_retention_days: 7,
            multi_az: false,
        }),
        "redis" => Some(DatabasePlan::Redis {
            instance_type: "cache.t3.micro".to_string(),
            memory_gb: 1,
            backup: true,
        }),
        "mongodb" => Some(DatabasePlan::Mongodb {
            instance_type: "t3.small".to_string(),
            storage_gb: 20,
            replica_set: false,
        }),
        _ => None,
    }
}

fn security_plan(context: &ProjectContext) -> SecurityPlan {
    let hardened = context.estimated_scale() != EstimatedScale::Small;
    let tls = context.requires("tls_encryption");

    SecurityPlan {
        firewall: true,
        waf: hardened,
        ssl_certificates: true,
        secret_management: context.requires("secret_management"),
        vulnerability_scanning: hardened,
        identity_management: context.requires("authentication"),
        force_https: tls,
    }
}

fn scaling_plan(scale: EstimatedScale) -> ScalingPlan {
    let (min_instances, max_instances) = match scale {
        EstimatedScale::Small => (1, 3),
        EstimatedScale::Medium => (1, 5),
        EstimatedScale::Large => (2, 10),
    };

    ScalingPlan {
        enabled: true,
        min_instances,
        max_instances,
        target_cpu: 70,
        target_memory: 80,
        scale_up_threshold: 2,
        scale_down_threshold: 5,
    }
}

fn pipeline_stages(context: &ProjectContext) -> Vec<PipelineStage> {
    let mut stages = vec![
        PipelineStage::new(
            "source",
            StageAction::SourceControl {
                trigger: "push".to_string(),
                branch: "main".to_string(),
            },
        ),
        PipelineStage::new(
            "build",
            StageAction::Build {
                build: build_config(context),
            },
        ),
        PipelineStage::new(
            "test",
            StageAction::Test {
                parallel: true,
                coverage_threshold: Some(80),
                environment: None,
                suite: None,
            },
        ),
    ];

    if !context.security_requirements.is_empty() {
        stages.push(PipelineStage::new(
            "security_scan",
            StageAction::Security {
                sast: true,
                dependency_check: true,
            },
        ));
    }

    stages.push(PipelineStage::new(
        "deploy_staging",
        StageAction::Deploy {
            environment: "staging".to_string(),
            auto_approve: true,
        },
    ));
    stages.push(PipelineStage::new(
        "integration_tests",
        StageAction::Test {
            parallel: false,
            coverage_threshold: None,
            environment: Some("staging".to_string()),
            suite: Some("integration".to_string()),
        },
    ));
    stages.push(PipelineStage::new(
        PRODUCTION_DEPLOY_STAGE,
        StageAction::Deploy {
            environment: "production".to_string(),
            auto_approve: false,
        },
    ));

    stages
}

fn build_config(context: &ProjectContext) -> BuildConfig {
    if context.project_type == "nodejs" || context.uses_build_tool("npm") {
        return BuildConfig::Nodejs {
            version: "18".to_string(),
            install_cmd: "npm ci".to_string(),
            build_cmd: "npm run build".to_string(),
            artifact_path: "dist/".to_string(),
        };
    }

    match context.project_type.as_str() {
        "python" => BuildConfig::Python {
            version: "3.9".to_string(),
            install_cmd: "pip install -r requirements.txt".to_string(),
            build_cmd: "python setup.py build".to_string(),
            artifact_path: "build/".to_string(),
        },
        "java" => {
            if context.uses_build_tool("maven") {
                BuildConfig::Java {
                    version: "11".to_string(),
                    build_tool: JavaBuildTool::Maven,
                    build_cmd: "mvn package".to_string(),
                    artifact_path: "target/".to_string(),
                }
            } else {
                BuildConfig::Java {
                    version: "11".to_string(),
                    build_tool: JavaBuildTool::Gradle,
                    build_cmd: "./gradlew build".to_string(),
                    artifact_path: "build/libs/".to_string(),
                }
            }
        }
        _ => BuildConfig::Docker {
            dockerfile: "Dockerfile".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PerformanceRequirements;

    fn context(project_type: &str, scale: EstimatedScale, caching: bool) -> ProjectContext {
        ProjectContext {
            performance_requirements: PerformanceRequirements {
                estimated_scale: scale,
                caching,
            },
            ..ProjectContext::new(project_type)
        }
    }

    #[test]
    fn test_small_project_infrastructure() {
        let ctx = context("python", EstimatedScale::Small, false);
        let plan = create_infrastructure_plan(&ctx, CloudProvider::Aws);

        assert_eq!(plan.compute.cpu, 1);
        assert_eq!(plan.compute.memory_gb, 1.0);
        assert_eq!(plan.compute.instances, 1);
        assert_eq!(plan.networking, NetworkingPlan::default());
        assert!(!plan.monitoring.tracing);
        assert!(!plan.security.waf);
        assert_eq!(plan.scaling.max_instances, 3);
    }

    #[test]
    fn test_large_cached_backend_sizing() {
        let ctx = context("backend", EstimatedScale::Large, true);
        let plan = create_infrastructure_plan(&ctx, CloudProvider::Gcp);

        assert_eq!(plan.cloud_provider, CloudProvider::Gcp);
        assert_eq!(plan.compute.cpu, 8);
        assert_eq!(plan.compute.memory_gb, 12.0);
        assert_eq!(plan.compute.instances, 3);
        assert!(plan.networking.load_balancer);
        assert!(plan.monitoring.tracing);
        assert_eq!(plan.scaling.min_instances, 2);
        assert_eq!(plan.scaling.max_instances, 10);
    }

    #[test]
    fn test_database_and_security_plans() {
        let mut ctx = context("nodejs", EstimatedScale::Medium, false);
        ctx.database_usage = vec!["postgresql".into(), "sqlite".into(), "redis".into()];
        ctx.security_requirements = vec!["authentication".into(), "tls_encryption".into()];

        let plan = create_infrastructure_plan(&ctx, CloudProvider::Aws);
        assert_eq!(plan.databases.len(), 2);
        assert!(matches!(plan.databases[0], DatabasePlan::Postgresql { .. }));
        assert!(plan.security.identity_management);
        assert!(plan.security.force_https);
        assert!(!plan.security.secret_management);
        assert!(plan.security.waf);
    }

    #[test]
    fn test_deployment_strategy_selection() {
        let mut ctx = context("python", EstimatedScale::Large, false);
        assert_eq!(create_deployment_plan(&ctx).strategy, DeploymentStrategy::Canary);

        ctx.deployment_requirements.scaling_requirements = Some("high".to_string());
        assert_eq!(create_deployment_plan(&ctx).strategy, DeploymentStrategy::BlueGreen);

        let ctx = context("python", EstimatedScale::Small, false);
        assert_eq!(create_deployment_plan(&ctx).strategy, DeploymentStrategy::Rolling);
    }

    #[test]
    fn test_pipeline_stages_order() {
        let mut ctx = context("java", EstimatedScale::Small, false);
        ctx.build_tools = vec!["maven".to_string()];

        let names: Vec<String> = create_deployment_plan(&ctx)
            .stages
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "source",
                "build",
                "test",
                "deploy_staging",
                "integration_tests",
                "deploy_production"
            ]
        );

        ctx.security_requirements = vec!["authentication".to_string()];
        let plan = create_deployment_plan(&ctx);
        assert_eq!(plan.stages[3].name, "security_scan");
        assert!(plan.testing.security_tests);
        match &plan.stages[1].action {
            StageAction::Build { build } => {
                assert!(matches!(
                    build,
                    BuildConfig::Java {
                        build_tool: JavaBuildTool::Maven,
                        ..
                    }
                ))
            }
            other => panic!("unexpected stage {:?}", other),
        }
    }

    #[test]
    fn test_build_config_selection() {
        let mut ctx = context("rust", EstimatedScale::Small, false);
        assert_eq!(build_config(&ctx).runtime(), "docker");

        ctx.build_tools = vec!["npm".to_string()];
        assert_eq!(build_config(&ctx).runtime(), "nodejs");

        let ctx = context("python", EstimatedScale::Small, false);
        assert_eq!(build_config(&ctx).runtime(), "python");
    }

    #[test]
    fn test_stage_json_shape() {
        let stage: PipelineStage = serde_json::from_str(
            r#"{"name":"deploy_production","type":"deploy","environment":"production"}"#,
        )
        .unwrap();
        assert_eq!(
            stage.action,
            StageAction::Deploy {
                environment: "production".to_string(),
                auto_approve: false
            }
        );

        let stage: PipelineStage =
            serde_json::from_str(r#"{"name":"lint","type":"lint"}"#).unwrap();
        assert_eq!(stage.action, StageAction::Unknown);
    }
}
