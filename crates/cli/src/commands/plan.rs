//! Offline planning commands
//!
//! These render the plans the agent would produce for a project context
//! without contacting a running agent.

use anyhow::{Context, Result};
use colored::Colorize;
use opsloop_lib::decision::{
    create_deployment_plan, create_infrastructure_plan, BuildConfig, DeploymentPlan,
    InfrastructurePlan, StageAction,
};
use opsloop_lib::{CloudProvider, ProjectContext};
use std::path::Path;
use tabled::Tabled;

use crate::output::{print_heading, print_json, print_rows, OutputFormat};

/// Row for pipeline stage table
#[derive(Tabled)]
struct StageRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Stage")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Details")]
    details: String,
}

/// Row for infrastructure resource table
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Setting")]
    setting: String,
}

/// Read a project context from a JSON file
pub fn load_context(path: &Path) -> Result<ProjectContext> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read context file {}", path.display()))?;

    serde_json::from_str(&content).context("Failed to parse project context")
}

/// Show the infrastructure plan for a project
pub fn show_infrastructure(
    context_path: &Path,
    cloud: CloudProvider,
    format: OutputFormat,
) -> Result<()> {
    let context = load_context(context_path)?;
    let plan = create_infrastructure_plan(&context, cloud);

    match format {
        OutputFormat::Json => print_json(&plan)?,
        OutputFormat::Table => {
            print_heading(&format!("Infrastructure Plan ({})", plan.cloud_provider));
            print_rows(resource_rows(&plan), "Nothing to provision");
        }
    }

    Ok(())
}

/// Show the deployment pipeline for a project
pub fn show_deployment(context_path: &Path, format: OutputFormat) -> Result<()> {
    let context = load_context(context_path)?;
    let plan = create_deployment_plan(&context);

    match format {
        OutputFormat::Json => print_json(&plan)?,
        OutputFormat::Table => {
            print_heading("Deployment Plan");
            println!("Strategy:   {}", plan.strategy.to_string().cyan());
            println!(
                "Rollback:   {} ({})",
                if plan.rollback.automatic { "automatic" } else { "manual" },
                plan.rollback.conditions.join(", ")
            );
            println!();
            print_rows(stage_rows(&plan), "No pipeline stages");
        }
    }

    Ok(())
}

fn resource_rows(plan: &InfrastructurePlan) -> Vec<ResourceRow> {
    let mut rows = vec![ResourceRow {
        resource: "compute".to_string(),
        setting: format!(
            "{} vCPU, {} GB memory, {} GB storage, {} instance(s)",
            plan.compute.cpu, plan.compute.memory_gb, plan.compute.storage_gb, plan.compute.instances
        ),
    }];

    for db in &plan.databases {
        let setting = serde_json::to_value(db)
            .map(|v| v.to_string())
            .unwrap_or_default();
        rows.push(ResourceRow {
            resource: "database".to_string(),
            setting,
        });
    }

    let networking = &plan.networking;
    rows.push(ResourceRow {
        resource: "networking".to_string(),
        setting: enabled_flags(&[
            ("load_balancer", networking.load_balancer),
            ("cdn", networking.cdn),
            ("vpc", networking.vpc),
        ]),
    });

    let security = &plan.security;
    rows.push(ResourceRow {
        resource: "security".to_string(),
        setting: enabled_flags(&[
            ("firewall", security.firewall),
            ("waf", security.waf),
            ("ssl_certificates", security.ssl_certificates),
            ("secret_management", security.secret_management),
            ("vulnerability_scanning", security.vulnerability_scanning),
            ("identity_management", security.identity_management),
            ("force_https", security.force_https),
        ]),
    });

    let scaling = &plan.scaling;
    rows.push(ResourceRow {
        resource: "scaling".to_string(),
        setting: if scaling.enabled {
            format!(
                "{}-{} instances, up at {}%, down at {}%",
                scaling.min_instances,
                scaling.max_instances,
                scaling.scale_up_threshold,
                scaling.scale_down_threshold
            )
        } else {
            "disabled".to_string()
        },
    });

    rows
}

fn enabled_flags(flags: &[(&str, bool)]) -> String {
    let enabled: Vec<&str> = flags
        .iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| *name)
        .collect();

    if enabled.is_empty() {
        "none".to_string()
    } else {
        enabled.join(", ")
    }
}

fn stage_rows(plan: &DeploymentPlan) -> Vec<StageRow> {
    plan.stages
        .iter()
        .enumerate()
        .map(|(i, stage)| StageRow {
            index: i + 1,
            name: stage.name.clone(),
            kind: stage.action.kind().to_string(),
            details: stage_details(&stage.action),
        })
        .collect()
}

fn stage_details(action: &StageAction) -> String {
    match action {
        StageAction::SourceControl { trigger, branch } => {
            format!("{} on {}", trigger, branch)
        }
        StageAction::Build { build } => match build {
            BuildConfig::Nodejs { build_cmd, .. } | BuildConfig::Python { build_cmd, .. } => {
                format!("{}: {}", build.runtime(), build_cmd)
            }
            BuildConfig::Java { build_cmd, .. } => format!("java: {}", build_cmd),
            BuildConfig::Docker { dockerfile } => format!("docker: {}", dockerfile),
        },
        StageAction::Test {
            environment, suite, ..
        } => format!(
            "suite {} in {}",
            suite.as_deref().unwrap_or("unit"),
            environment.as_deref().unwrap_or("test")
        ),
        StageAction::Security {
            sast,
            dependency_check,
        } => enabled_flags(&[("sast", *sast), ("dependency_check", *dependency_check)]),
        StageAction::Deploy {
            environment,
            auto_approve,
        } => {
            if *auto_approve {
                format!("{} (auto-approved)", environment)
            } else {
                environment.clone()
            }
        }
        StageAction::Unknown => "-".to_string(),
    }
}
