//! Pipeline stage execution

use super::command::CommandRunner;
use super::ExecutionResult;
use crate::decision::{BuildConfig, PipelineStage, StageAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one stage within a deployment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub result: ExecutionResult,
}

/// Outcome of a full deployment run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub deployment_id: String,
    pub overall_success: bool,
    pub stage_results: Vec<StageResult>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl DeploymentReport {
    /// Stage names in execution order
    pub fn executed_stages(&self) -> Vec<&str> {
        self.stage_results.iter().map(|s| s.stage.as_str()).collect()
    }
}

pub(crate) fn deployment_id(at: DateTime<Utc>) -> String {
    format!("deploy-{}", at.format("%Y%m%d-%H%M%S"))
}

/// Run commands in order, stopping at the first failure
async fn run_all(runner: &dyn CommandRunner, commands: &[String]) -> Result<(), (String, String)> {
    for command in commands {
        let (success, output) = runner.run(command).await;
        if !success {
            return Err((command.clone(), output));
        }
    }
    Ok(())
}

pub(crate) async fn execute_stage(
    runner: &dyn CommandRunner,
    stage: &PipelineStage,
    now: DateTime<Utc>,
) -> ExecutionResult {
    match &stage.action {
        StageAction::SourceControl { trigger, branch } => {
            let command = format!("git checkout {}", branch);
            let (success, output) = runner.run(&command).await;
            let message = if success {
                "Source code checked out successfully".to_string()
            } else {
                format!("Source checkout failed: {}", command)
            };
            ExecutionResult::from_command(success, message)
                .detail("branch", branch.as_str())
                .detail("trigger", trigger.as_str())
                .detail("output", output)
        }
        StageAction::Build { build } => execute_build(runner, build, now).await,
        StageAction::Test {
            environment, suite, ..
        } => {
            let suite = suite.as_deref().unwrap_or("unit");
            let environment = environment.as_deref().unwrap_or("test");
            let command = format!("run-tests --suite {} --environment {}", suite, environment);
            let (success, output) = runner.run(&command).await;
            let status = if success { "passed" } else { "failed" };
            ExecutionResult::from_command(success, format!("{} tests {}", capitalize(suite), status))
                .detail("test_type", suite)
                .detail("environment", environment)
                .detail("output", output)
        }
        StageAction::Security {
            sast,
            dependency_check,
        } => {
            let mut scans = Vec::new();
            let mut command = "security-scan".to_string();
            if *sast {
                scans.push("SAST");
                command.push_str(" --sast");
            }
            if *dependency_check {
                scans.push("Dependency Check");
                command.push_str(" --dependency-check");
            }
            let (success, output) = runner.run(&command).await;
            let message = if success {
                "Security scans passed - no vulnerabilities found"
            } else {
                "Security scans found vulnerabilities"
            };
            ExecutionResult::from_command(success, message)
                .detail("scans", scans)
                .detail("output", output)
        }
        StageAction::Deploy {
            environment,
            auto_approve,
        } => {
            let command = format!("deploy --environment {}", environment);
            let (success, output) = runner.run(&command).await;
            let status = if success { "successful" } else { "failed" };
            ExecutionResult::from_command(success, format!("Deployment to {} {}", environment, status))
                .detail("environment", environment.as_str())
                .detail("auto_approve", *auto_approve)
                .detail("output", output)
        }
        StageAction::Unknown => {
            ExecutionResult::failure(format!("Unknown stage type for stage {}", stage.name), false)
                .detail("stage", stage.name.as_str())
        }
    }
}

async fn execute_build(
    runner: &dyn CommandRunner,
    build: &BuildConfig,
    now: DateTime<Utc>,
) -> ExecutionResult {
    let (commands, label, mut extra) = match build {
        BuildConfig::Nodejs {
            install_cmd,
            build_cmd,
            artifact_path,
            ..
        } => (
            vec![install_cmd.clone(), build_cmd.clone()],
            "Node.js",
            vec![("artifact_path", artifact_path.clone())],
        ),
        BuildConfig::Python {
            install_cmd,
            build_cmd,
            artifact_path,
            ..
        } => (
            vec![install_cmd.clone(), build_cmd.clone()],
            "Python",
            vec![("artifact_path", artifact_path.clone())],
        ),
        BuildConfig::Java {
            build_tool,
            build_cmd,
            artifact_path,
            ..
        } => (
            vec![build_cmd.clone()],
            "Java",
            vec![
                ("artifact_path", artifact_path.clone()),
                ("build_tool", format!("{:?}", build_tool).to_lowercase()),
            ],
        ),
        BuildConfig::Docker { dockerfile } => {
            let image_tag = format!("app:{}", now.format("%Y%m%d-%H%M%S"));
            (
                vec![format!("docker build -f {} -t {} .", dockerfile, image_tag)],
                "Docker",
                vec![("image_tag", image_tag)],
            )
        }
    };

    match run_all(runner, &commands).await {
        Ok(()) => {
            extra.push(("runtime", build.runtime().to_string()));
            extra.into_iter().fold(
                ExecutionResult::success(format!("{} build completed successfully", label)),
                |result, (key, value)| result.detail(key, value),
            )
        }
        Err((command, output)) => {
            ExecutionResult::failure(format!("{} build failed: {}", label, command), true)
                .detail("command", command)
                .detail("output", output)
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
