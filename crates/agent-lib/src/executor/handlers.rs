//! Action handlers
//!
//! One handler per supported [`ActionType`](crate::decision::ActionType).
//! Handlers never fail past their boundary: every outcome is an
//! [`ExecutionResult`].

use super::command::CommandRunner;
use super::provider::{scale_command, ScaleDirection};
use super::ExecutionResult;
use crate::config::CloudProvider;
use crate::decision::Decision;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default number of restart attempts when healing a service
pub const DEFAULT_HEAL_ATTEMPTS: u64 = 3;

/// Shared capabilities handed to every handler
#[derive(Clone)]
pub struct HandlerContext {
    pub runner: Arc<dyn CommandRunner>,
    pub cloud_provider: CloudProvider,
    pub heal_retry_delay: Duration,
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, decision: &Decision, ctx: &HandlerContext) -> ExecutionResult;
}

pub struct ScaleHandler {
    pub direction: ScaleDirection,
}

#[async_trait]
impl ActionHandler for ScaleHandler {
    async fn execute(&self, decision: &Decision, ctx: &HandlerContext) -> ExecutionResult {
        let target = decision.target.as_str();
        let metric = decision.str_param("metric").unwrap_or("instances");
        let amount = decision
            .str_param(self.direction.amount_key())
            .or_else(|| decision.str_param("reduction"))
            .unwrap_or("1");

        let Some(command) = scale_command(ctx.cloud_provider, self.direction, target, metric, amount)
        else {
            return ExecutionResult::success(format!("{} {} successfully", past_tense(self.direction), target))
                .detail("target", target)
                .detail("parameters", Value::Object(decision.parameters.clone()));
        };

        let (success, output) = ctx.runner.run(&command).await;
        let provider = match ctx.cloud_provider {
            CloudProvider::Aws => "AWS",
            CloudProvider::Gcp => "GCP",
            CloudProvider::Azure => "Azure",
            CloudProvider::Generic => "Generic",
        };
        let status = if success { "completed" } else { "failed" };

        ExecutionResult::from_command(success, format!("{} {} {}", provider, self.direction.label(), status))
            .detail("target", target)
            .detail("metric", metric)
            .detail(self.direction.amount_key(), amount)
            .detail("command", command)
            .detail("output", output)
    }
}

fn past_tense(direction: ScaleDirection) -> &'static str {
    match direction {
        ScaleDirection::Up => "Scaled up",
        ScaleDirection::Down => "Scaled down",
    }
}

pub struct RestartHandler;

#[async_trait]
impl ActionHandler for RestartHandler {
    async fn execute(&self, decision: &Decision, ctx: &HandlerContext) -> ExecutionResult {
        let target = decision.target.as_str();
        let graceful = decision.bool_param("graceful").unwrap_or(true);
        let timeout = decision.str_param("timeout").unwrap_or("30s");

        let command = if graceful {
            format!("systemctl reload {}", target)
        } else {
            format!("systemctl restart {}", target)
        };
        let (success, output) = ctx.runner.run(&command).await;
        let status = if success { "completed" } else { "failed" };

        ExecutionResult::from_command(success, format!("Service restart {}", status))
            .detail("target", target)
            .detail("graceful", graceful)
            .detail("timeout", timeout)
            .detail("output", output)
    }
}

/// Restores the previous stable release. The release switch itself belongs
/// to the deployment collaborator.
pub struct RollbackHandler;

#[async_trait]
impl ActionHandler for RollbackHandler {
    async fn execute(&self, decision: &Decision, _ctx: &HandlerContext) -> ExecutionResult {
        let target = decision.str_param("target").unwrap_or("previous_stable");
        ExecutionResult::success("Rollback completed successfully").detail("target", target)
    }
}

pub struct HealHandler;

#[async_trait]
impl ActionHandler for HealHandler {
    async fn execute(&self, decision: &Decision, ctx: &HandlerContext) -> ExecutionResult {
        let target = decision.target.as_str();
        let action = decision.str_param("action").unwrap_or("restart");
        let max_attempts = decision.u64_param("max_attempts").unwrap_or(DEFAULT_HEAL_ATTEMPTS);

        if action != "restart" {
            return ExecutionResult::failure(format!("Unsupported heal action: {}", action), false)
                .detail("target", target)
                .detail("action", action);
        }

        let command = format!("systemctl restart {}", target);
        for attempt in 1..=max_attempts {
            let (success, output) = ctx.runner.run(&command).await;
            if success {
                return ExecutionResult::success(format!("Service {} healed successfully", target))
                    .detail("target", target)
                    .detail("action", action)
                    .detail("attempts", attempt);
            }

            debug!(target = %target, attempt, output = %output, "Heal attempt failed");
            if attempt < max_attempts && !ctx.heal_retry_delay.is_zero() {
                tokio::time::sleep(ctx.heal_retry_delay).await;
            }
        }

        warn!(target = %target, attempts = max_attempts, "Service could not be healed");
        let mut result = ExecutionResult::failure(
            format!("Failed to heal service {} after {} attempts", target, max_attempts),
            false,
        )
        .detail("target", target)
        .detail("action", action)
        .detail("attempts", max_attempts);
        if let Some(plan) = &decision.rollback_plan {
            result = result.detail("rollback_plan", Value::Object(plan.clone()));
        }
        result
    }
}

pub struct OptimizeHandler;

#[async_trait]
impl ActionHandler for OptimizeHandler {
    async fn execute(&self, decision: &Decision, ctx: &HandlerContext) -> ExecutionResult {
        let target = decision.target.as_str();
        let action = decision.str_param("action").unwrap_or("");

        let command = match action {
            "increase_cache_size" => Some(format!(
                "redis-cli CONFIG SET maxmemory +{}",
                decision.str_param("amount").unwrap_or("50%")
            )),
            "cleanup_logs" => {
                let retention = decision.str_param("retention").unwrap_or("7d");
                let days = retention.trim_end_matches(|c: char| !c.is_ascii_digit());
                Some(format!("find /var/log -name '*.log' -mtime +{} -delete", days))
            }
            "identify_unused" => Some("docker system prune -f".to_string()),
            _ => None,
        };

        let (success, output) = match &command {
            Some(command) => ctx.runner.run(command).await,
            None => (true, "Performance optimization completed".to_string()),
        };
        let status = if success { "completed" } else { "failed" };

        ExecutionResult::from_command(success, format!("Performance optimization {}", status))
            .detail("target", target)
            .detail("action", action)
            .detail("output", output)
    }
}

pub struct UpdateSecurityHandler;

#[async_trait]
impl ActionHandler for UpdateSecurityHandler {
    async fn execute(&self, decision: &Decision, ctx: &HandlerContext) -> ExecutionResult {
        let target = decision.target.as_str();
        let action = decision.str_param("action").unwrap_or("");

        let command = match action {
            "block_suspicious_ips" => Some("iptables -A INPUT -s suspicious_ip -j DROP"),
            "renew_certificates" => Some("certbot renew --quiet"),
            _ => None,
        };

        let (success, output) = match command {
            Some(command) => ctx.runner.run(command).await,
            None => (true, "Security update completed".to_string()),
        };
        let status = if success { "completed" } else { "failed" };

        let mut result = ExecutionResult::from_command(success, format!("Security update {}", status))
            .detail("target", target)
            .detail("action", action)
            .detail("output", output);
        if let Some(alert_id) = decision.str_param("alert_id") {
            result = result.detail("alert_id", alert_id);
        }
        result
    }
}

pub struct UpdateConfigHandler;

#[async_trait]
impl ActionHandler for UpdateConfigHandler {
    async fn execute(&self, decision: &Decision, _ctx: &HandlerContext) -> ExecutionResult {
        let changes = decision
            .parameters
            .get("changes")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));

        ExecutionResult::success(format!("Configuration updated for {}", decision.target))
            .detail("target", decision.target.as_str())
            .detail("changes", changes)
    }
}
