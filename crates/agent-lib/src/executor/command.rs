//! Command execution seam
//!
//! Provider CLIs, service managers and build tools are reached through a
//! [`CommandRunner`]. The agent ships with a simulated runner; tests supply
//! scripted ones.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command`, returning whether it succeeded and its output
    async fn run(&self, command: &str) -> (bool, String);
}

/// Runner that pretends to execute commands, succeeding 90% of the time
#[derive(Debug, Clone)]
pub struct SimulatedCommandRunner {
    pub success_rate: f64,
    pub latency: Duration,
}

impl Default for SimulatedCommandRunner {
    fn default() -> Self {
        Self {
            success_rate: 0.9,
            latency: Duration::from_secs(1),
        }
    }
}

#[async_trait]
impl CommandRunner for SimulatedCommandRunner {
    async fn run(&self, command: &str) -> (bool, String) {
        tokio::time::sleep(self.latency).await;
        let success = rand::thread_rng().gen_bool(self.success_rate.clamp(0.0, 1.0));
        debug!(command = %command, success, "Simulated command");

        if success {
            (true, format!("Command executed successfully: {}", command))
        } else {
            (false, format!("Command failed: {}", command))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_runner_extremes() {
        let always = SimulatedCommandRunner {
            success_rate: 1.0,
            latency: Duration::ZERO,
        };
        let (ok, output) = always.run("certbot renew --quiet").await;
        assert!(ok);
        assert!(output.ends_with("certbot renew --quiet"));

        let never = SimulatedCommandRunner {
            success_rate: 0.0,
            latency: Duration::ZERO,
        };
        let (ok, output) = never.run("docker system prune -f").await;
        assert!(!ok);
        assert!(output.starts_with("Command failed"));
    }
}
