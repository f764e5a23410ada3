//! Simulated telemetry
//!
//! Stand-ins for a real telemetry backend, health endpoints and a security
//! feed. Values follow fixed distributions with occasional spikes so the
//! decision rules get exercised.

use super::{MetricSource, SecurityFeed, ServiceChecker};
use async_trait::async_trait;
use crate::error::Result;
use crate::models::{Alert, AlertSeverity, AlertType, MetricSample, MIN_RESPONSE_TIME_SECS};
use rand::Rng;
use std::time::Duration;

/// Normal sample via Box-Muller
fn gauss<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + z * std_dev
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedMetricSource;

impl SimulatedMetricSource {
    pub fn generate<R: Rng>(rng: &mut R) -> MetricSample {
        let mut cpu = percent(gauss(rng, 45.0, 15.0));
        if rng.gen_bool(0.05) {
            cpu = (cpu + rng.gen_range(20.0..40.0)).min(100.0);
        }

        let mut memory = percent(gauss(rng, 60.0, 10.0));
        if rng.gen_bool(0.02) {
            memory = (memory + rng.gen_range(10.0..25.0)).min(100.0);
        }

        let disk = percent(gauss(rng, 35.0, 5.0));
        let network = percent(gauss(rng, 25.0, 20.0));

        let mut response_time = gauss(rng, 0.8, 0.3).max(MIN_RESPONSE_TIME_SECS);
        if rng.gen_bool(0.03) {
            response_time += rng.gen_range(1.0..4.0);
        }

        let mut error_rate = gauss(rng, 1.5, 1.0).max(0.0);
        if rng.gen_bool(0.02) {
            error_rate += rng.gen_range(3.0..8.0);
        }

        let request_count = gauss(rng, 150.0, 50.0).max(0.0) as u64;

        MetricSample {
            cpu_usage: round_to(cpu, 2),
            memory_usage: round_to(memory, 2),
            disk_usage: round_to(disk, 2),
            network_usage: round_to(network, 2),
            response_time: round_to(response_time, 3),
            error_rate: round_to(error_rate, 2),
            request_count,
        }
    }
}

#[async_trait]
impl MetricSource for SimulatedMetricSource {
    async fn sample(&self) -> Result<MetricSample> {
        Ok(Self::generate(&mut rand::thread_rng()))
    }
}

/// Checker that reports services up 98% of the time after a short delay
#[derive(Debug, Clone)]
pub struct SimulatedServiceChecker {
    pub uptime: f64,
    pub latency: Duration,
}

impl Default for SimulatedServiceChecker {
    fn default() -> Self {
        Self {
            uptime: 0.98,
            latency: Duration::from_millis(100),
        }
    }
}

#[async_trait]
impl ServiceChecker for SimulatedServiceChecker {
    async fn check(&self, _service: &str) -> Result<bool> {
        tokio::time::sleep(self.latency).await;
        let uptime = self.uptime.clamp(0.0, 1.0);
        Ok(rand::thread_rng().gen_bool(uptime))
    }
}

/// Feed that occasionally reports suspicious logins and expiring certificates
#[derive(Debug, Clone)]
pub struct SimulatedSecurityFeed {
    pub suspicious_login_probability: f64,
    pub ssl_expiry_probability: f64,
}

impl Default for SimulatedSecurityFeed {
    fn default() -> Self {
        Self {
            suspicious_login_probability: 0.01,
            ssl_expiry_probability: 0.005,
        }
    }
}

#[async_trait]
impl SecurityFeed for SimulatedSecurityFeed {
    async fn poll(&self) -> Vec<Alert> {
        let mut rng = rand::thread_rng();
        let mut alerts = Vec::new();

        if rng.gen_bool(self.suspicious_login_probability.clamp(0.0, 1.0)) {
            alerts.push(Alert::new(
                AlertType::Security,
                AlertSeverity::High,
                "Suspicious login attempts detected",
            ));
        }
        if rng.gen_bool(self.ssl_expiry_probability.clamp(0.0, 1.0)) {
            alerts.push(Alert::new(
                AlertType::Security,
                AlertSeverity::Medium,
                "SSL certificate expiring in 7 days",
            ));
        }

        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_samples_within_bounds() {
        let mut rng = rand::thread_rng();
        for _ in 0..500 {
            let sample = SimulatedMetricSource::generate(&mut rng);
            assert!((0.0..=100.0).contains(&sample.cpu_usage));
            assert!((0.0..=100.0).contains(&sample.memory_usage));
            assert!((0.0..=100.0).contains(&sample.network_usage));
            assert!(sample.response_time >= MIN_RESPONSE_TIME_SECS);
            assert!(sample.error_rate >= 0.0);
        }
    }

    #[tokio::test]
    async fn test_checker_extremes() {
        let down = SimulatedServiceChecker {
            uptime: 0.0,
            latency: Duration::ZERO,
        };
        assert!(!down.check("api").await.unwrap());

        let up = SimulatedServiceChecker {
            uptime: 1.0,
            latency: Duration::ZERO,
        };
        assert!(up.check("api").await.unwrap());
    }

    #[tokio::test]
    async fn test_security_feed_certain_findings() {
        let feed = SimulatedSecurityFeed {
            suspicious_login_probability: 1.0,
            ssl_expiry_probability: 1.0,
        };
        let alerts = feed.poll().await;
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, AlertSeverity::High);
        assert!(alerts[1].message.contains("SSL"));
    }
}
