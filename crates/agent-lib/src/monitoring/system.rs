//! Monitoring system and its background tasks
//!
//! Three periodic tasks run on independent timers: metric collection,
//! alert evaluation and service health checks. Each observes the shared
//! shutdown signal between ticks.

use super::{
    evaluate_thresholds, AlertStore, MetricSource, MetricStore, MetricsSummary, SecurityFeed,
    ServiceChecker, SimulatedMetricSource, SimulatedSecurityFeed, SimulatedServiceChecker,
};
use crate::config::LoopConfig;
use crate::error::Result;
use crate::health::{HealthRegistry, HealthReport, ServiceHealth};
use crate::models::{Alert, AlertSeverity, AlertType, DeploymentStatus, SystemState};
use crate::observability::{AgentMetrics, StructuredLogger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Monitoring status as shown in the agent status report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringStatus {
    pub is_monitoring: bool,
    pub metrics_collected: usize,
    pub active_alerts: usize,
    pub monitoring_interval: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct DeploymentRecord {
    status: DeploymentStatus,
    at: Option<DateTime<Utc>>,
}

pub struct MonitoringSystem {
    config: LoopConfig,
    source: Arc<dyn MetricSource>,
    checker: Arc<dyn ServiceChecker>,
    security: Arc<dyn SecurityFeed>,
    alerts: AlertStore,
    metrics: MetricStore,
    health: HealthRegistry,
    deployment: RwLock<DeploymentRecord>,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    agent_metrics: AgentMetrics,
    logger: StructuredLogger,
}

impl MonitoringSystem {
    pub fn builder() -> MonitoringSystemBuilder {
        MonitoringSystemBuilder::new()
    }

    pub fn alerts(&self) -> &AlertStore {
        &self.alerts
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn is_monitoring(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Fresh snapshot combining a new sample with current health, alerts and
    /// deployment record
    pub async fn get_system_state(&self) -> Result<SystemState> {
        let sample = self.source.sample().await?;
        let service_health = self.health.health_map().await;
        let alerts = self.alerts.snapshot().await;
        let deployment = *self.deployment.read().await;

        Ok(SystemState::new(
            sample,
            service_health,
            alerts,
            deployment.status,
            deployment.at,
        ))
    }

    /// Record the outcome of a deployment for the rollback rule
    pub async fn record_deployment(&self, status: DeploymentStatus, at: DateTime<Utc>) {
        info!(status = %status, at = %at, "Recording deployment");
        let mut deployment = self.deployment.write().await;
        deployment.status = status;
        deployment.at = Some(at);
    }

    /// One metric collection pass
    pub async fn collect_metrics_once(&self, now: DateTime<Utc>) -> Result<()> {
        let sample = self.source.sample().await?;
        self.metrics.record_sample(&sample, now);
        self.metrics.prune(now);

        let stored = self.metrics.len();
        self.agent_metrics.set_metric_samples(stored);
        debug!(stored, "Collected metrics");
        Ok(())
    }

    /// One alert evaluation pass: threshold alerts, security findings, then
    /// expiry of old alerts. Returns the number of new alerts.
    pub async fn check_alerts_once(&self, now: DateTime<Utc>) -> Result<usize> {
        let sample = self.source.sample().await?;
        let mut new_alerts = evaluate_thresholds(&sample, now);
        new_alerts.extend(self.security.poll().await);

        for alert in &new_alerts {
            self.logger.log_alert(alert);
        }

        let raised = new_alerts.len();
        let active = self.alerts.extend_and_prune(new_alerts, now).await;
        self.agent_metrics.set_active_alerts(active);

        if raised > 0 {
            info!(raised, active, "Generated new alerts");
        }
        Ok(raised)
    }

    /// Check every configured service concurrently
    ///
    /// A check that errors or exceeds the timeout marks only its own service
    /// degraded. A service reported down raises a critical health alert.
    pub async fn run_health_checks_once(&self) -> HealthReport {
        let timeout = self.config.health_check_timeout();
        let mut checks = JoinSet::new();

        for service in &self.config.services {
            let checker = Arc::clone(&self.checker);
            let service = service.clone();
            checks.spawn(async move {
                let outcome = tokio::time::timeout(timeout, checker.check(&service)).await;
                (service, outcome)
            });
        }

        let mut new_alerts = Vec::new();
        while let Some(joined) = checks.join_next().await {
            let (service, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Health check task failed");
                    continue;
                }
            };

            let health = match outcome {
                Ok(Ok(true)) => ServiceHealth::healthy(),
                Ok(Ok(false)) => {
                    warn!(service = %service, "Service health check failed");
                    new_alerts.push(Alert::new(
                        AlertType::Health,
                        AlertSeverity::Critical,
                        format!("Service {} is unhealthy", service),
                    ));
                    ServiceHealth::unhealthy("service reported down")
                }
                Ok(Err(e)) => ServiceHealth::degraded(format!("health check error: {}", e)),
                Err(_) => ServiceHealth::degraded(format!(
                    "health check timed out after {}s",
                    timeout.as_secs()
                )),
            };
            self.health.update(&service, health).await;
        }

        for alert in &new_alerts {
            self.logger.log_alert(alert);
        }
        if !new_alerts.is_empty() {
            let active = self.alerts.extend_and_prune(new_alerts, Utc::now()).await;
            self.agent_metrics.set_active_alerts(active);
        }

        self.health.report().await
    }

    pub fn metrics_summary(&self, hours: u32) -> MetricsSummary {
        self.metrics.summary(hours, Utc::now())
    }

    /// Start the background tasks. Calling this while already running is a
    /// no-op.
    pub async fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(
            interval_secs = self.config.monitoring_interval_secs,
            services = self.config.services.len(),
            "Starting monitoring system"
        );

        for service in &self.config.services {
            self.health.register(service).await;
        }

        let mut tasks = self.tasks.lock().await;

        let this = Arc::clone(self);
        tasks.push(tokio::spawn(run_periodic(
            "metric_collector",
            self.config.monitoring_interval(),
            self.shutdown_tx.subscribe(),
            move || {
                let this = Arc::clone(&this);
                async move { this.collect_metrics_once(Utc::now()).await }
            },
        )));

        let this = Arc::clone(self);
        tasks.push(tokio::spawn(run_periodic(
            "alert_checker",
            self.config.alert_interval(),
            self.shutdown_tx.subscribe(),
            move || {
                let this = Arc::clone(&this);
                async move { this.check_alerts_once(Utc::now()).await.map(|_| ()) }
            },
        )));

        let this = Arc::clone(self);
        tasks.push(tokio::spawn(run_periodic(
            "health_checker",
            self.config.health_interval(),
            self.shutdown_tx.subscribe(),
            move || {
                let this = Arc::clone(&this);
                async move {
                    this.run_health_checks_once().await;
                    Ok(())
                }
            },
        )));
    }

    /// Signal the background tasks and wait for them to exit
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Stopping monitoring system");
        let _ = self.shutdown_tx.send(());

        let handles: Vec<JoinHandle<()>> = self.tasks.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Monitoring task ended abnormally");
            }
        }
    }

    pub async fn status(&self) -> MonitoringStatus {
        MonitoringStatus {
            is_monitoring: self.is_monitoring(),
            metrics_collected: self.metrics.len(),
            active_alerts: self.alerts.len().await,
            monitoring_interval: self.config.monitoring_interval_secs,
        }
    }
}

/// Run `tick` every `period` until the shutdown signal fires
async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    debug!(task = name, period_secs = period.as_secs(), "Starting monitoring task");
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = tick().await {
                    warn!(task = name, error = %e, retryable = e.is_retryable(), "Monitoring task iteration failed");
                }
            }
            _ = shutdown.recv() => {
                debug!(task = name, "Shutting down monitoring task");
                break;
            }
        }
    }
}

/// Builder for [`MonitoringSystem`]; unset capabilities default to the
/// simulated ones
pub struct MonitoringSystemBuilder {
    config: LoopConfig,
    source: Option<Arc<dyn MetricSource>>,
    checker: Option<Arc<dyn ServiceChecker>>,
    security: Option<Arc<dyn SecurityFeed>>,
    logger: Option<StructuredLogger>,
}

impl MonitoringSystemBuilder {
    pub fn new() -> Self {
        Self {
            config: LoopConfig::default(),
            source: None,
            checker: None,
            security: None,
            logger: None,
        }
    }

    pub fn config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    pub fn metric_source(mut self, source: Arc<dyn MetricSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn service_checker(mut self, checker: Arc<dyn ServiceChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn security_feed(mut self, feed: Arc<dyn SecurityFeed>) -> Self {
        self.security = Some(feed);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> MonitoringSystem {
        let (shutdown_tx, _) = broadcast::channel(1);
        let health = HealthRegistry::with_services(&self.config.services);

        MonitoringSystem {
            source: self
                .source
                .unwrap_or_else(|| Arc::new(SimulatedMetricSource)),
            checker: self
                .checker
                .unwrap_or_else(|| Arc::new(SimulatedServiceChecker::default())),
            security: self
                .security
                .unwrap_or_else(|| Arc::new(SimulatedSecurityFeed::default())),
            alerts: AlertStore::new(),
            metrics: MetricStore::new(),
            health,
            deployment: RwLock::new(DeploymentRecord::default()),
            running: AtomicBool::new(false),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
            agent_metrics: AgentMetrics::new(),
            logger: self
                .logger
                .unwrap_or_else(|| StructuredLogger::new("opsloop")),
            config: self.config,
        }
    }
}

impl Default for MonitoringSystemBuilder {
    fn default() -> Self {
        Self::new()
    }
}
