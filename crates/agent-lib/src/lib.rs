//! Autonomous operations control loop
//!
//! This crate provides the core functionality for:
//! - Metric collection, alerting and service health checks
//! - Rule-based decisions with learned thresholds
//! - Action execution and deployment pipelines
//! - Learning from action outcomes
//! - Health checks and observability

pub mod agent;
pub mod config;
pub mod decision;
pub mod error;
pub mod executor;
pub mod health;
pub mod learning;
pub mod models;
pub mod monitoring;
pub mod observability;

pub use agent::{Agent, Capabilities, StatusReport};
pub use config::{CloudProvider, LoopConfig};
pub use error::{AgentError, Result};
pub use health::{HealthRegistry, HealthReport, ServiceHealth, ServiceStatus};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
