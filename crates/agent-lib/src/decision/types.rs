//! Decision model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of corrective or optimizing action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ScaleUp,
    ScaleDown,
    RestartService,
    DeployUpdate,
    Rollback,
    UpdateConfig,
    CreateAlert,
    HealService,
    OptimizePerformance,
    UpdateSecurity,
}

impl ActionType {
    pub const ALL: [ActionType; 10] = [
        ActionType::ScaleUp,
        ActionType::ScaleDown,
        ActionType::RestartService,
        ActionType::DeployUpdate,
        ActionType::Rollback,
        ActionType::UpdateConfig,
        ActionType::CreateAlert,
        ActionType::HealService,
        ActionType::OptimizePerformance,
        ActionType::UpdateSecurity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ScaleUp => "scale_up",
            ActionType::ScaleDown => "scale_down",
            ActionType::RestartService => "restart_service",
            ActionType::DeployUpdate => "deploy_update",
            ActionType::Rollback => "rollback",
            ActionType::UpdateConfig => "update_config",
            ActionType::CreateAlert => "create_alert",
            ActionType::HealService => "heal_service",
            ActionType::OptimizePerformance => "optimize_performance",
            ActionType::UpdateSecurity => "update_security",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision priority, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
            Priority::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A proposed action with its justification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action_type: ActionType,
    pub priority: Priority,
    pub target: String,
    pub parameters: Map<String, Value>,
    pub reasoning: String,
    pub expected_outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_plan: Option<Map<String, Value>>,
    pub timestamp: DateTime<Utc>,
}

impl Decision {
    pub fn new(action_type: ActionType, priority: Priority, target: impl Into<String>) -> Self {
        Self {
            action_type,
            priority,
            target: target.into(),
            parameters: Map::new(),
            reasoning: String::new(),
            expected_outcome: String::new(),
            rollback_plan: None,
            timestamp: Utc::now(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }

    pub fn reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn expected_outcome(mut self, expected_outcome: impl Into<String>) -> Self {
        self.expected_outcome = expected_outcome.into();
        self
    }

    pub fn rollback(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.rollback_plan
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// String parameter, if present
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }

    /// Boolean parameter, if present
    pub fn bool_param(&self, key: &str) -> Option<bool> {
        self.parameters.get(key).and_then(Value::as_bool)
    }

    /// Unsigned integer parameter, if present
    pub fn u64_param(&self, key: &str) -> Option<u64> {
        self.parameters.get(key).and_then(Value::as_u64)
    }

    pub fn summary(&self) -> DecisionSummary {
        DecisionSummary {
            action: self.action_type,
            priority: self.priority,
            target: self.target.clone(),
            reasoning: self.reasoning.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Decision as shown in status reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub action: ActionType,
    pub priority: Priority,
    pub target: String,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}
