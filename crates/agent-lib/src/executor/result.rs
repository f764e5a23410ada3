//! Execution outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of running one decision or pipeline stage
///
/// Failures are values, never errors: a failed action is a result with
/// `success == false`, a message saying why, and whether a later retry
/// may help.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    pub details: Map<String, Value>,
    /// Wall-clock seconds
    pub execution_time: f64,
    pub timestamp: DateTime<Utc>,
    pub retryable: bool,
}

impl ExecutionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: Map::new(),
            execution_time: 0.0,
            timestamp: Utc::now(),
            retryable: false,
        }
    }

    pub fn failure(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: Map::new(),
            execution_time: 0.0,
            timestamp: Utc::now(),
            retryable,
        }
    }

    /// Result of a command-backed operation
    pub fn from_command(success: bool, message: impl Into<String>) -> Self {
        if success {
            Self::success(message)
        } else {
            Self::failure(message, true)
        }
    }

    pub fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn timed(mut self, seconds: f64) -> Self {
        self.execution_time = seconds.max(0.0);
        self
    }

    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            success: self.success,
            message: self.message.clone(),
            execution_time: self.execution_time,
            timestamp: self.timestamp,
        }
    }
}

/// Execution as shown in status reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub success: bool,
    pub message: String,
    pub execution_time: f64,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failures_are_retryable() {
        let result = ExecutionResult::from_command(false, "AWS scale up failed");
        assert!(!result.success);
        assert!(result.retryable);

        let result = ExecutionResult::from_command(true, "AWS scale up completed");
        assert!(result.success);
        assert!(!result.retryable);
    }

    #[test]
    fn test_execution_time_never_negative() {
        let result = ExecutionResult::success("ok").timed(-0.5);
        assert_eq!(result.execution_time, 0.0);
        assert_eq!(result.summary().execution_time, 0.0);
    }
}
