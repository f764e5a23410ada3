//! Error types for the control loop library

/// Errors surfaced by the control loop outside of action execution
///
/// Action and pipeline failures are not errors: they are reported as
/// unsuccessful [`ExecutionResult`](crate::executor::ExecutionResult)s.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// An operation was called before the lifecycle step it depends on.
    /// Programming error; never retried.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// The metric source could not produce a sample
    #[error("metric source unavailable: {0}")]
    MetricSource(String),

    /// Learned knowledge could not be saved or restored
    #[error("learning data persistence failed: {0}")]
    Persistence(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Whether retrying the failed operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::MetricSource(_) | AgentError::Io(_))
    }
}

/// Convenience `Result` alias for control loop operations
pub type Result<T> = std::result::Result<T, AgentError>;
