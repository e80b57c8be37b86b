//! Errors surfaced by flows.

use agentic_flows_model::{ErrorKind, ModelProviderError};
use serde::Serialize;

/// The error type of every flow in this crate.
///
/// Each variant maps to a stable [`code`](FlowError::code), so transports
/// can hand callers a single structured error through [`ErrorPayload`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FlowError {
    /// The model call failed or returned unusable output.
    #[error("generation failed ({kind}): {message}")]
    Generation {
        /// Kind reported by the provider.
        kind: ErrorKind,
        /// Human readable description.
        message: String,
    },

    /// The requested tool is not registered.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// A tool ran and failed.
    #[error("tool {name} failed: {reason}")]
    ToolExecution {
        /// Name of the failing tool.
        name: String,
        /// Reason reported by the tool.
        reason: String,
    },

    /// Resume was called with missing or mismatched interrupt ids.
    #[error(
        "unresolved interrupts (missing: {missing:?}, unexpected: {unexpected:?})"
    )]
    UnresolvedInterrupt {
        /// Pending ids without a resolved response.
        missing: Vec<String>,
        /// Resolved ids that match no pending interrupt, or appear twice.
        unexpected: Vec<String>,
    },

    /// The run needed more model calls than allowed.
    #[error("turn budget of {max_turns} model calls exceeded")]
    TurnBudgetExceeded {
        /// The configured budget.
        max_turns: usize,
    },

    /// One or more fan-out tasks failed.
    #[error("{} fan-out task(s) failed: {}", failures.len(), describe_failures(failures))]
    FanOutPartialFailure {
        /// Every failing task key with its error, ordered by key.
        failures: Vec<(String, FlowError)>,
    },

    /// A media part was expected but the model returned none.
    #[error("no media was produced")]
    NoMediaProduced,

    /// The flow observed its cancellation signal.
    #[error("cancelled")]
    Cancelled,

    /// A spawned task panicked or was torn down by the runtime.
    #[error("task failed: {0}")]
    TaskFailed(String),
}

impl FlowError {
    /// Creates a [`FlowError::Generation`] for output that could not be
    /// used, such as malformed structured output.
    #[inline]
    pub fn unusable_output<S: Into<String>>(message: S) -> Self {
        Self::Generation {
            kind: ErrorKind::Other,
            message: message.into(),
        }
    }

    /// Returns a stable, machine readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::Generation { .. } => "generation_error",
            FlowError::ToolNotFound(_) => "tool_not_found",
            FlowError::ToolExecution { .. } => "tool_execution_error",
            FlowError::UnresolvedInterrupt { .. } => "unresolved_interrupt",
            FlowError::TurnBudgetExceeded { .. } => "turn_budget_exceeded",
            FlowError::FanOutPartialFailure { .. } => "fan_out_partial_failure",
            FlowError::NoMediaProduced => "no_media_produced",
            FlowError::Cancelled => "cancelled",
            FlowError::TaskFailed(_) => "task_failed",
        }
    }

    /// Converts this error into its serializable form.
    #[inline]
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<Box<dyn ModelProviderError>> for FlowError {
    fn from(err: Box<dyn ModelProviderError>) -> Self {
        Self::Generation {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// The structured error a transport returns to its callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// See [`FlowError::code`].
    pub code: &'static str,
    /// Human readable description.
    pub message: String,
}

fn describe_failures(failures: &[(String, FlowError)]) -> String {
    failures
        .iter()
        .map(|(key, err)| format!("{key}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}
