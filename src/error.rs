//! Bridge Error Types
//!
//! This module defines the error taxonomy shared by both bridge directions,
//! the wire representation of a failed task, and the HTTP error body used for
//! protocol-level failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur while bridging between the tool and agent protocols
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Construction-time misconfiguration, never recovered
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Input failed validation against the tool's schema
    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },

    /// Structural violation of the expected message shape
    #[error("Protocol mismatch: {message}")]
    ProtocolMismatch { message: String },

    /// The local handler faulted during invocation
    #[error("Handler execution failed: {message}")]
    HandlerExecution { message: String },

    /// The remote agent reported a failed task
    #[error("Remote task failed ({code}): {message}")]
    RemoteTask { code: String, message: String },

    /// Network-level failure, retried a bounded number of times before surfacing
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Deadline exceeded while awaiting task completion
    #[error("Timed out after {timeout_ms}ms awaiting task completion")]
    Timeout { timeout_ms: u64 },

    /// Use of a bridge after `close()`
    #[error("Bridge is closed")]
    ClosedResource,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl BridgeError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a schema validation error
    pub fn schema_validation(message: impl Into<String>) -> Self {
        Self::SchemaValidation {
            message: message.into(),
        }
    }

    /// Create a protocol mismatch error
    pub fn protocol_mismatch(message: impl Into<String>) -> Self {
        Self::ProtocolMismatch {
            message: message.into(),
        }
    }

    /// Create a handler execution error
    pub fn handler_execution(message: impl Into<String>) -> Self {
        Self::HandlerExecution {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// The stable wire code for this error
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Configuration { .. } => "ConfigurationError",
            BridgeError::SchemaValidation { .. } => "SchemaValidationError",
            BridgeError::ProtocolMismatch { .. } => "ProtocolMismatchError",
            BridgeError::HandlerExecution { .. } => "HandlerExecutionError",
            BridgeError::RemoteTask { .. } => "RemoteTaskError",
            BridgeError::Transport { .. } => "TransportError",
            BridgeError::Timeout { .. } => "TimeoutError",
            BridgeError::ClosedResource => "ClosedResourceError",
            BridgeError::Serialization(_) => "ProtocolMismatchError",
            BridgeError::Url(_) => "ConfigurationError",
        }
    }

    /// Check if this error is retryable at the transport level
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Transport { .. })
    }
}

/// Structured error carried by a failed task
///
/// Both fields are always non-empty: every failure path sets a stable code
/// and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    /// Stable error code, e.g. `"HandlerExecutionError"`
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl TaskError {
    /// Create a new task error
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<BridgeError> for TaskError {
    fn from(err: BridgeError) -> Self {
        TaskError::new(err.code(), err.to_string())
    }
}

impl From<TaskError> for BridgeError {
    fn from(err: TaskError) -> Self {
        BridgeError::RemoteTask {
            code: err.code,
            message: err.message,
        }
    }
}

/// HTTP error body for protocol-level failures (unknown task id, cancel on a
/// terminal task). Local tool faults never use this shape; they are encoded
/// as failed tasks instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP-style status code
    pub code: u16,
    /// Error message
    pub message: String,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            BridgeError::configuration("bad").code(),
            "ConfigurationError"
        );
        assert_eq!(
            BridgeError::schema_validation("bad").code(),
            "SchemaValidationError"
        );
        assert_eq!(
            BridgeError::protocol_mismatch("bad").code(),
            "ProtocolMismatchError"
        );
        assert_eq!(
            BridgeError::handler_execution("bad").code(),
            "HandlerExecutionError"
        );
        assert_eq!(BridgeError::transport("bad").code(), "TransportError");
        assert_eq!(BridgeError::Timeout { timeout_ms: 10 }.code(), "TimeoutError");
        assert_eq!(BridgeError::ClosedResource.code(), "ClosedResourceError");
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(BridgeError::transport("reset").is_retryable());
        assert!(!BridgeError::Timeout { timeout_ms: 10 }.is_retryable());
        assert!(!BridgeError::protocol_mismatch("bad").is_retryable());
        assert!(!BridgeError::ClosedResource.is_retryable());
    }

    #[test]
    fn test_task_error_round_trip() {
        let err = BridgeError::handler_execution("handler blew up");
        let task_err: TaskError = err.into();
        assert_eq!(task_err.code, "HandlerExecutionError");
        assert!(task_err.message.contains("handler blew up"));

        let back: BridgeError = task_err.into();
        assert!(matches!(back, BridgeError::RemoteTask { .. }));
        assert_eq!(back.code(), "RemoteTaskError");
    }

    #[test]
    fn test_error_messages_are_never_empty() {
        let errors = [
            BridgeError::configuration("x"),
            BridgeError::schema_validation("x"),
            BridgeError::protocol_mismatch("x"),
            BridgeError::handler_execution("x"),
            BridgeError::transport("x"),
            BridgeError::Timeout { timeout_ms: 1 },
            BridgeError::ClosedResource,
        ];
        for err in errors {
            assert!(!err.to_string().is_empty());
            assert!(!err.code().is_empty());
        }
    }
}
