//! Task lifecycle types and the request shapes of the agent endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::ContentBlock;
use crate::error::TaskError;

/// One remote invocation's lifecycle record
///
/// A task is created at submission, progresses monotonically through
/// `pending -> running -> {completed | failed}` and never reverts. `output`
/// is present iff completed; `error` is present iff failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for the task
    pub id: String,

    /// The skill this task invokes
    pub skill_id: String,

    /// Opaque input payload
    pub input: Value,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// Output content, present iff the task completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<ContentBlock>>,

    /// Failure detail, present iff the task failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,

    /// When the task was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// When the task was last updated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a new pending task with a generated id
    pub fn new(skill_id: impl Into<String>, input: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            skill_id: skill_id.into(),
            input,
            status: TaskStatus::Pending,
            output: None,
            error: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    /// Update the task status
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.updated_at = Some(Utc::now());
    }

    /// Mark the task completed with its output
    pub fn complete(&mut self, output: Vec<ContentBlock>) {
        self.output = Some(output);
        self.set_status(TaskStatus::Completed);
    }

    /// Mark the task failed with a structured error
    pub fn fail(&mut self, error: TaskError) {
        self.error = Some(error);
        self.set_status(TaskStatus::Failed);
    }

    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Task status indicating the current state in the task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Submitted, not yet picked up
    Pending,

    /// Actively being processed
    Running,

    /// Completed successfully
    Completed,

    /// Failed with an error
    Failed,

    /// Cancelled before reaching another terminal state
    Cancelled,
}

impl TaskStatus {
    /// Check if this status represents a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Check if this status indicates the task is still in progress
    pub fn is_in_progress(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Request to submit a new task to an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitTaskRequest {
    /// The skill to invoke
    pub skill_id: String,

    /// Opaque input payload for the skill
    pub input: Value,
}

/// Request to cancel a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelTaskRequest {
    /// Optional reason for cancellation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
