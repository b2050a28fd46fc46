//! Task Driver
//!
//! Drives a submitted task to a terminal state by polling its status with
//! exponential backoff. The driver owns the retry and deadline policy:
//! transport failures are retried a bounded number of times, a wall-clock
//! deadline bounds the total wait, and exceeding it triggers a best-effort
//! cancellation of the remote task without waiting for acknowledgement.
//!
//! The driver observes status transitions monotonically; a regression or an
//! unexpected terminal status reported by the remote agent is a protocol
//! violation. No task state is retained past terminal status.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::client::AgentClient;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{Task, TaskStatus};

/// Polling policy for the task driver
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// First poll interval; doubles on every poll
    pub base_interval: Duration,
    /// Cap on the backoff interval
    pub max_interval: Duration,
    /// Transport failures tolerated before surfacing `TransportError`;
    /// the budget resets after every successful poll
    pub max_transport_retries: u32,
    /// The driver's own maximum wait for a terminal status
    pub deadline: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(50),
            max_interval: Duration::from_secs(2),
            max_transport_retries: 3,
            deadline: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    /// Set the base poll interval
    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    /// Set the maximum poll interval
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the transport retry bound
    pub fn with_max_transport_retries(mut self, retries: u32) -> Self {
        self.max_transport_retries = retries;
        self
    }

    /// Set the driver's maximum wait
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Drive a task to a terminal state
///
/// Returns the terminal task for `completed` and `failed`; mapping a failed
/// task into the caller's fault taxonomy is the caller's concern. Any other
/// terminal status is a [`BridgeError::ProtocolMismatch`].
///
/// `caller_deadline` is honored independently of the policy's own cap; the
/// effective deadline is the smaller of the two. `closed` is checked at every
/// suspension point so an in-flight drive observes bridge closure promptly.
pub async fn drive_to_terminal(
    client: &AgentClient,
    task: Task,
    policy: &PollPolicy,
    caller_deadline: Option<Duration>,
    closed: &AtomicBool,
) -> BridgeResult<Task> {
    let deadline = caller_deadline.map_or(policy.deadline, |d| d.min(policy.deadline));
    let start = Instant::now();
    let mut interval = policy.base_interval;
    let mut retries_left = policy.max_transport_retries;
    let mut last_rank = status_rank(task.status);
    let mut current = task;

    loop {
        if current.is_terminal() {
            return match current.status {
                TaskStatus::Completed | TaskStatus::Failed => Ok(current),
                other => Err(BridgeError::protocol_mismatch(format!(
                    "remote agent reported unexpected terminal status '{other}' for task {}",
                    current.id
                ))),
            };
        }

        if closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ClosedResource);
        }

        if start.elapsed() >= deadline {
            cancel_best_effort(client, &current.id);
            return Err(BridgeError::Timeout {
                timeout_ms: deadline.as_millis() as u64,
            });
        }

        tokio::time::sleep(interval).await;
        interval = (interval * 2).min(policy.max_interval);

        if closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ClosedResource);
        }

        match client.get_task(&current.id).await {
            Ok(next) => {
                let rank = status_rank(next.status);
                if rank < last_rank {
                    return Err(BridgeError::protocol_mismatch(format!(
                        "task {} status regressed from {} to {}",
                        current.id, current.status, next.status
                    )));
                }
                debug!(task_id = %next.id, status = %next.status, "polled task");
                last_rank = rank;
                retries_left = policy.max_transport_retries;
                current = next;
            }
            Err(e) if e.is_retryable() => {
                if retries_left == 0 {
                    return Err(BridgeError::transport(format!(
                        "polling task {} failed after {} retries: {e}",
                        current.id, policy.max_transport_retries
                    )));
                }
                retries_left -= 1;
                warn!(task_id = %current.id, error = %e, retries_left, "transient poll failure");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Issue a cancellation without waiting for it to be acknowledged
pub(crate) fn cancel_best_effort(client: &AgentClient, task_id: &str) {
    let client = client.clone();
    let task_id = task_id.to_string();
    tokio::spawn(async move {
        match client
            .cancel_task(&task_id, Some("deadline exceeded".to_string()))
            .await
        {
            Ok(_) => debug!(task_id = %task_id, "cancelled timed-out task"),
            Err(e) => debug!(task_id = %task_id, error = %e, "best-effort cancellation failed"),
        }
    });
}

fn status_rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Pending => 0,
        TaskStatus::Running => 1,
        TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ranks_are_monotonic() {
        assert!(status_rank(TaskStatus::Pending) < status_rank(TaskStatus::Running));
        assert!(status_rank(TaskStatus::Running) < status_rank(TaskStatus::Completed));
        assert_eq!(
            status_rank(TaskStatus::Completed),
            status_rank(TaskStatus::Failed)
        );
    }

    #[test]
    fn test_policy_defaults() {
        let policy = PollPolicy::default();
        assert!(policy.base_interval < policy.max_interval);
        assert!(policy.max_transport_retries > 0);
    }

    #[test]
    fn test_policy_builder() {
        let policy = PollPolicy::default()
            .with_base_interval(Duration::from_millis(10))
            .with_max_interval(Duration::from_millis(100))
            .with_max_transport_retries(1)
            .with_deadline(Duration::from_secs(5));

        assert_eq!(policy.base_interval, Duration::from_millis(10));
        assert_eq!(policy.max_interval, Duration::from_millis(100));
        assert_eq!(policy.max_transport_retries, 1);
        assert_eq!(policy.deadline, Duration::from_secs(5));
    }
}
