//! Reverse Bridge (Agent -> Tools)
//!
//! Turns a remote agent into a set of local tools, one per skill. All proxy
//! tools share the bridge's transport and polling policy, and a single close
//! flag covers them together: after `close()`, every proxy fails promptly
//! with a closed-resource error, including invocations already in flight.
//!
//! The skill set is a snapshot of the identity the bridge was built from; a
//! remote agent that changes its skills requires a new bridge.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::client::AgentClient;
use crate::driver::{PollPolicy, cancel_best_effort, drive_to_terminal};
use crate::error::{BridgeError, BridgeResult};
use crate::schema;
use crate::types::{AgentIdentity, ContentBlock, Task, TaskStatus, Tool, ToolArgs, ToolHandler};

/// State shared by every proxy tool of one bridge
#[derive(Debug)]
struct ReverseShared {
    client: AgentClient,
    policy: PollPolicy,
    call_deadline: Option<Duration>,
    closed: AtomicBool,
}

/// Bridge exposing a remote agent's skills as local tools
#[derive(Debug, Clone)]
pub struct ReverseBridge {
    identity: AgentIdentity,
    shared: Arc<ReverseShared>,
}

impl ReverseBridge {
    /// Create a bridge over a known agent identity
    ///
    /// Fails with a configuration error if the identity declares no skills
    /// or contains duplicate skill ids.
    pub fn new(identity: AgentIdentity, client: AgentClient) -> BridgeResult<Self> {
        if identity.skills.is_empty() {
            return Err(BridgeError::configuration(format!(
                "agent '{}' declares no skills",
                identity.id
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for skill in &identity.skills {
            if !seen.insert(skill.id.as_str()) {
                return Err(BridgeError::configuration(format!(
                    "agent '{}' declares duplicate skill id '{}'",
                    identity.id, skill.id
                )));
            }
        }

        Ok(Self {
            identity,
            shared: Arc::new(ReverseShared {
                client,
                policy: PollPolicy::default(),
                call_deadline: None,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Discover the agent at the client's base URL and bridge it
    pub async fn discover(client: AgentClient) -> BridgeResult<Self> {
        let identity = client.fetch_identity().await?;
        info!(agent_id = %identity.id, skills = identity.skills.len(), "discovered agent");
        Self::new(identity, client)
    }

    /// Replace the polling policy
    ///
    /// Call before [`tools`](Self::tools); tools already handed out keep the
    /// state they were built with.
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.shared = Arc::new(ReverseShared {
            client: self.shared.client.clone(),
            policy,
            call_deadline: self.shared.call_deadline,
            closed: AtomicBool::new(self.shared.closed.load(Ordering::SeqCst)),
        });
        self
    }

    /// Set a per-invocation deadline tighter than the policy's own
    ///
    /// The deadline covers the whole invocation, from task submission through
    /// the final poll.
    ///
    /// Call before [`tools`](Self::tools); tools already handed out keep the
    /// state they were built with.
    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.shared = Arc::new(ReverseShared {
            client: self.shared.client.clone(),
            policy: self.shared.policy.clone(),
            call_deadline: Some(deadline),
            closed: AtomicBool::new(self.shared.closed.load(Ordering::SeqCst)),
        });
        self
    }

    /// The identity snapshot this bridge was built from
    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Build one proxy tool per declared skill
    ///
    /// Tools appear in the identity's declaration order. Each proxy submits a
    /// task for its skill, drives it to a terminal state, and maps the
    /// outcome back into tool output or a bridge error.
    pub fn tools(&self) -> Vec<Tool> {
        self.identity
            .skills
            .iter()
            .map(|skill| {
                let proxy = SkillProxy {
                    skill_id: skill.id.clone(),
                    shared: Arc::clone(&self.shared),
                };
                Tool::new(
                    &skill.id,
                    skill.description.as_deref().unwrap_or(&skill.name),
                    schema::to_local_schema(skill.parameters.as_ref()),
                    proxy,
                )
            })
            .collect()
    }

    /// Close the bridge
    ///
    /// Idempotent. After the first call every proxy tool fails with a
    /// closed-resource error; in-flight invocations observe closure at their
    /// next suspension point.
    pub fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            info!(agent_id = %self.identity.id, "reverse bridge closed");
        }
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

/// Handler forwarding one skill's invocations to the remote agent
struct SkillProxy {
    skill_id: String,
    shared: Arc<ReverseShared>,
}

#[async_trait::async_trait]
impl ToolHandler for SkillProxy {
    async fn invoke(&self, args: ToolArgs) -> BridgeResult<Vec<ContentBlock>> {
        let shared = &self.shared;

        if shared.closed.load(Ordering::SeqCst) {
            return Err(BridgeError::ClosedResource);
        }

        // The deadline bounds the whole invocation, submission included. An
        // agent that executes inline can stall in the submit request, so
        // driving the poll loop alone is not enough.
        let deadline = shared
            .call_deadline
            .map_or(shared.policy.deadline, |d| d.min(shared.policy.deadline));
        let start = Instant::now();
        let submitted: Mutex<Option<String>> = Mutex::new(None);

        let outcome = tokio::time::timeout(deadline, async {
            let task = shared
                .client
                .submit_task(&self.skill_id, Value::Object(args))
                .await?;
            debug!(skill_id = %self.skill_id, task_id = %task.id, "proxy submitted task");
            if let Ok(mut slot) = submitted.lock() {
                *slot = Some(task.id.clone());
            }

            if task.is_terminal() {
                Ok(task)
            } else {
                let remaining = deadline.saturating_sub(start.elapsed());
                drive_to_terminal(
                    &shared.client,
                    task,
                    &shared.policy,
                    Some(remaining),
                    &shared.closed,
                )
                .await
            }
        })
        .await;

        match outcome {
            Ok(terminal) => map_outcome(terminal?),
            Err(_) => {
                if let Some(task_id) = submitted.lock().ok().and_then(|slot| slot.clone()) {
                    cancel_best_effort(&shared.client, &task_id);
                }
                Err(BridgeError::Timeout {
                    timeout_ms: deadline.as_millis() as u64,
                })
            }
        }
    }
}

/// Map a terminal task into tool output or a bridge error
fn map_outcome(task: Task) -> BridgeResult<Vec<ContentBlock>> {
    match task.status {
        TaskStatus::Completed => {
            let output = task.output.ok_or_else(|| {
                BridgeError::protocol_mismatch(format!(
                    "completed task {} carries no output",
                    task.id
                ))
            })?;
            if output.is_empty() {
                return Err(BridgeError::protocol_mismatch(format!(
                    "completed task {} carries empty output",
                    task.id
                )));
            }
            Ok(output)
        }
        TaskStatus::Failed => {
            let error = task.error.unwrap_or_else(|| {
                crate::error::TaskError::new("RemoteTaskError", "task failed without detail")
            });
            Err(error.into())
        }
        other => Err(BridgeError::protocol_mismatch(format!(
            "task {} ended in unexpected terminal status '{other}'",
            task.id
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use crate::types::Skill;
    use serde_json::json;

    fn two_skill_identity() -> AgentIdentity {
        AgentIdentity::new("multi", "Multi Agent")
            .with_skill(Skill::new("summarize", "Summarize").with_parameters(json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            })))
            .with_skill(Skill::new("translate", "Translate"))
    }

    fn client() -> AgentClient {
        AgentClient::new("http://agent.example.com").unwrap()
    }

    #[test]
    fn test_rejects_skill_less_identity() {
        let identity = AgentIdentity::new("empty", "Empty Agent");
        let err = ReverseBridge::new(identity, client()).unwrap_err();
        assert_eq!(err.code(), "ConfigurationError");
    }

    #[test]
    fn test_rejects_duplicate_skill_ids() {
        let identity = AgentIdentity::new("dup", "Dup Agent")
            .with_skill(Skill::new("echo", "Echo"))
            .with_skill(Skill::new("echo", "Echo Again"));
        let err = ReverseBridge::new(identity, client()).unwrap_err();
        assert_eq!(err.code(), "ConfigurationError");
    }

    #[test]
    fn test_tools_mirror_skills_in_order() {
        let bridge = ReverseBridge::new(two_skill_identity(), client()).unwrap();
        let tools = bridge.tools();

        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "summarize");
        assert_eq!(tools[1].name, "translate");
        assert!(tools.iter().all(Tool::has_handler));

        // Declared parameters translate into the local schema dialect.
        assert_eq!(tools[0].input_schema["properties"]["text"]["type"], "string");
        // An absent parameter declaration yields the free-form fallback.
        assert_eq!(
            tools[1].input_schema["properties"]["input"]["type"],
            "string"
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let bridge = ReverseBridge::new(two_skill_identity(), client()).unwrap();
        assert!(!bridge.is_closed());
        bridge.close();
        bridge.close();
        assert!(bridge.is_closed());
    }

    #[tokio::test]
    async fn test_invoke_after_close_fails_without_network() {
        // The URL is unreachable; a closed bridge must fail before dialing.
        let bridge = ReverseBridge::new(two_skill_identity(), client()).unwrap();
        let tools = bridge.tools();
        bridge.close();

        let err = tools[0].invoke(ToolArgs::new()).await.unwrap_err();
        assert_eq!(err.code(), "ClosedResourceError");
    }

    #[test]
    fn test_map_outcome_completed() {
        let mut task = Task::new("echo", json!({}));
        task.complete(vec![ContentBlock::text("hi")]);
        let blocks = map_outcome(task).unwrap();
        assert_eq!(blocks, vec![ContentBlock::text("hi")]);
    }

    #[test]
    fn test_map_outcome_completed_without_output_is_violation() {
        let mut task = Task::new("echo", json!({}));
        task.set_status(TaskStatus::Completed);
        let err = map_outcome(task).unwrap_err();
        assert_eq!(err.code(), "ProtocolMismatchError");
    }

    #[test]
    fn test_map_outcome_failed_surfaces_remote_error() {
        let mut task = Task::new("echo", json!({}));
        task.fail(TaskError::new("HandlerExecutionError", "remote fault"));
        let err = map_outcome(task).unwrap_err();
        assert_eq!(err.code(), "RemoteTaskError");
        assert!(err.to_string().contains("HandlerExecutionError"));
        assert!(err.to_string().contains("remote fault"));
    }

    #[test]
    fn test_map_outcome_cancelled_is_violation() {
        let mut task = Task::new("echo", json!({}));
        task.set_status(TaskStatus::Cancelled);
        let err = map_outcome(task).unwrap_err();
        assert_eq!(err.code(), "ProtocolMismatchError");
    }
}
