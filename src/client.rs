//! Agent HTTP Client
//!
//! Outbound transport used by the reverse bridge and the task driver. The
//! client consumes the two endpoint shapes an agent exposes: identity
//! discovery and task submission/status/cancel.
//!
//! Connections are pooled by `reqwest` and reused across requests to the same
//! host; the client is cheap to clone and safe to share across tasks. It does
//! not retry on its own; the task driver owns the retry policy.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::{BridgeError, BridgeResult};
use crate::types::{AgentIdentity, CancelTaskRequest, SubmitTaskRequest, Task};

/// Default timeout for HTTP requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a single remote agent
#[derive(Clone)]
pub struct AgentClient {
    /// Base URL of the agent
    base_url: Url,
    /// Pooled HTTP client
    http: Client,
}

impl std::fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClient")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl AgentClient {
    /// Create a new client for the given agent URL
    pub fn new(base_url: impl AsRef<str>) -> BridgeResult<Self> {
        let base_url = Url::parse(base_url.as_ref())?;

        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(format!("toolbridge/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BridgeError::transport(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self { base_url, http })
    }

    /// Create a client with a caller-provided `reqwest` client
    ///
    /// Use this to forward credentials or other transport configuration; the
    /// bridge itself implements no authentication policy.
    pub fn with_http_client(base_url: impl AsRef<str>, http: Client) -> BridgeResult<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self { base_url, http })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL for an endpoint
    fn endpoint(&self, path: &str) -> BridgeResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| BridgeError::protocol_mismatch(format!("invalid endpoint path: {e}")))
    }

    /// Fetch the agent identity document from the well-known endpoint
    pub async fn fetch_identity(&self) -> BridgeResult<AgentIdentity> {
        let url = self.endpoint("/.well-known/agent.json")?;
        debug!(url = %url, "fetching agent identity");

        let response = self.http.get(url).send().await.map_err(|e| {
            BridgeError::transport(format!("failed to fetch agent identity: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }

        let identity: AgentIdentity = response.json().await.map_err(|e| {
            BridgeError::protocol_mismatch(format!("failed to parse agent identity: {e}"))
        })?;

        info!(
            agent_id = %identity.id,
            skills = identity.skills.len(),
            "fetched agent identity"
        );

        Ok(identity)
    }

    /// Submit a new task for a skill
    pub async fn submit_task(
        &self,
        skill_id: impl Into<String>,
        input: serde_json::Value,
    ) -> BridgeResult<Task> {
        let url = self.endpoint("/tasks/send")?;
        let request = SubmitTaskRequest {
            skill_id: skill_id.into(),
            input,
        };

        debug!(url = %url, skill_id = %request.skill_id, "submitting task");

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("failed to submit task: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }

        let task: Task = response.json().await.map_err(|e| {
            BridgeError::protocol_mismatch(format!("failed to parse task: {e}"))
        })?;

        debug!(task_id = %task.id, status = %task.status, "task submitted");

        Ok(task)
    }

    /// Get the current state of a task
    pub async fn get_task(&self, task_id: impl AsRef<str>) -> BridgeResult<Task> {
        let task_id = task_id.as_ref();
        let url = self.endpoint(&format!("/tasks/{task_id}"))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("failed to fetch task: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }

        response.json().await.map_err(|e| {
            BridgeError::protocol_mismatch(format!("failed to parse task: {e}"))
        })
    }

    /// Cancel a task
    pub async fn cancel_task(
        &self,
        task_id: impl AsRef<str>,
        reason: Option<String>,
    ) -> BridgeResult<Task> {
        let task_id = task_id.as_ref();
        let url = self.endpoint(&format!("/tasks/{task_id}/cancel"))?;

        debug!(task_id = %task_id, "cancelling task");

        let response = self
            .http
            .post(url)
            .json(&CancelTaskRequest { reason })
            .send()
            .await
            .map_err(|e| BridgeError::transport(format!("failed to cancel task: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(handle_error_response(status, response).await);
        }

        response.json().await.map_err(|e| {
            BridgeError::protocol_mismatch(format!("failed to parse cancelled task: {e}"))
        })
    }
}

/// Map an HTTP error response to the bridge taxonomy
///
/// Server-side and rate-limit responses are transport-level (retryable by the
/// driver); client-side responses indicate a structural mismatch and are not.
async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> BridgeError {
    let body = response.text().await.unwrap_or_default();

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        BridgeError::transport(format!("HTTP {status}: {body}"))
    } else {
        BridgeError::protocol_mismatch(format!("HTTP {status}: {body}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = AgentClient::new("http://agent.example.com").unwrap();
        assert_eq!(client.base_url().as_str(), "http://agent.example.com/");
    }

    #[test]
    fn test_invalid_url() {
        let result = AgentClient::new("not a valid url");
        assert!(matches!(result, Err(BridgeError::Url(_))));
    }

    #[test]
    fn test_endpoint_building() {
        let client = AgentClient::new("http://agent.example.com").unwrap();

        let url = client.endpoint("/tasks/send").unwrap();
        assert_eq!(url.as_str(), "http://agent.example.com/tasks/send");

        let url = client.endpoint("/.well-known/agent.json").unwrap();
        assert_eq!(
            url.as_str(),
            "http://agent.example.com/.well-known/agent.json"
        );
    }
}
