//! Forward Bridge (Tool -> Agent)
//!
//! Wraps a single local tool as a network-served agent. The bridge
//! synthesizes a one-skill identity document mirroring the tool and handles
//! inbound task submissions: it validates the requested skill and input,
//! invokes the handler, and encodes the result as a task outcome.
//!
//! Local faults never escape as transport-level errors: a skill mismatch,
//! an input that fails schema validation, or a handler fault all become
//! well-formed failed tasks with a stable error code. Only store lookups
//! (unknown task id, cancelling a terminal task) produce HTTP error bodies.
//!
//! The router is built per bridge instance, so multiple forward bridges can
//! coexist in one process.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{BridgeError, BridgeResult, ErrorResponse};
use crate::schema;
use crate::types::{
    AgentIdentity, CancelTaskRequest, ContentBlock, Skill, SubmitTaskRequest, Task, TaskStatus,
    Tool,
};

/// Configuration for the task store
#[derive(Debug, Clone)]
pub struct TaskStoreConfig {
    /// TTL for stored tasks in seconds
    pub default_ttl_secs: u64,
    /// How often the cleanup task runs in seconds
    pub cleanup_interval_secs: u64,
}

impl Default for TaskStoreConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            cleanup_interval_secs: 300,
        }
    }
}

/// Task with expiration tracking
#[derive(Debug, Clone)]
struct StoredTask {
    task: Task,
    expires_at: DateTime<Utc>,
}

/// Outcome of an atomic cancellation attempt
#[derive(Debug)]
enum CancelOutcome {
    Cancelled(Task),
    AlreadyTerminal(TaskStatus),
    NotFound,
}

/// In-memory task store with expiration support
#[derive(Debug)]
struct TaskStore {
    tasks: RwLock<HashMap<String, StoredTask>>,
    config: TaskStoreConfig,
}

impl TaskStore {
    fn with_config(config: TaskStoreConfig) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            config,
        }
    }

    async fn get(&self, task_id: &str) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(task_id).and_then(|stored| {
            if stored.expires_at < Utc::now() {
                None
            } else {
                Some(stored.task.clone())
            }
        })
    }

    async fn update(&self, task: Task) {
        let expires_at =
            Utc::now() + chrono::Duration::seconds(self.config.default_ttl_secs as i64);
        let stored = StoredTask {
            task: task.clone(),
            expires_at,
        };
        self.tasks.write().await.insert(task.id.clone(), stored);
    }

    /// Store a finished task, unless a racing cancel already made the stored
    /// entry terminal; the check and the write happen under one lock
    async fn finish(&self, task: Task) -> Task {
        let mut tasks = self.tasks.write().await;
        if let Some(stored) = tasks.get(&task.id) {
            if stored.task.status == TaskStatus::Cancelled {
                return stored.task.clone();
            }
        }
        let expires_at =
            Utc::now() + chrono::Duration::seconds(self.config.default_ttl_secs as i64);
        tasks.insert(
            task.id.clone(),
            StoredTask {
                task: task.clone(),
                expires_at,
            },
        );
        task
    }

    /// Atomically cancel a task
    ///
    /// The terminal check and the status write happen under one lock, so a
    /// completion racing the cancel is never overwritten and no poller can
    /// observe a terminal status reverting.
    async fn cancel(&self, task_id: &str) -> CancelOutcome {
        let now = Utc::now();
        let mut tasks = self.tasks.write().await;
        let Some(stored) = tasks.get_mut(task_id) else {
            return CancelOutcome::NotFound;
        };
        if stored.expires_at < now {
            return CancelOutcome::NotFound;
        }
        if stored.task.is_terminal() {
            return CancelOutcome::AlreadyTerminal(stored.task.status);
        }
        stored.task.set_status(TaskStatus::Cancelled);
        stored.expires_at = now + chrono::Duration::seconds(self.config.default_ttl_secs as i64);
        CancelOutcome::Cancelled(stored.task.clone())
    }

    async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut tasks = self.tasks.write().await;

        let expired: Vec<String> = tasks
            .iter()
            .filter(|(_, stored)| stored.expires_at < now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            tasks.remove(id);
            debug!(task_id = %id, "cleaned up expired task");
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "cleaned up expired tasks");
        }

        expired.len()
    }

    async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }
}

/// Bridge exposing one local tool as a network-served agent
#[derive(Clone)]
pub struct ForwardBridge {
    tool: Arc<Tool>,
    store: Arc<TaskStore>,
    invocations: Arc<AtomicU64>,
}

impl std::fmt::Debug for ForwardBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardBridge")
            .field("tool", &self.tool.name)
            .finish()
    }
}

impl ForwardBridge {
    /// Wrap a tool as an agent
    ///
    /// Fails with a configuration error if the tool's name is empty or it
    /// has no handler.
    pub fn new(tool: Tool) -> BridgeResult<Self> {
        Self::with_config(tool, TaskStoreConfig::default())
    }

    /// Wrap a tool with a custom task store configuration
    pub fn with_config(tool: Tool, config: TaskStoreConfig) -> BridgeResult<Self> {
        if tool.name.is_empty() {
            return Err(BridgeError::configuration("tool name must not be empty"));
        }
        if !tool.has_handler() {
            return Err(BridgeError::configuration(format!(
                "tool '{}' has no handler",
                tool.name
            )));
        }

        Ok(Self {
            tool: Arc::new(tool),
            store: Arc::new(TaskStore::with_config(config)),
            invocations: Arc::new(AtomicU64::new(0)),
        })
    }

    /// The wrapped tool
    pub fn tool(&self) -> &Tool {
        &self.tool
    }

    /// Number of task submissions served so far
    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Synthesize the single-skill identity document mirroring the tool
    pub fn agent_identity(&self) -> AgentIdentity {
        AgentIdentity::new(&self.tool.name, &self.tool.name)
            .with_description(&self.tool.description)
            .with_skill(
                Skill::new(&self.tool.name, &self.tool.name)
                    .with_description(&self.tool.description)
                    .with_parameters(schema::to_remote_schema(&self.tool.input_schema)),
            )
    }

    /// Serve one inbound task submission
    ///
    /// Always returns a well-formed task: every local fault is encoded as a
    /// failed task carrying a stable error code, never propagated upward.
    pub async fn serve_request(&self, request: SubmitTaskRequest) -> Task {
        self.invocations.fetch_add(1, Ordering::Relaxed);

        let mut task = Task::new(&request.skill_id, request.input.clone());

        match self.execute(&mut task, request).await {
            Ok(blocks) => task.complete(blocks),
            Err(err) => {
                warn!(task_id = %task.id, code = err.code(), error = %err, "task failed");
                task.fail(err.into());
            }
        }

        // A cancel that raced the handler wins; the terminal stored state is
        // not overwritten.
        let task = self.store.finish(task).await;

        debug!(task_id = %task.id, status = %task.status, "task served");
        task
    }

    async fn execute(
        &self,
        task: &mut Task,
        request: SubmitTaskRequest,
    ) -> BridgeResult<Vec<ContentBlock>> {
        if request.skill_id != self.tool.name {
            return Err(BridgeError::protocol_mismatch(format!(
                "skill '{}' does not match wrapped tool '{}'",
                request.skill_id, self.tool.name
            )));
        }

        let args = request.input.as_object().cloned().ok_or_else(|| {
            BridgeError::schema_validation("task input must be an object of named parameters")
        })?;
        schema::validate_input(&self.tool.input_schema, &args)?;

        task.set_status(TaskStatus::Running);
        self.store.update(task.clone()).await;

        let blocks = self
            .tool
            .invoke(args)
            .await
            .map_err(|e| BridgeError::handler_execution(e.to_string()))?;

        if blocks.is_empty() {
            return Err(BridgeError::handler_execution(
                "handler returned no content",
            ));
        }

        Ok(blocks)
    }

    /// Build the axum router for this bridge
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/.well-known/agent.json", get(get_agent_identity))
            .route("/tasks/send", post(submit_task))
            .route("/tasks/{task_id}", get(get_task))
            .route("/tasks/{task_id}/cancel", post(cancel_task))
            .with_state(self.clone())
            .layer(cors)
    }

    /// Serve the bridge on the given address
    pub async fn serve(self, addr: &str) -> BridgeResult<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| BridgeError::transport(format!("failed to bind to {addr}: {e}")))?;

        info!(tool = %self.tool.name, address = %addr, "forward bridge starting");

        let router = self.router();
        axum::serve(listener, router)
            .await
            .map_err(|e| BridgeError::transport(format!("server error: {e}")))
    }

    /// Start a background task that periodically cleans up expired tasks
    pub fn start_cleanup_task(&self) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let interval_secs = store.config.cleanup_interval_secs;

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                store.cleanup_expired().await;
            }
        })
    }

    /// Manually trigger cleanup of expired tasks
    pub async fn cleanup_expired_tasks(&self) -> usize {
        self.store.cleanup_expired().await
    }

    /// Number of tasks currently stored
    pub async fn task_count(&self) -> usize {
        self.store.task_count().await
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// GET /.well-known/agent.json
async fn get_agent_identity(State(bridge): State<ForwardBridge>) -> Json<AgentIdentity> {
    Json(bridge.agent_identity())
}

/// POST /tasks/send
async fn submit_task(
    State(bridge): State<ForwardBridge>,
    Json(request): Json<SubmitTaskRequest>,
) -> Json<Task> {
    Json(bridge.serve_request(request).await)
}

/// GET /tasks/{task_id}
async fn get_task(
    State(bridge): State<ForwardBridge>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let task = bridge
        .store
        .get(&task_id)
        .await
        .ok_or_else(|| ApiError::not_found(&task_id))?;
    Ok(Json(task))
}

/// POST /tasks/{task_id}/cancel
async fn cancel_task(
    State(bridge): State<ForwardBridge>,
    Path(task_id): Path<String>,
    Json(request): Json<CancelTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    match bridge.store.cancel(&task_id).await {
        CancelOutcome::NotFound => Err(ApiError::not_found(&task_id)),
        CancelOutcome::AlreadyTerminal(status) => Err(ApiError(ErrorResponse::new(
            409,
            format!("task {task_id} is in terminal state: {status}"),
        ))),
        CancelOutcome::Cancelled(task) => {
            if let Some(reason) = &request.reason {
                info!(task_id = %task_id, reason = %reason, "task cancelled");
            } else {
                info!(task_id = %task_id, "task cancelled");
            }
            Ok(Json(task))
        }
    }
}

/// HTTP error wrapper for protocol-level failures
struct ApiError(ErrorResponse);

impl ApiError {
    fn not_found(task_id: &str) -> Self {
        Self(ErrorResponse::new(404, format!("task not found: {task_id}")))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = self.0.code, message = %self.0.message, "request failed");
        }
        (status, Json(self.0)).into_response()
    }
}
