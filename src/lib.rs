//! # toolbridge
//!
//! Bidirectional bridge between locally defined tools and remotely served
//! agents.
//!
//! A *tool* is a named, schema-typed capability with an async handler. An
//! *agent* is a network peer that publishes an identity document listing its
//! *skills* and executes them through an asynchronous task lifecycle. The
//! bridge translates between the two in either direction:
//!
//! - **Forward** ([`ForwardBridge`]): serve a local tool as an agent. The
//!   bridge publishes a single-skill identity mirroring the tool and turns
//!   inbound task submissions into handler invocations.
//! - **Reverse** ([`ReverseBridge`]): consume a remote agent as local tools.
//!   Each skill becomes a proxy tool that submits a task, polls it to a
//!   terminal state, and maps the outcome back into tool output.
//!
//! Schemas cross the boundary through a small common dialect: supported
//! constructs pass through, anything else degrades to a free-form string
//! parameter rather than being rejected (see [`schema`]).
//!
//! ## Serving a tool as an agent
//!
//! ```no_run
//! use serde_json::json;
//! use toolbridge::{ContentBlock, ForwardBridge, Tool, ToolArgs};
//!
//! # async fn run() -> toolbridge::BridgeResult<()> {
//! let tool = Tool::new(
//!     "calculator",
//!     "Evaluates arithmetic expressions",
//!     json!({
//!         "type": "object",
//!         "properties": {"input": {"type": "string"}},
//!         "required": ["input"]
//!     }),
//!     |args: ToolArgs| async move {
//!         let expr = args["input"].as_str().unwrap_or_default();
//!         Ok(vec![ContentBlock::text(format!("Tool response: {expr}"))])
//!     },
//! );
//!
//! let bridge = ForwardBridge::new(tool)?;
//! bridge.serve("127.0.0.1:8080").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Consuming an agent as local tools
//!
//! ```no_run
//! use toolbridge::{AgentClient, ReverseBridge, ToolArgs};
//!
//! # async fn run() -> toolbridge::BridgeResult<()> {
//! let client = AgentClient::new("http://localhost:8080")?;
//! let bridge = ReverseBridge::discover(client).await?;
//!
//! for tool in bridge.tools() {
//!     println!("proxy tool: {}", tool.name);
//! }
//!
//! bridge.close();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod driver;
pub mod error;
pub mod forward;
pub mod reverse;
pub mod schema;
pub mod types;

pub use client::AgentClient;
pub use driver::{PollPolicy, drive_to_terminal};
pub use error::{BridgeError, BridgeResult, ErrorResponse, TaskError};
pub use forward::{ForwardBridge, TaskStoreConfig};
pub use reverse::ReverseBridge;
pub use types::{
    AgentIdentity, CancelTaskRequest, ContentBlock, Skill, SubmitTaskRequest, Task, TaskStatus,
    Tool, ToolArgs, ToolHandler,
};
