//! Shared data model for the bridge.
//!
//! These types carry no behavior beyond construction and serialization:
//!
//! - [`tool`] - local tool definitions, handlers, and content blocks
//! - [`agent`] - agent identity and skill descriptions
//! - [`task`] - task lifecycle and endpoint request shapes

mod agent;
mod task;
mod tool;

pub use agent::{AgentIdentity, Skill};
pub use task::{CancelTaskRequest, SubmitTaskRequest, Task, TaskStatus};
pub use tool::{ContentBlock, Tool, ToolArgs, ToolHandler};
