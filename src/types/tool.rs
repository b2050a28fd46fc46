//! Local tool types: schema-typed invocable capabilities and their output.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};

/// Named parameters passed to a tool handler
pub type ToolArgs = serde_json::Map<String, Value>;

/// A tagged unit of tool output
///
/// The minimal kind is `text`. Unknown kinds deserialize into [`ContentBlock::Other`]
/// and are carried opaquely through the bridge without interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text content
    Text { text: String },

    /// Image content by reference
    Image { url: String, media_type: String },

    /// Any other kind, passed through unmodified
    #[serde(untagged)]
    Other(Value),
}

impl ContentBlock {
    /// Create a text block
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Create an image block
    pub fn image(url: impl Into<String>, media_type: impl Into<String>) -> Self {
        ContentBlock::Image {
            url: url.into(),
            media_type: media_type.into(),
        }
    }

    /// Get the text content if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Invocation handler for a tool
///
/// Handlers accept named parameters already validated against the tool's
/// input schema and produce an ordered, non-empty sequence of content blocks,
/// or fail. Plain async closures implement this trait.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Invoke the handler with named parameters
    async fn invoke(&self, args: ToolArgs) -> BridgeResult<Vec<ContentBlock>>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(ToolArgs) -> Fut + Send + Sync,
    Fut: Future<Output = BridgeResult<Vec<ContentBlock>>> + Send,
{
    async fn invoke(&self, args: ToolArgs) -> BridgeResult<Vec<ContentBlock>> {
        (self)(args).await
    }
}

/// A locally defined, schema-typed invocable capability
///
/// Immutable after construction. The handler is optional so that a tool can
/// exist as a pure definition; a bridge that needs to invoke the tool rejects
/// handler-less tools at construction time.
#[derive(Clone)]
pub struct Tool {
    /// Unique name within a bridge's tool set, never empty for a servable tool
    pub name: String,

    /// Human-readable description
    pub description: String,

    /// JSON-Schema-like description of accepted parameters
    pub input_schema: Value,

    handler: Option<Arc<dyn ToolHandler>>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

impl Tool {
    /// Create a tool with a handler
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Some(Arc::new(handler)),
        }
    }

    /// Create a tool definition without a handler
    pub fn definition(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: None,
        }
    }

    /// Check whether this tool can be invoked
    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Invoke the tool's handler with named parameters
    pub async fn invoke(&self, args: ToolArgs) -> BridgeResult<Vec<ContentBlock>> {
        let handler = self.handler.as_ref().ok_or_else(|| {
            BridgeError::configuration(format!("tool '{}' has no handler", self.name))
        })?;
        handler.invoke(args).await
    }
}
