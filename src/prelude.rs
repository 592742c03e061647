//! Convenience re-exports for common use.

pub use crate::agent::{Agent, AgentHooks, Instructions, RunHooks};
pub use crate::config::AgentsConfig;
pub use crate::context::{RunContext, RunId};
pub use crate::convert::Dialect;
pub use crate::error::{Result, RociError};
pub use crate::handoff::{Handoff, HandoffInputData};
pub use crate::output_schema::{JsonSchemaOutput, OutputSchema, PlainTextOutput};
pub use crate::provider::ModelClient;
#[cfg(feature = "openai")]
pub use crate::provider::OpenAiClient;
pub use crate::runner::{MultiHandoffPolicy, RunConfig, RunResult, Runner};
pub use crate::stream::{RunEvent, RunResultStreaming, StreamEvent};
pub use crate::tools::{AgentToolParameters, FunctionTool, Tool, ToolArguments, ToolContext};
pub use crate::types::{
    ContentPart, ImageDetail, InputItem, MessageContent, ModelSettings, Role, RunInput, RunItem,
    Usage,
};
