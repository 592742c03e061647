//! Agents: named bundles of instructions, model settings, tools, and handoffs.

pub mod hooks;

pub use hooks::{AgentHooks, RunHooks};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::RunContext;
use crate::error::RociError;
use crate::handoff::Handoff;
use crate::output_schema::OutputSchema;
use crate::tools::Tool;
use crate::types::ModelSettings;

type InstructionsFn = dyn Fn(RunContext, Arc<Agent>) -> Pin<Box<dyn Future<Output = Result<String, RociError>> + Send>>
    + Send
    + Sync;

/// System prompt for an agent.
#[derive(Clone)]
pub enum Instructions {
    Static(String),
    /// Generated right before each model call.
    Dynamic(Arc<InstructionsFn>),
}

impl Instructions {
    pub fn dynamic<F, Fut>(f: F) -> Self
    where
        F: Fn(RunContext, Arc<Agent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, RociError>> + Send + 'static,
    {
        Self::Dynamic(Arc::new(move |ctx, agent| Box::pin(f(ctx, agent))))
    }
}

impl From<&str> for Instructions {
    fn from(value: &str) -> Self {
        Self::Static(value.to_string())
    }
}

impl From<String> for Instructions {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

impl fmt::Debug for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// An agent definition.
///
/// Agents are built once and shared as `Arc<Agent>`; the runner only reads
/// them. Handoff targets compare by `Arc::ptr_eq`.
#[derive(Clone)]
pub struct Agent {
    name: String,
    instructions: Option<Instructions>,
    handoff_description: Option<String>,
    model: Option<String>,
    model_settings: ModelSettings,
    tools: Vec<Tool>,
    agent_handoffs: Vec<Arc<Agent>>,
    handoffs: Vec<Handoff>,
    output_schema: Option<Arc<dyn OutputSchema>>,
    hooks: Option<Arc<dyn AgentHooks>>,
}

impl Agent {
    /// Create a new agent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: None,
            handoff_description: None,
            model: None,
            model_settings: ModelSettings::default(),
            tools: Vec::new(),
            agent_handoffs: Vec::new(),
            handoffs: Vec::new(),
            output_schema: None,
            hooks: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<Instructions>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Description appended to the default handoff tool description.
    pub fn with_handoff_description(mut self, description: impl Into<String>) -> Self {
        self.handoff_description = Some(description.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Add a tool.
    pub fn with_tool(mut self, tool: impl Into<Tool>) -> Self {
        self.tools.push(tool.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Add an implicit handoff target (rendered with default name/description).
    pub fn with_agent_handoff(mut self, agent: Arc<Agent>) -> Self {
        self.agent_handoffs.push(agent);
        self
    }

    pub fn with_agent_handoffs(mut self, agents: impl IntoIterator<Item = Arc<Agent>>) -> Self {
        self.agent_handoffs.extend(agents);
        self
    }

    /// Add an explicit handoff.
    pub fn with_handoff(mut self, handoff: Handoff) -> Self {
        self.handoffs.push(handoff);
        self
    }

    pub fn with_output_schema(mut self, schema: Arc<dyn OutputSchema>) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn AgentHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> Option<&Instructions> {
        self.instructions.as_ref()
    }

    pub fn handoff_description(&self) -> Option<&str> {
        self.handoff_description.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn model_settings(&self) -> &ModelSettings {
        &self.model_settings
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn agent_handoffs(&self) -> &[Arc<Agent>] {
        &self.agent_handoffs
    }

    pub fn handoffs(&self) -> &[Handoff] {
        &self.handoffs
    }

    pub fn output_schema(&self) -> Option<&Arc<dyn OutputSchema>> {
        self.output_schema.as_ref()
    }

    pub fn hooks(&self) -> Option<&Arc<dyn AgentHooks>> {
        self.hooks.as_ref()
    }

    /// Look up a tool by the name the model uses.
    pub fn find_tool(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    /// Resolve the system prompt for the next model call.
    pub async fn resolve_instructions(
        self: &Arc<Self>,
        ctx: &RunContext,
    ) -> Result<Option<String>, RociError> {
        match &self.instructions {
            None => Ok(None),
            Some(Instructions::Static(text)) => Ok(Some(text.clone())),
            Some(Instructions::Dynamic(f)) => f(ctx.clone(), Arc::clone(self)).await.map(Some),
        }
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("tools", &self.tools.iter().map(Tool::name).collect::<Vec<_>>())
            .field(
                "agent_handoffs",
                &self
                    .agent_handoffs
                    .iter()
                    .map(|a| a.name())
                    .collect::<Vec<_>>(),
            )
            .field("handoffs", &self.handoffs.len())
            .field("output_schema", &self.output_schema)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_and_dynamic_instructions_resolve() {
        let fixed = Arc::new(Agent::new("fixed").with_instructions("Be brief."));
        let ctx = RunContext::default();
        assert_eq!(
            fixed.resolve_instructions(&ctx).await.unwrap().as_deref(),
            Some("Be brief.")
        );

        let dynamic = Arc::new(Agent::new("dyn").with_instructions(Instructions::dynamic(
            |ctx: RunContext, agent: Arc<Agent>| async move {
                Ok(format!("{} on turn {}", agent.name(), ctx.turn))
            },
        )));
        assert_eq!(
            dynamic.resolve_instructions(&ctx).await.unwrap().as_deref(),
            Some("dyn on turn 0")
        );
    }

    #[test]
    fn find_tool_matches_by_model_facing_name() {
        let agent = Agent::new("a").with_tool(crate::tools::WebSearchTool::default());
        assert!(agent.find_tool("web_search_preview").is_some());
        assert!(agent.find_tool("missing").is_none());
    }
}
