//! Handoffs: model-invocable transfers of control to another agent.
//!
//! A handoff is presented to the model as a function tool. Invoking it runs
//! the optional user callback and yields the target agent.

pub mod resolver;

pub use resolver::{get_handoffs, validate_tool_names};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::agent::Agent;
use crate::context::RunContext;
use crate::error::RociError;
use crate::tools::validation::validate_arguments;
use crate::tools::AgentToolParameters;
use crate::types::{InputItem, RunItem};

type CallbackFuture = Pin<Box<dyn Future<Output = Result<(), RociError>> + Send>>;
type WithoutInputFn = dyn Fn(RunContext) -> CallbackFuture + Send + Sync;
type WithInputFn = dyn Fn(RunContext, serde_json::Value) -> CallbackFuture + Send + Sync;
type InputFilterFn = dyn Fn(HandoffInputData) -> HandoffInputData + Send + Sync;

#[derive(Clone)]
enum OnHandoff {
    Nothing,
    WithoutInput(Arc<WithoutInputFn>),
    WithInput(Arc<WithInputFn>),
}

/// History handed to the next agent; an input filter may rewrite it.
#[derive(Debug, Clone, PartialEq)]
pub struct HandoffInputData {
    /// Caller input the run started with.
    pub input_history: Vec<InputItem>,
    /// Items generated before the turn that requested the handoff.
    pub pre_handoff_items: Vec<RunItem>,
    /// Items of the current turn, including the handoff call and its output.
    pub new_items: Vec<RunItem>,
}

/// A handoff to a target agent.
#[derive(Clone)]
pub struct Handoff {
    /// Name of the function tool the model calls.
    pub tool_name: String,
    pub tool_description: String,
    /// Target agent name.
    pub agent_name: String,
    pub input_json_schema: Option<serde_json::Value>,
    pub strict_json_schema: bool,
    target: Arc<Agent>,
    on_handoff: OnHandoff,
    input_filter: Option<Arc<InputFilterFn>>,
}

impl Handoff {
    /// Handoff to `agent` with default tool name and description.
    pub fn new(agent: Arc<Agent>) -> Self {
        Self {
            tool_name: default_handoff_tool_name(&agent),
            tool_description: default_handoff_tool_description(&agent),
            agent_name: agent.name().to_string(),
            input_json_schema: None,
            strict_json_schema: true,
            target: agent,
            on_handoff: OnHandoff::Nothing,
            input_filter: None,
        }
    }

    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    pub fn with_tool_description(mut self, description: impl Into<String>) -> Self {
        self.tool_description = description.into();
        self
    }

    pub fn with_strict_json_schema(mut self, strict: bool) -> Self {
        self.strict_json_schema = strict;
        self
    }

    /// Run `f` on handoff. Any model-supplied arguments are ignored.
    pub fn with_on_handoff<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RociError>> + Send + 'static,
    {
        self.input_json_schema = None;
        self.on_handoff = OnHandoff::WithoutInput(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    /// Require model input matching `schema`, decoded as `T` and passed to `f`.
    pub fn with_input<T, F, Fut>(mut self, schema: serde_json::Value, f: F) -> Self
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(RunContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RociError>> + Send + 'static,
    {
        let callback = move |ctx: RunContext, value: serde_json::Value| -> CallbackFuture {
            match serde_json::from_value::<T>(value) {
                Ok(input) => Box::pin(f(ctx, input)),
                Err(e) => Box::pin(async move {
                    Err(RociError::UserError(format!(
                        "handoff input does not match the expected type: {e}"
                    )))
                }),
            }
        };
        self.input_json_schema = Some(schema);
        self.on_handoff = OnHandoff::WithInput(Arc::new(callback));
        self
    }

    /// Rewrite the history the target agent will see.
    pub fn with_input_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(HandoffInputData) -> HandoffInputData + Send + Sync + 'static,
    {
        self.input_filter = Some(Arc::new(f));
        self
    }

    /// The agent this handoff transfers to.
    pub fn target(&self) -> &Arc<Agent> {
        &self.target
    }

    /// Parameter schema shown to the model.
    pub fn parameters_schema(&self) -> serde_json::Value {
        self.input_json_schema
            .clone()
            .unwrap_or_else(|| AgentToolParameters::empty().schema)
    }

    /// Apply the input filter, if any.
    pub fn filter_input(&self, data: HandoffInputData) -> HandoffInputData {
        match &self.input_filter {
            Some(filter) => filter(data),
            None => data,
        }
    }

    pub fn has_input_filter(&self) -> bool {
        self.input_filter.is_some()
    }

    /// Invoke the handoff with the model's raw JSON arguments.
    ///
    /// With an input schema, blank, malformed, or non-conforming JSON is a
    /// [`RociError::UserError`]. Without one the payload is not looked at.
    /// Callback errors are returned as-is.
    pub async fn on_invoke_handoff(
        &self,
        ctx: &RunContext,
        raw_json: &str,
    ) -> Result<Arc<Agent>, RociError> {
        match &self.on_handoff {
            OnHandoff::Nothing => {}
            OnHandoff::WithoutInput(f) => f(ctx.clone()).await?,
            OnHandoff::WithInput(f) => {
                let value = self.parse_input(raw_json)?;
                f(ctx.clone(), value).await?;
            }
        }
        Ok(Arc::clone(&self.target))
    }

    fn parse_input(&self, raw_json: &str) -> Result<serde_json::Value, RociError> {
        if raw_json.trim().is_empty() {
            return Err(RociError::UserError(format!(
                "handoff '{}' expects JSON input but got none",
                self.tool_name
            )));
        }
        let value: serde_json::Value = serde_json::from_str(raw_json).map_err(|e| {
            RociError::UserError(format!(
                "invalid JSON input for handoff '{}': {e}",
                self.tool_name
            ))
        })?;
        if let Some(schema) = &self.input_json_schema {
            validate_arguments(&value, schema).map_err(|reason| {
                RociError::UserError(format!(
                    "input for handoff '{}' failed validation: {reason}",
                    self.tool_name
                ))
            })?;
        }
        Ok(value)
    }
}

impl fmt::Debug for Handoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handoff")
            .field("tool_name", &self.tool_name)
            .field("tool_description", &self.tool_description)
            .field("agent_name", &self.agent_name)
            .field("input_json_schema", &self.input_json_schema)
            .field("strict_json_schema", &self.strict_json_schema)
            .finish_non_exhaustive()
    }
}

/// `transfer_to_<name>`, with the name lowercased and every character
/// outside `[a-z0-9]` replaced by `_`.
pub fn default_handoff_tool_name(agent: &Agent) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD
        .get_or_init(|| Regex::new(r"[^a-z0-9]").expect("handoff name regex must compile"));
    let lowered = agent.name().to_lowercase();
    format!("transfer_to_{}", re.replace_all(&lowered, "_"))
}

/// Tool description used when a handoff has no override.
pub fn default_handoff_tool_description(agent: &Agent) -> String {
    let base = format!("Handoff to the {} agent to handle the request.", agent.name());
    match agent.handoff_description() {
        Some(extra) if !extra.trim().is_empty() => format!("{base} {extra}"),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_normalizes_agent_name() {
        let agent = Agent::new("Billing Agent-2");
        assert_eq!(default_handoff_tool_name(&agent), "transfer_to_billing_agent_2");
    }

    #[test]
    fn default_description_appends_handoff_description() {
        let plain = Agent::new("support");
        assert_eq!(
            default_handoff_tool_description(&plain),
            "Handoff to the support agent to handle the request."
        );
        let described = Agent::new("support").with_handoff_description("Handles support");
        assert_eq!(
            default_handoff_tool_description(&described),
            "Handoff to the support agent to handle the request. Handles support"
        );
    }

    #[test]
    fn parameters_default_to_empty_object_schema() {
        let handoff = Handoff::new(Arc::new(Agent::new("x")));
        assert_eq!(
            handoff.parameters_schema(),
            serde_json::json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {},
                "required": [],
            })
        );
    }
}
