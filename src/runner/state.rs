//! Run state and the classification of one model response.

use std::sync::Arc;

use crate::agent::Agent;
use crate::convert::ModelResponse;
use crate::error::RociError;
use crate::handoff::Handoff;
use crate::tools::Tool;
use crate::types::{InputItem, RunItem, Usage};

/// Mutable state of a run, owned by its control task.
#[derive(Debug, Clone)]
pub struct RunState {
    pub current_agent: Arc<Agent>,
    /// Caller input; replaced only by a handoff input filter.
    pub original_input: Vec<InputItem>,
    /// Items generated so far, in production order.
    pub generated_items: Vec<RunItem>,
    pub raw_responses: Vec<ModelResponse>,
    pub turn_count: usize,
    pub usage: Usage,
    /// Whether `on_agent_start` already fired for `current_agent`.
    pub agent_started: bool,
    pub final_output: Option<serde_json::Value>,
}

impl RunState {
    pub fn new(agent: Arc<Agent>, input: Vec<InputItem>) -> Self {
        Self {
            current_agent: agent,
            original_input: input,
            generated_items: Vec::new(),
            raw_responses: Vec::new(),
            turn_count: 0,
            usage: Usage::default(),
            agent_started: false,
            final_output: None,
        }
    }

    /// History sent on the next model call.
    pub fn history(&self) -> Vec<InputItem> {
        self.original_input
            .iter()
            .cloned()
            .chain(self.generated_items.iter().map(RunItem::to_input_item))
            .collect()
    }

    /// Record the final output. A second call is a bug in the engine.
    pub fn set_final_output(&mut self, output: serde_json::Value) -> Result<(), RociError> {
        if self.final_output.is_some() {
            return Err(RociError::InvalidState(
                "final output already set for this run".to_string(),
            ));
        }
        self.final_output = Some(output);
        Ok(())
    }
}

/// Position of the turn loop.
#[derive(Debug)]
pub enum TurnState {
    AwaitingModelResponse,
    ClassifyingOutput(ModelResponse),
    ExecutingTools(TurnPlan),
    ResolvingHandoff(TurnPlan),
    Done(serde_json::Value),
}

/// A function call routed to a local tool.
#[derive(Debug, Clone)]
pub struct FunctionRun {
    /// Index of the call in the response output.
    pub position: usize,
    pub call_id: String,
    pub arguments: String,
    pub tool: Tool,
}

/// A computer or local-shell call routed to a local executor.
#[derive(Debug, Clone)]
pub struct ActionRun {
    pub position: usize,
    pub call_id: String,
    pub action: serde_json::Value,
    pub tool: Tool,
}

#[derive(Debug, Clone)]
pub struct HandoffRun {
    pub call_id: String,
    pub arguments: String,
    pub handoff: Handoff,
}

/// What one model response asks the engine to do.
#[derive(Debug, Clone, Default)]
pub struct TurnPlan {
    /// Items of this turn, already appended to the run state.
    pub new_items: Vec<RunItem>,
    pub functions: Vec<FunctionRun>,
    pub computer_actions: Vec<ActionRun>,
    pub shell_actions: Vec<ActionRun>,
    pub handoffs: Vec<HandoffRun>,
    /// Text of the last message in the response, if any.
    pub final_text: Option<String>,
    /// Number of generated items that precede this turn.
    pub turn_start: usize,
}

impl TurnPlan {
    pub fn has_tool_work(&self) -> bool {
        !self.functions.is_empty()
            || !self.computer_actions.is_empty()
            || !self.shell_actions.is_empty()
    }

    pub fn has_handoffs(&self) -> bool {
        !self.handoffs.is_empty()
    }
}

/// Sort a response's items into run items and pending work.
///
/// A function call naming neither a tool nor a handoff is a user error, as
/// is a computer or shell call without the matching tool.
pub fn classify(
    agent: &Agent,
    handoffs: &[Handoff],
    output: Vec<InputItem>,
) -> Result<TurnPlan, RociError> {
    let agent_name = agent.name().to_string();
    let mut plan = TurnPlan::default();

    for (position, item) in output.into_iter().enumerate() {
        match &item {
            InputItem::Message { content, .. } => {
                plan.final_text = Some(content.to_text());
                plan.new_items.push(RunItem::MessageOutput {
                    agent: agent_name.clone(),
                    raw: item,
                });
            }
            InputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                if let Some(handoff) = handoffs.iter().find(|h| &h.tool_name == name) {
                    plan.handoffs.push(HandoffRun {
                        call_id: call_id.clone(),
                        arguments: arguments.clone(),
                        handoff: handoff.clone(),
                    });
                    plan.new_items.push(RunItem::HandoffCall {
                        agent: agent_name.clone(),
                        raw: item,
                    });
                    continue;
                }
                let tool = agent
                    .find_tool(name)
                    .filter(|t| t.as_function().is_some())
                    .ok_or_else(|| {
                        RociError::UserError(format!(
                            "Tool {name} not found in agent {agent_name}"
                        ))
                    })?;
                plan.functions.push(FunctionRun {
                    position,
                    call_id: call_id.clone(),
                    arguments: arguments.clone(),
                    tool: tool.clone(),
                });
                plan.new_items.push(RunItem::ToolCall {
                    agent: agent_name.clone(),
                    raw: item,
                });
            }
            InputItem::ComputerCall {
                call_id, action, ..
            } => {
                let tool = agent
                    .tools()
                    .iter()
                    .find(|t| matches!(t, Tool::Computer(_)))
                    .ok_or_else(|| {
                        RociError::UserError(format!(
                            "model requested a computer action but agent {agent_name} has no computer tool"
                        ))
                    })?;
                plan.computer_actions.push(ActionRun {
                    position,
                    call_id: call_id.clone(),
                    action: action.clone(),
                    tool: tool.clone(),
                });
                plan.new_items.push(RunItem::ToolCall {
                    agent: agent_name.clone(),
                    raw: item,
                });
            }
            InputItem::LocalShellCall {
                call_id, action, ..
            } => {
                let tool = agent
                    .tools()
                    .iter()
                    .find(|t| matches!(t, Tool::LocalShell(_)))
                    .ok_or_else(|| {
                        RociError::UserError(format!(
                            "model requested a local shell call but agent {agent_name} has no local shell tool"
                        ))
                    })?;
                plan.shell_actions.push(ActionRun {
                    position,
                    call_id: call_id.clone(),
                    action: action.clone(),
                    tool: tool.clone(),
                });
                plan.new_items.push(RunItem::ToolCall {
                    agent: agent_name.clone(),
                    raw: item,
                });
            }
            InputItem::HostedToolCall { .. } => plan.new_items.push(RunItem::ToolCall {
                agent: agent_name.clone(),
                raw: item,
            }),
            InputItem::Reasoning { .. } => plan.new_items.push(RunItem::Reasoning {
                agent: agent_name.clone(),
                raw: item,
            }),
            InputItem::FunctionCallOutput { .. }
            | InputItem::ComputerCallOutput { .. }
            | InputItem::LocalShellCallOutput { .. } => {
                return Err(RociError::ModelBehavior(
                    "model response contained a tool output item".to_string(),
                ));
            }
        }
    }
    Ok(plan)
}
