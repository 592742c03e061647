//! Concurrent execution of the tool calls of one turn.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use super::state::{ActionRun, FunctionRun, TurnPlan};
use crate::agent::{Agent, RunHooks};
use crate::context::RunContext;
use crate::error::RociError;
use crate::tools::{LocalShellCommandRequest, Tool, ToolContext};
use crate::types::{InputItem, RunItem};

type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<RunItem, RociError>> + Send + 'a>>;

/// Hooks fired around each tool invocation.
#[derive(Clone, Copy)]
pub(crate) struct ToolHooks<'a> {
    pub run: Option<&'a Arc<dyn RunHooks>>,
    pub agent: &'a Arc<Agent>,
}

impl ToolHooks<'_> {
    async fn start(&self, ctx: &RunContext, tool: &Tool) -> Result<(), RociError> {
        if let Some(hooks) = self.run {
            hooks.on_tool_start(ctx, self.agent, tool).await?;
        }
        if let Some(hooks) = self.agent.hooks() {
            hooks.on_tool_start(ctx, self.agent, tool).await?;
        }
        Ok(())
    }

    async fn end(
        &self,
        ctx: &RunContext,
        tool: &Tool,
        result: &serde_json::Value,
    ) -> Result<(), RociError> {
        if let Some(hooks) = self.run {
            hooks.on_tool_end(ctx, self.agent, tool, result).await?;
        }
        if let Some(hooks) = self.agent.hooks() {
            hooks.on_tool_end(ctx, self.agent, tool, result).await?;
        }
        Ok(())
    }
}

/// Run every tool call of `plan` concurrently and return their output items
/// in call order. The first failure, if any, is returned after all calls
/// have finished.
pub(crate) async fn execute_tools(
    plan: &TurnPlan,
    ctx: &RunContext,
    hooks: ToolHooks<'_>,
) -> Result<Vec<RunItem>, RociError> {
    let mut tasks: Vec<(usize, ToolFuture<'_>)> = Vec::new();
    for run in &plan.functions {
        tasks.push((run.position, Box::pin(run_function(run, ctx, hooks))));
    }
    for run in &plan.computer_actions {
        tasks.push((run.position, Box::pin(run_computer(run, ctx, hooks))));
    }
    for run in &plan.shell_actions {
        tasks.push((run.position, Box::pin(run_shell(run, ctx, hooks))));
    }
    tasks.sort_by_key(|(position, _)| *position);

    join_all(tasks.into_iter().map(|(_, task)| task))
        .await
        .into_iter()
        .collect()
}

async fn run_function(
    run: &FunctionRun,
    ctx: &RunContext,
    hooks: ToolHooks<'_>,
) -> Result<RunItem, RociError> {
    let Tool::Function(function) = &run.tool else {
        return Err(RociError::InvalidState(format!(
            "call {} is not routed to a function tool",
            run.call_id
        )));
    };
    debug!(tool = function.name(), call_id = %run.call_id, "invoking function tool");

    hooks.start(ctx, &run.tool).await?;
    let tool_ctx = ToolContext {
        run: ctx.clone(),
        tool_name: function.name().to_string(),
        tool_call_id: run.call_id.clone(),
    };
    let output = match function.invoke(tool_ctx, &run.arguments).await {
        Ok(value) => value,
        Err(err) => match function.failure_message(&err) {
            Some(message) => {
                debug!(tool = function.name(), error = %err, "tool failed, reporting to model");
                serde_json::Value::String(message)
            }
            None => return Err(err),
        },
    };
    hooks.end(ctx, &run.tool, &output).await?;

    Ok(RunItem::ToolCallOutput {
        agent: hooks.agent.name().to_string(),
        raw: InputItem::function_output(run.call_id.clone(), stringify_output(&output)),
        output,
    })
}

async fn run_computer(
    run: &ActionRun,
    ctx: &RunContext,
    hooks: ToolHooks<'_>,
) -> Result<RunItem, RociError> {
    let Tool::Computer(computer) = &run.tool else {
        return Err(RociError::InvalidState(format!(
            "call {} is not routed to a computer tool",
            run.call_id
        )));
    };
    debug!(tool = "computer", call_id = %run.call_id, "running computer action");

    hooks.start(ctx, &run.tool).await?;
    let item = computer.run_action(&run.call_id, &run.action).await?;
    let output = match &item {
        InputItem::ComputerCallOutput { image_url, .. } => {
            serde_json::Value::String(image_url.clone())
        }
        _ => serde_json::Value::Null,
    };
    hooks.end(ctx, &run.tool, &output).await?;

    Ok(RunItem::ToolCallOutput {
        agent: hooks.agent.name().to_string(),
        output,
        raw: item,
    })
}

async fn run_shell(
    run: &ActionRun,
    ctx: &RunContext,
    hooks: ToolHooks<'_>,
) -> Result<RunItem, RociError> {
    let Tool::LocalShell(shell) = &run.tool else {
        return Err(RociError::InvalidState(format!(
            "call {} is not routed to a local shell tool",
            run.call_id
        )));
    };
    debug!(tool = "local_shell", call_id = %run.call_id, "running local shell command");

    let request = LocalShellCommandRequest::from_action(&run.call_id, &run.action)?;
    hooks.start(ctx, &run.tool).await?;
    let stdout = shell.execute(request).await?;
    let output = serde_json::Value::String(stdout.clone());
    hooks.end(ctx, &run.tool, &output).await?;

    Ok(RunItem::ToolCallOutput {
        agent: hooks.agent.name().to_string(),
        output,
        raw: InputItem::LocalShellCallOutput {
            call_id: run.call_id.clone(),
            output: stdout,
        },
    })
}

/// Strings are sent verbatim; anything else as compact JSON.
pub(crate) fn stringify_output(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringify_keeps_strings_raw() {
        assert_eq!(stringify_output(&serde_json::json!("hi")), "hi");
        assert_eq!(stringify_output(&serde_json::json!({"a": 1})), r#"{"a":1}"#);
    }
}
