//! Lifecycle callbacks.
//!
//! Every method defaults to a no-op. An `Err` from any hook aborts the run
//! and is returned to the caller unchanged.

use async_trait::async_trait;

use super::Agent;
use crate::context::RunContext;
use crate::error::RociError;
use crate::tools::Tool;

/// Callbacks observing every agent in a run.
#[async_trait]
pub trait RunHooks: Send + Sync {
    /// Before the first model call of `agent` (once per agent change).
    async fn on_agent_start(&self, _ctx: &RunContext, _agent: &Agent) -> Result<(), RociError> {
        Ok(())
    }

    /// When `agent` produced the final output.
    async fn on_agent_end(
        &self,
        _ctx: &RunContext,
        _agent: &Agent,
        _output: &serde_json::Value,
    ) -> Result<(), RociError> {
        Ok(())
    }

    /// After control moved from `from` to `to`.
    async fn on_handoff(
        &self,
        _ctx: &RunContext,
        _from: &Agent,
        _to: &Agent,
    ) -> Result<(), RociError> {
        Ok(())
    }

    async fn on_tool_start(
        &self,
        _ctx: &RunContext,
        _agent: &Agent,
        _tool: &Tool,
    ) -> Result<(), RociError> {
        Ok(())
    }

    async fn on_tool_end(
        &self,
        _ctx: &RunContext,
        _agent: &Agent,
        _tool: &Tool,
        _result: &serde_json::Value,
    ) -> Result<(), RociError> {
        Ok(())
    }
}

/// Callbacks attached to one agent.
#[async_trait]
pub trait AgentHooks: Send + Sync {
    async fn on_start(&self, _ctx: &RunContext, _agent: &Agent) -> Result<(), RociError> {
        Ok(())
    }

    async fn on_end(
        &self,
        _ctx: &RunContext,
        _agent: &Agent,
        _output: &serde_json::Value,
    ) -> Result<(), RociError> {
        Ok(())
    }

    /// `agent` is the handoff target; `source` handed control to it.
    async fn on_handoff(
        &self,
        _ctx: &RunContext,
        _agent: &Agent,
        _source: &Agent,
    ) -> Result<(), RociError> {
        Ok(())
    }

    async fn on_tool_start(
        &self,
        _ctx: &RunContext,
        _agent: &Agent,
        _tool: &Tool,
    ) -> Result<(), RociError> {
        Ok(())
    }

    async fn on_tool_end(
        &self,
        _ctx: &RunContext,
        _agent: &Agent,
        _tool: &Tool,
        _result: &serde_json::Value,
    ) -> Result<(), RociError> {
        Ok(())
    }
}
