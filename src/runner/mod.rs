//! The turn engine and its entry points.

mod engine;
pub mod result;
pub mod state;
mod tool_phase;

pub use result::RunResult;
pub use state::{RunState, TurnState};

use std::sync::{Arc, Mutex};

use bon::Builder;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::{Agent, RunHooks};
use crate::config::AgentsConfig;
use crate::context::RunContext;
use crate::error::RociError;
use crate::provider::ModelClient;
use crate::stream::{lock, EventEmitter, RunResultStreaming, StreamProgress};
use crate::types::{ModelSettings, RunInput};

use engine::Engine;

pub const DEFAULT_MAX_TURNS: usize = 10;
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// What to do when the model requests several handoffs in one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MultiHandoffPolicy {
    /// Follow the first; answer the others with a tool output saying they
    /// were ignored.
    #[default]
    FirstWins,
    /// Fail the run with a model-behavior error.
    Error,
}

/// Settings for a single run.
#[derive(Debug, Clone, Builder)]
pub struct RunConfig {
    #[builder(default = DEFAULT_MAX_TURNS)]
    pub max_turns: usize,
    /// Capacity of the event channel of a streamed run.
    #[builder(default = DEFAULT_STREAM_BUFFER)]
    pub stream_buffer: usize,
    /// Overrides every agent's model.
    #[builder(into)]
    pub model: Option<String>,
    /// Layered over each agent's settings.
    pub model_settings: Option<ModelSettings>,
    #[builder(default)]
    pub multi_handoff_policy: MultiHandoffPolicy,
    /// Passed through to callbacks as `RunContext::metadata`.
    #[builder(default)]
    pub metadata: serde_json::Value,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RunConfig {
    /// Seed turn limit, buffer size, and model from layered configuration.
    pub fn from_config(config: &AgentsConfig) -> Self {
        Self::builder()
            .max_turns(config.max_turns.unwrap_or(DEFAULT_MAX_TURNS))
            .stream_buffer(config.stream_buffer.unwrap_or(DEFAULT_STREAM_BUFFER))
            .maybe_model(config.default_model.clone())
            .build()
    }
}

/// Runs agents against a model client.
#[derive(Clone)]
pub struct Runner {
    client: Arc<dyn ModelClient>,
    config: RunConfig,
    hooks: Option<Arc<dyn RunHooks>>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("dialect", &self.client.dialect())
            .field("config", &self.config)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

impl Runner {
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            config: RunConfig::default(),
            hooks: None,
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn RunHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn engine(&self, agent: Arc<Agent>, input: RunInput, cancel: CancellationToken) -> Engine {
        let ctx = RunContext::new(self.config.metadata.clone(), cancel);
        Engine {
            client: Arc::clone(&self.client),
            config: self.config.clone(),
            hooks: self.hooks.clone(),
            state: RunState::new(agent, input.into_items()),
            ctx,
            emitter: None,
            progress: None,
        }
    }

    /// Run `agent` until it produces a final output.
    pub async fn run(
        &self,
        agent: Arc<Agent>,
        input: impl Into<RunInput>,
    ) -> Result<RunResult, RociError> {
        self.run_with_cancel(agent, input, CancellationToken::new())
            .await
    }

    /// Like [`Runner::run`], stopping with [`RociError::Canceled`] once
    /// `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        agent: Arc<Agent>,
        input: impl Into<RunInput>,
        cancel: CancellationToken,
    ) -> Result<RunResult, RociError> {
        let engine = self.engine(agent, input.into(), cancel);
        debug!(run_id = %engine.ctx.run_id, agent = engine.state.current_agent.name(), "run start");
        engine.run().await
    }

    /// Start a streamed run on its own task.
    ///
    /// Configuration errors found before the first model call still arrive
    /// through the event stream, as its only item.
    pub fn run_streamed(
        &self,
        agent: Arc<Agent>,
        input: impl Into<RunInput>,
    ) -> Result<RunResultStreaming, RociError> {
        if self.config.stream_buffer == 0 {
            return Err(RociError::Configuration(
                "stream_buffer must be at least 1".to_string(),
            ));
        }
        let input = input.into();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.config.stream_buffer);

        let mut engine = self.engine(Arc::clone(&agent), input, cancel.clone());
        let run_id = engine.ctx.run_id;
        let progress = Arc::new(Mutex::new(StreamProgress {
            current_agent: agent,
            input: engine.state.original_input.clone(),
            new_items: Vec::new(),
            result: None,
            complete: false,
        }));
        engine.emitter = Some(EventEmitter::new(run_id, tx.clone(), cancel.clone()));
        engine.progress = Some(Arc::clone(&progress));
        debug!(%run_id, "streamed run start");

        let task_progress = Arc::clone(&progress);
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = engine.run().await;
            let failed = {
                let mut progress = lock(&task_progress);
                progress.complete = true;
                match outcome {
                    Ok(result) => {
                        progress.result = Some(result);
                        None
                    }
                    Err(err) => Some(err),
                }
            };
            if let Some(err) = failed {
                // A canceled run ends the stream without an error item.
                if !(matches!(err, RociError::Canceled) && task_cancel.is_cancelled()) {
                    EventEmitter::new(run_id, tx, task_cancel).fail(err).await;
                }
            }
        });

        Ok(RunResultStreaming::new(run_id, rx, progress, cancel, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.stream_buffer, 64);
        assert_eq!(config.multi_handoff_policy, MultiHandoffPolicy::FirstWins);
        assert!(config.model.is_none());
    }

    #[test]
    fn run_config_from_layered_config() {
        let config = RunConfig::from_config(
            &AgentsConfig::default()
                .with_max_turns(3)
                .with_default_model("gpt-4.1"),
        );
        assert_eq!(config.max_turns, 3);
        assert_eq!(config.stream_buffer, DEFAULT_STREAM_BUFFER);
        assert_eq!(config.model.as_deref(), Some("gpt-4.1"));
    }
}
