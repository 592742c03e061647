//! The turn loop.
//!
//! [`Engine::step`] is the transition function of [`TurnState`]; `run`
//! drives it until `Done` or an error. Streaming and non-streaming runs share
//! the loop and differ only in how the model is called and whether events
//! are emitted.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, warn};

use super::state::{classify, HandoffRun, RunState, TurnPlan, TurnState};
use super::tool_phase::{execute_tools, ToolHooks};
use super::{MultiHandoffPolicy, RunConfig, RunResult};
use crate::agent::RunHooks;
use crate::context::RunContext;
use crate::convert::{converter_for, ModelResponse, RequestParts, WireConverter};
use crate::error::RociError;
use crate::handoff::{get_handoffs, validate_tool_names, HandoffInputData};
use crate::provider::{ModelClient, ModelRequest};
use crate::stream::{lock, EventEmitter, RunItemEventName, SharedProgress, StreamEvent};
use crate::types::{InputItem, RunItem};

/// Text sent back for handoff calls that lost to an earlier one.
const IGNORED_HANDOFF_OUTPUT: &str = "Multiple handoffs detected, ignoring this one.";

pub(crate) struct Engine {
    pub client: Arc<dyn ModelClient>,
    pub config: RunConfig,
    pub hooks: Option<Arc<dyn RunHooks>>,
    pub ctx: RunContext,
    pub state: RunState,
    /// Present for streamed runs.
    pub emitter: Option<EventEmitter>,
    pub progress: Option<SharedProgress>,
}

impl Engine {
    fn converter(&self) -> &'static dyn WireConverter {
        converter_for(self.client.dialect())
    }

    /// Drive the loop to completion.
    pub async fn run(mut self) -> Result<RunResult, RociError> {
        if self.emitter.is_some() {
            let agent = self.state.current_agent.name().to_string();
            self.emit(StreamEvent::AgentUpdated { agent }).await?;
        }

        let mut turn = TurnState::AwaitingModelResponse;
        loop {
            if self.ctx.is_canceled() {
                return Err(RociError::Canceled);
            }
            turn = match turn {
                TurnState::Done(output) => return self.finish(output).await,
                other => self.step(other).await?,
            };
        }
    }

    /// One transition of the turn state machine.
    async fn step(&mut self, turn: TurnState) -> Result<TurnState, RociError> {
        match turn {
            TurnState::AwaitingModelResponse => {
                let response = self.call_model().await?;
                Ok(TurnState::ClassifyingOutput(response))
            }
            TurnState::ClassifyingOutput(response) => self.classify_output(response).await,
            TurnState::ExecutingTools(plan) => {
                let outputs = {
                    let hooks = ToolHooks {
                        run: self.hooks.as_ref(),
                        agent: &self.state.current_agent,
                    };
                    execute_tools(&plan, &self.ctx, hooks).await
                };
                // Calls that were in flight when the run was canceled have
                // finished; their results are dropped.
                if self.ctx.is_canceled() {
                    return Err(RociError::Canceled);
                }
                for item in outputs? {
                    self.push_item(item).await?;
                }
                if plan.has_handoffs() {
                    Ok(TurnState::ResolvingHandoff(plan))
                } else {
                    Ok(TurnState::AwaitingModelResponse)
                }
            }
            TurnState::ResolvingHandoff(plan) => {
                self.resolve_handoff(plan).await?;
                Ok(TurnState::AwaitingModelResponse)
            }
            TurnState::Done(output) => Ok(TurnState::Done(output)),
        }
    }

    async fn call_model(&mut self) -> Result<ModelResponse, RociError> {
        if self.state.turn_count >= self.config.max_turns {
            return Err(RociError::MaxTurnsExceeded {
                max_turns: self.config.max_turns,
            });
        }
        self.state.turn_count += 1;
        self.ctx.turn = self.state.turn_count;
        self.ctx.usage = self.state.usage.clone();

        let agent = Arc::clone(&self.state.current_agent);
        debug!(agent = agent.name(), turn = self.state.turn_count, "starting turn");

        let handoffs = get_handoffs(&agent)?;
        validate_tool_names(agent.name(), agent.tools(), &handoffs)?;
        let converter = self.converter();
        let tools = converter.convert_tools(agent.tools(), &handoffs)?;

        if !self.state.agent_started {
            self.state.agent_started = true;
            if let Some(hooks) = &self.hooks {
                hooks.on_agent_start(&self.ctx, &agent).await?;
            }
            if let Some(hooks) = agent.hooks() {
                hooks.on_start(&self.ctx, &agent).await?;
            }
        }

        let instructions = agent.resolve_instructions(&self.ctx).await?;
        let settings = agent
            .model_settings()
            .resolve(self.config.model_settings.as_ref());
        let tool_choice =
            converter.convert_tool_choice(settings.tool_choice.as_deref().unwrap_or(""));
        let response_format =
            converter.get_response_format(agent.output_schema().map(|s| s.as_ref()));
        let model = self
            .config
            .model
            .as_deref()
            .or(agent.model())
            .map(str::to_string);
        let history = self.state.history();

        let body = converter.build_request(&RequestParts {
            model: model.as_deref(),
            instructions: instructions.as_deref(),
            history: &history,
            tools: &tools,
            tool_choice: &tool_choice,
            response_format: &response_format,
            settings: &settings,
        })?;
        let request = ModelRequest {
            dialect: converter.dialect(),
            model,
            body,
            settings,
        };

        let cancel = self.ctx.cancel_token().clone();
        let response = if self.emitter.is_some() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(RociError::Canceled),
                response = self.stream_model(converter, &request) => response?,
            }
        } else {
            let body = tokio::select! {
                _ = cancel.cancelled() => return Err(RociError::Canceled),
                body = self.client.get_response(&request) => body?,
            };
            converter.parse_response(&body)?
        };

        self.state.usage.merge(&response.usage);
        self.ctx.usage = self.state.usage.clone();
        self.state.raw_responses.push(response.clone());
        Ok(response)
    }

    /// Forward raw events as they arrive and fold them into a response.
    async fn stream_model(
        &mut self,
        converter: &'static dyn WireConverter,
        request: &ModelRequest,
    ) -> Result<ModelResponse, RociError> {
        let mut events = self.client.stream_response(request).await?;
        let mut accumulator = converter.stream_accumulator();
        while let Some(event) = events.next().await {
            let event = event?;
            let delta = accumulator.push(&event)?;
            self.emit(StreamEvent::RawResponse { data: event, delta })
                .await?;
        }
        accumulator.finish()
    }

    async fn classify_output(&mut self, response: ModelResponse) -> Result<TurnState, RociError> {
        let agent = Arc::clone(&self.state.current_agent);
        let handoffs = get_handoffs(&agent)?;
        let mut plan = classify(&agent, &handoffs, response.output)?;
        plan.turn_start = self.state.generated_items.len();
        for item in &plan.new_items {
            self.push_item(item.clone()).await?;
        }

        if plan.has_tool_work() {
            return Ok(TurnState::ExecutingTools(plan));
        }
        if plan.has_handoffs() {
            return Ok(TurnState::ResolvingHandoff(plan));
        }

        match agent.output_schema() {
            Some(schema) if !schema.is_plain_text() => match plan.final_text {
                Some(text) => Ok(TurnState::Done(schema.validate_json(&text)?)),
                None => {
                    debug!(agent = agent.name(), "no structured output yet, running another turn");
                    Ok(TurnState::AwaitingModelResponse)
                }
            },
            _ => Ok(TurnState::Done(serde_json::Value::String(
                plan.final_text.unwrap_or_default(),
            ))),
        }
    }

    async fn resolve_handoff(&mut self, plan: TurnPlan) -> Result<(), RociError> {
        let mut calls = plan.handoffs.into_iter();
        let turn_start = plan.turn_start;
        let Some(winner) = calls.next() else {
            return Ok(());
        };
        let source = Arc::clone(&self.state.current_agent);

        let rejected: Vec<HandoffRun> = calls.collect();
        if !rejected.is_empty() {
            match self.config.multi_handoff_policy {
                MultiHandoffPolicy::FirstWins => {
                    warn!(
                        agent = source.name(),
                        accepted = %winner.handoff.tool_name,
                        ignored = rejected.len(),
                        "multiple handoffs requested, using the first"
                    );
                    for run in &rejected {
                        self.push_item(RunItem::ToolCallOutput {
                            agent: source.name().to_string(),
                            output: serde_json::Value::String(IGNORED_HANDOFF_OUTPUT.to_string()),
                            raw: InputItem::function_output(run.call_id.clone(), IGNORED_HANDOFF_OUTPUT),
                        })
                        .await?;
                    }
                }
                MultiHandoffPolicy::Error => {
                    return Err(RociError::ModelBehavior(format!(
                        "agent {} requested {} handoffs in one turn",
                        source.name(),
                        rejected.len() + 1
                    )));
                }
            }
        }

        let target = winner
            .handoff
            .on_invoke_handoff(&self.ctx, &winner.arguments)
            .await?;
        debug!(from = source.name(), to = target.name(), "handoff");

        let ack = serde_json::json!({ "assistant": target.name() }).to_string();
        self.push_item(RunItem::HandoffOutput {
            source_agent: source.name().to_string(),
            target_agent: target.name().to_string(),
            raw: InputItem::function_output(winner.call_id.clone(), ack),
        })
        .await?;

        if let Some(hooks) = &self.hooks {
            hooks.on_handoff(&self.ctx, &source, &target).await?;
        }
        if let Some(hooks) = target.hooks() {
            hooks.on_handoff(&self.ctx, &target, &source).await?;
        }

        if winner.handoff.has_input_filter() {
            self.apply_input_filter(&winner, turn_start);
        }

        self.state.current_agent = Arc::clone(&target);
        self.state.agent_started = false;
        if let Some(progress) = &self.progress {
            lock(progress).current_agent = Arc::clone(&target);
        }
        if self.emitter.is_some() {
            self.emit(StreamEvent::AgentUpdated {
                agent: target.name().to_string(),
            })
            .await?;
        }
        Ok(())
    }

    /// Let the handoff rewrite the history seen by the next agent.
    /// `turn_start` splits generated items into earlier turns and this one.
    fn apply_input_filter(&mut self, winner: &HandoffRun, turn_start: usize) {
        let mut generated = std::mem::take(&mut self.state.generated_items);
        let new_items = generated.split_off(turn_start.min(generated.len()));
        let filtered = winner.handoff.filter_input(HandoffInputData {
            input_history: std::mem::take(&mut self.state.original_input),
            pre_handoff_items: generated,
            new_items,
        });
        self.state.original_input = filtered.input_history;
        self.state.generated_items = filtered.pre_handoff_items;
        self.state.generated_items.extend(filtered.new_items);

        if let Some(progress) = &self.progress {
            let mut progress = lock(progress);
            progress.input = self.state.original_input.clone();
            progress.new_items = self.state.generated_items.clone();
        }
    }

    async fn finish(mut self, output: serde_json::Value) -> Result<RunResult, RociError> {
        self.state.set_final_output(output.clone())?;
        let agent = Arc::clone(&self.state.current_agent);
        if let Some(hooks) = &self.hooks {
            hooks.on_agent_end(&self.ctx, &agent, &output).await?;
        }
        if let Some(hooks) = agent.hooks() {
            hooks.on_end(&self.ctx, &agent, &output).await?;
        }
        debug!(
            agent = agent.name(),
            turns = self.state.turn_count,
            total_tokens = self.state.usage.total_tokens,
            "run complete"
        );

        Ok(RunResult {
            run_id: self.ctx.run_id,
            input: self.state.original_input,
            new_items: self.state.generated_items,
            raw_responses: self.state.raw_responses,
            final_output: output,
            last_agent: agent,
            usage: self.state.usage,
        })
    }

    /// Append an item to the run and announce it.
    async fn push_item(&mut self, item: RunItem) -> Result<(), RociError> {
        self.state.generated_items.push(item.clone());
        if let Some(progress) = &self.progress {
            lock(progress).new_items.push(item.clone());
        }
        if self.emitter.is_some() {
            self.emit(StreamEvent::RunItem {
                name: RunItemEventName::for_item(&item),
                item,
            })
            .await?;
        }
        Ok(())
    }

    async fn emit(&mut self, event: StreamEvent) -> Result<(), RociError> {
        match self.emitter.as_mut() {
            Some(emitter) => emitter.emit(event).await,
            None => Ok(()),
        }
    }
}
