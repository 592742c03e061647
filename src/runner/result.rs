//! Outcome of a completed run.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::agent::Agent;
use crate::context::RunId;
use crate::convert::ModelResponse;
use crate::error::RociError;
use crate::types::{InputItem, RunItem, Usage};

/// Result of [`Runner::run`](super::Runner::run).
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: RunId,
    /// Input the run started from (after any handoff input filter).
    pub input: Vec<InputItem>,
    pub new_items: Vec<RunItem>,
    pub raw_responses: Vec<ModelResponse>,
    pub final_output: serde_json::Value,
    pub last_agent: Arc<Agent>,
    pub usage: Usage,
}

impl RunResult {
    /// Deserialize the final output into `T`.
    pub fn final_output_as<T: DeserializeOwned>(&self) -> Result<T, RociError> {
        Ok(serde_json::from_value(self.final_output.clone())?)
    }

    /// Input plus generated items, ready to seed a follow-up run.
    pub fn to_input_list(&self) -> Vec<InputItem> {
        self.input
            .iter()
            .cloned()
            .chain(self.new_items.iter().map(RunItem::to_input_item))
            .collect()
    }

    /// Id of the last model response, if the provider returned one.
    pub fn last_response_id(&self) -> Option<&str> {
        self.raw_responses
            .last()
            .and_then(|r| r.response_id.as_deref())
    }
}
