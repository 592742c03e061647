//! Model settings and related enums.

use std::collections::BTreeMap;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Tunable generation parameters attached to an agent or a run.
///
/// Every field is optional; an unset field leaves the decision to the model
/// provider. Run-level settings are layered over agent settings with
/// [`ModelSettings::resolve`].
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelSettings {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Raw tool-choice string (`auto`, `required`, `none`, a hosted tool
    /// name, or a function name).
    #[builder(into)]
    pub tool_choice: Option<String>,
    pub parallel_tool_calls: Option<bool>,
    pub truncation: Option<Truncation>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub store: Option<bool>,
    /// Ask for usage on streamed chat completions.
    pub include_usage: Option<bool>,
    pub metadata: Option<BTreeMap<String, String>>,
}

impl ModelSettings {
    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn resolve(&self, overrides: Option<&ModelSettings>) -> ModelSettings {
        let Some(o) = overrides else {
            return self.clone();
        };
        ModelSettings {
            temperature: o.temperature.or(self.temperature),
            top_p: o.top_p.or(self.top_p),
            max_tokens: o.max_tokens.or(self.max_tokens),
            tool_choice: o.tool_choice.clone().or_else(|| self.tool_choice.clone()),
            parallel_tool_calls: o.parallel_tool_calls.or(self.parallel_tool_calls),
            truncation: o.truncation.or(self.truncation),
            reasoning_effort: o.reasoning_effort.or(self.reasoning_effort),
            store: o.store.or(self.store),
            include_usage: o.include_usage.or(self.include_usage),
            metadata: o.metadata.clone().or_else(|| self.metadata.clone()),
        }
    }
}

/// Truncation strategy for Responses requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Truncation {
    Auto,
    Disabled,
}

/// Reasoning effort level for reasoning models.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}
