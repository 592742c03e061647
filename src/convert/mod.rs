//! Wire converters.
//!
//! A [`WireConverter`] turns agent configuration and dialect-neutral history
//! into the request body of one API dialect, and that dialect's responses
//! (whole or streamed) back into [`InputItem`]s. The two implementations share
//! no state; what each dialect can express is recorded in [`supports`].

pub mod chat;
pub mod responses;

pub use chat::ChatCompletionsConverter;
pub use responses::ResponsesConverter;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::RociError;
use crate::handoff::Handoff;
use crate::output_schema::OutputSchema;
use crate::tools::{Tool, ToolKind};
use crate::types::{InputItem, ModelSettings, TextStreamDelta, Usage};

/// API dialect spoken by a model client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Dialect {
    #[default]
    Responses,
    ChatCompletions,
}

/// Whether `dialect` can render a tool of `kind`.
pub fn supports(dialect: Dialect, kind: ToolKind) -> bool {
    match dialect {
        Dialect::Responses => true,
        Dialect::ChatCompletions => matches!(kind, ToolKind::Function),
    }
}

/// The converter for `dialect`.
pub fn converter_for(dialect: Dialect) -> &'static dyn WireConverter {
    static RESPONSES: ResponsesConverter = ResponsesConverter;
    static CHAT: ChatCompletionsConverter = ChatCompletionsConverter;
    match dialect {
        Dialect::Responses => &RESPONSES,
        Dialect::ChatCompletions => &CHAT,
    }
}

/// `tool_choice` modes understood by both dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ToolChoiceMode {
    Auto,
    Required,
    None,
}

/// Hosted tool types that can be forced through `tool_choice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum HostedToolType {
    FileSearch,
    WebSearchPreview,
    #[strum(serialize = "web_search_preview_2025_03_11")]
    WebSearchPreview20250311,
    ComputerUsePreview,
    ImageGeneration,
    CodeInterpreter,
    Mcp,
}

/// Parsed `tool_choice` setting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Leave the choice to the model; nothing is sent.
    #[default]
    Unconstrained,
    Mode(ToolChoiceMode),
    Hosted(HostedToolType),
    /// Force a call to the named function.
    Function { name: String },
}

impl ToolChoice {
    /// Classify a raw `tool_choice` string.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Unconstrained;
        }
        if let Ok(mode) = raw.parse::<ToolChoiceMode>() {
            return Self::Mode(mode);
        }
        if let Ok(hosted) = raw.parse::<HostedToolType>() {
            return Self::Hosted(hosted);
        }
        Self::Function {
            name: raw.to_string(),
        }
    }
}

/// Structured-output constraint for a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    /// Free text; nothing is sent.
    #[default]
    Unconstrained,
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        strict: bool,
    },
}

impl ResponseFormat {
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, Self::Unconstrained)
    }
}

/// Extra response data requested from the Responses API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ResponseInclude {
    #[serde(rename = "file_search_call.results")]
    #[strum(serialize = "file_search_call.results")]
    FileSearchCallResults,
}

/// Tool descriptors rendered for one dialect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertedTools {
    /// One descriptor per tool, then one per handoff.
    pub tools: Vec<serde_json::Value>,
    /// Deduplicated in first-seen order.
    pub includes: Vec<ResponseInclude>,
}

impl ConvertedTools {
    pub(crate) fn push_include(&mut self, include: ResponseInclude) {
        if !self.includes.contains(&include) {
            self.includes.push(include);
        }
    }
}

/// Everything a converter needs to build one request body.
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub model: Option<&'a str>,
    pub instructions: Option<&'a str>,
    pub history: &'a [InputItem],
    pub tools: &'a ConvertedTools,
    pub tool_choice: &'a ToolChoice,
    pub response_format: &'a ResponseFormat,
    pub settings: &'a ModelSettings,
}

/// A model response decoded into history items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub output: Vec<InputItem>,
    pub usage: Usage,
    pub response_id: Option<String>,
}

/// Folds the raw events of one streamed model call.
pub trait StreamAccumulator: Send {
    /// Consume one raw event, returning the decoded delta if it carries one.
    fn push(&mut self, event: &serde_json::Value) -> Result<Option<TextStreamDelta>, RociError>;

    /// The complete response once the stream has ended.
    fn finish(self: Box<Self>) -> Result<ModelResponse, RociError>;
}

/// Converts between agent configuration and one wire dialect.
pub trait WireConverter: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Render tools in input order, then handoffs as function tools.
    fn convert_tools(&self, tools: &[Tool], handoffs: &[Handoff])
        -> Result<ConvertedTools, RociError>;

    fn convert_tool_choice(&self, raw: &str) -> ToolChoice {
        ToolChoice::parse(raw)
    }

    /// `Unconstrained` for no schema or plain text, otherwise a JSON-schema
    /// format named `final_output`.
    fn get_response_format(&self, schema: Option<&dyn OutputSchema>) -> ResponseFormat {
        match schema {
            Some(schema) if !schema.is_plain_text() => ResponseFormat::JsonSchema {
                name: "final_output".to_string(),
                schema: schema.json_schema(),
                strict: schema.is_strict_json_schema(),
            },
            _ => ResponseFormat::Unconstrained,
        }
    }

    /// Wire value for a tool choice; `None` means the field is omitted.
    fn tool_choice_to_wire(&self, choice: &ToolChoice) -> Option<serde_json::Value>;

    fn items_to_wire(&self, items: &[InputItem]) -> Result<Vec<serde_json::Value>, RociError>;

    /// Request body without the `stream` flag, which the client sets.
    fn build_request(&self, parts: &RequestParts<'_>) -> Result<serde_json::Value, RociError>;

    fn parse_response(&self, body: &serde_json::Value) -> Result<ModelResponse, RociError>;

    fn stream_accumulator(&self) -> Box<dyn StreamAccumulator>;
}

/// Reject `kind` unless `dialect` supports it.
pub(crate) fn ensure_supported(dialect: Dialect, kind: ToolKind) -> Result<(), RociError> {
    if supports(dialect, kind) {
        Ok(())
    } else {
        Err(RociError::UnsupportedTool {
            dialect,
            tool: kind,
        })
    }
}

/// Insert the optional sampling settings both dialects share.
pub(crate) fn insert_common_settings(
    obj: &mut serde_json::Map<String, serde_json::Value>,
    settings: &ModelSettings,
) {
    if let Some(temp) = settings.temperature {
        obj.insert("temperature".into(), temp.into());
    }
    if let Some(top_p) = settings.top_p {
        obj.insert("top_p".into(), top_p.into());
    }
    if let Some(store) = settings.store {
        obj.insert("store".into(), store.into());
    }
    if let Some(ref metadata) = settings.metadata {
        obj.insert("metadata".into(), serde_json::json!(metadata));
    }
}

pub(crate) fn u32_field(value: &serde_json::Value, key: &str) -> u32 {
    value.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32
}

pub(crate) fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_choice_classifies_modes_hosted_and_functions() {
        assert_eq!(ToolChoice::parse(""), ToolChoice::Unconstrained);
        assert_eq!(
            ToolChoice::parse("required"),
            ToolChoice::Mode(ToolChoiceMode::Required)
        );
        assert_eq!(
            ToolChoice::parse("web_search_preview_2025_03_11"),
            ToolChoice::Hosted(HostedToolType::WebSearchPreview20250311)
        );
        assert_eq!(
            ToolChoice::parse("my_function"),
            ToolChoice::Function {
                name: "my_function".into()
            }
        );
    }

    #[test]
    fn chat_dialect_only_supports_function_tools() {
        assert!(supports(Dialect::ChatCompletions, ToolKind::Function));
        assert!(!supports(Dialect::ChatCompletions, ToolKind::FileSearch));
        assert!(supports(Dialect::Responses, ToolKind::LocalShell));
        assert_eq!(Dialect::ChatCompletions.to_string(), "chat_completions");
    }

    #[test]
    fn include_renders_wire_name() {
        assert_eq!(
            ResponseInclude::FileSearchCallResults.to_string(),
            "file_search_call.results"
        );
    }
}
