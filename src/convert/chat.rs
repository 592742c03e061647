//! Chat Completions dialect.
//!
//! Only function tools exist here. Hosted tools, and history items produced
//! by them, fail conversion with [`RociError::UnsupportedTool`].

use std::collections::BTreeMap;

use serde_json::json;

use super::{
    ensure_supported, insert_common_settings, str_field, u32_field, ConvertedTools, Dialect,
    ModelResponse, RequestParts, ResponseFormat, StreamAccumulator, ToolChoice, WireConverter,
};
use crate::error::RociError;
use crate::handoff::Handoff;
use crate::tools::{Tool, ToolKind};
use crate::types::{
    ContentPart, InputItem, MessageContent, Role, StreamEventType, TextStreamDelta, Usage,
};

/// Converter for the `/chat/completions` endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatCompletionsConverter;

fn function_descriptor(
    name: &str,
    description: &str,
    parameters: serde_json::Value,
    strict: bool,
) -> serde_json::Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters,
            "strict": strict,
        }
    })
}

fn tool_call_value(call_id: &str, name: &str, arguments: &str) -> serde_json::Value {
    json!({
        "id": call_id,
        "type": "function",
        "function": { "name": name, "arguments": arguments },
    })
}

/// Chat renders image parts as `image_url` objects.
fn content_to_wire(content: &MessageContent) -> serde_json::Value {
    match content {
        MessageContent::Text(text) => json!(text),
        MessageContent::Parts(parts) => parts
            .iter()
            .map(|part| match part {
                ContentPart::InputText { text } => json!({ "type": "text", "text": text }),
                ContentPart::InputImage { image_url, detail } => {
                    let mut image = json!({ "url": image_url });
                    if let Some(detail) = detail {
                        image["detail"] = json!(detail.to_string());
                    }
                    json!({ "type": "image_url", "image_url": image })
                }
            })
            .collect(),
    }
}

/// A non-empty string field, or a model-behavior error naming it.
fn required_field(value: &serde_json::Value, key: &str) -> Result<String, RociError> {
    str_field(value, key)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RociError::ModelBehavior(format!("chat tool call without '{key}'")))
}

fn map_usage(usage: Option<&serde_json::Value>) -> Usage {
    let Some(u) = usage else {
        return Usage {
            requests: 1,
            ..Default::default()
        };
    };
    Usage {
        requests: 1,
        input_tokens: u32_field(u, "prompt_tokens"),
        output_tokens: u32_field(u, "completion_tokens"),
        total_tokens: u32_field(u, "total_tokens"),
        cached_input_tokens: u
            .get("prompt_tokens_details")
            .and_then(|d| d.get("cached_tokens"))
            .and_then(|v| v.as_u64())
            .map(|v| v as u32),
        reasoning_tokens: u
            .get("completion_tokens_details")
            .and_then(|d| d.get("reasoning_tokens"))
            .and_then(|v| v.as_u64())
            .map(|v| v as u32),
    }
}

impl WireConverter for ChatCompletionsConverter {
    fn dialect(&self) -> Dialect {
        Dialect::ChatCompletions
    }

    fn convert_tools(
        &self,
        tools: &[Tool],
        handoffs: &[Handoff],
    ) -> Result<ConvertedTools, RociError> {
        let mut converted = ConvertedTools::default();
        for tool in tools {
            ensure_supported(Dialect::ChatCompletions, tool.kind())?;
            if let Tool::Function(f) = tool {
                converted.tools.push(function_descriptor(
                    f.name(),
                    f.description(),
                    f.parameters().schema.clone(),
                    f.strict_json_schema(),
                ));
            }
        }
        converted.tools.extend(handoffs.iter().map(|h| {
            function_descriptor(
                &h.tool_name,
                &h.tool_description,
                h.parameters_schema(),
                h.strict_json_schema,
            )
        }));
        Ok(converted)
    }

    /// Hosted choices have no Chat counterpart and are sent as a forced
    /// function of the same name.
    fn tool_choice_to_wire(&self, choice: &ToolChoice) -> Option<serde_json::Value> {
        match choice {
            ToolChoice::Unconstrained => None,
            ToolChoice::Mode(mode) => Some(json!(mode.to_string())),
            ToolChoice::Hosted(hosted) => Some(json!({
                "type": "function",
                "function": { "name": hosted.to_string() },
            })),
            ToolChoice::Function { name } => Some(json!({
                "type": "function",
                "function": { "name": name },
            })),
        }
    }

    fn items_to_wire(&self, items: &[InputItem]) -> Result<Vec<serde_json::Value>, RociError> {
        let mut messages: Vec<serde_json::Value> = Vec::new();
        for item in items {
            match item {
                InputItem::Message { role, content } => {
                    messages.push(json!({ "role": role, "content": content_to_wire(content) }));
                }
                InputItem::FunctionCall {
                    call_id,
                    name,
                    arguments,
                } => {
                    let call = tool_call_value(call_id, name, arguments);
                    let pending = messages
                        .last_mut()
                        .filter(|m| str_field(m, "role") == Some("assistant"))
                        .and_then(|m| m.as_object_mut());
                    match pending {
                        Some(assistant) => {
                            let calls = assistant
                                .entry("tool_calls")
                                .or_insert_with(|| json!([]));
                            if let Some(calls) = calls.as_array_mut() {
                                calls.push(call);
                            }
                        }
                        None => messages.push(json!({
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [call],
                        })),
                    }
                }
                InputItem::FunctionCallOutput { call_id, output } => {
                    messages.push(json!({
                        "role": "tool",
                        "tool_call_id": call_id,
                        "content": output,
                    }));
                }
                InputItem::ComputerCall { .. } | InputItem::ComputerCallOutput { .. } => {
                    ensure_supported(Dialect::ChatCompletions, ToolKind::Computer)?;
                }
                InputItem::LocalShellCall { .. } | InputItem::LocalShellCallOutput { .. } => {
                    ensure_supported(Dialect::ChatCompletions, ToolKind::LocalShell)?;
                }
                InputItem::HostedToolCall { tool, .. } => {
                    ensure_supported(Dialect::ChatCompletions, *tool)?;
                }
                InputItem::Reasoning { .. } => {}
            }
        }
        Ok(messages)
    }

    fn build_request(&self, parts: &RequestParts<'_>) -> Result<serde_json::Value, RociError> {
        let mut messages = Vec::with_capacity(parts.history.len() + 1);
        if let Some(instructions) = parts.instructions {
            messages.push(json!({ "role": "system", "content": instructions }));
        }
        messages.extend(self.items_to_wire(parts.history)?);

        let mut obj = serde_json::Map::new();
        if let Some(model) = parts.model {
            obj.insert("model".into(), model.into());
        }
        obj.insert("messages".into(), messages.into());

        let has_tools = !parts.tools.tools.is_empty();
        if has_tools {
            obj.insert("tools".into(), parts.tools.tools.clone().into());
        }
        if let Some(choice) = self.tool_choice_to_wire(parts.tool_choice) {
            obj.insert("tool_choice".into(), choice);
        }
        if let ResponseFormat::JsonSchema {
            name,
            schema,
            strict,
        } = parts.response_format
        {
            obj.insert(
                "response_format".into(),
                json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": name,
                        "schema": schema,
                        "strict": strict,
                    }
                }),
            );
        }

        let settings = parts.settings;
        insert_common_settings(&mut obj, settings);
        if let Some(max) = settings.max_tokens {
            obj.insert("max_tokens".into(), max.into());
        }
        // parallel_tool_calls is rejected by the API when no tools are sent.
        if let (true, Some(parallel)) = (has_tools, settings.parallel_tool_calls) {
            obj.insert("parallel_tool_calls".into(), parallel.into());
        }
        if let Some(effort) = settings.reasoning_effort {
            obj.insert("reasoning_effort".into(), effort.to_string().into());
        }
        Ok(serde_json::Value::Object(obj))
    }

    fn parse_response(&self, body: &serde_json::Value) -> Result<ModelResponse, RociError> {
        let message = body
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .ok_or_else(|| RociError::api(200, "No choices in chat completion response"))?;

        let mut output = Vec::new();
        let text = str_field(message, "content").or_else(|| str_field(message, "refusal"));
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            output.push(InputItem::Message {
                role: Role::Assistant,
                content: MessageContent::Text(text.to_string()),
            });
        }
        for call in message
            .get("tool_calls")
            .and_then(|c| c.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            let function = call.get("function").ok_or_else(|| {
                RociError::ModelBehavior("chat tool call without a function".into())
            })?;
            output.push(InputItem::FunctionCall {
                call_id: required_field(call, "id")?,
                name: required_field(function, "name")?,
                arguments: str_field(function, "arguments").unwrap_or("").to_string(),
            });
        }

        Ok(ModelResponse {
            output,
            usage: map_usage(body.get("usage")),
            response_id: str_field(body, "id").map(str::to_string),
        })
    }

    fn stream_accumulator(&self) -> Box<dyn StreamAccumulator> {
        Box::new(ChatStream::default())
    }
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Folds chat completion chunks. Tool calls arrive as fragments keyed by
/// index; usage, when requested, arrives on the last chunk.
#[derive(Debug, Default)]
struct ChatStream {
    response_id: Option<String>,
    text: String,
    calls: BTreeMap<u64, PartialCall>,
    usage: Option<Usage>,
}

impl StreamAccumulator for ChatStream {
    fn push(&mut self, event: &serde_json::Value) -> Result<Option<TextStreamDelta>, RociError> {
        if self.response_id.is_none() {
            self.response_id = str_field(event, "id").map(str::to_string);
        }
        if let Some(usage) = event.get("usage").filter(|u| !u.is_null()) {
            self.usage = Some(map_usage(Some(usage)));
        }
        let Some(delta) = event
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("delta"))
        else {
            return Ok(None);
        };

        // A chunk carrying text and a tool-call fragment reports the text.
        let mut emitted = None;
        if let Some(content) = str_field(delta, "content").filter(|c| !c.is_empty()) {
            self.text.push_str(content);
            emitted = Some(TextStreamDelta::text(content));
        }
        for fragment in delta
            .get("tool_calls")
            .and_then(|c| c.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            let index = fragment.get("index").and_then(|i| i.as_u64()).unwrap_or(0);
            let call = self.calls.entry(index).or_default();
            if let Some(id) = str_field(fragment, "id") {
                call.id = id.to_string();
            }
            if let Some(function) = fragment.get("function") {
                if let Some(name) = str_field(function, "name") {
                    call.name.push_str(name);
                }
                if let Some(args) = str_field(function, "arguments") {
                    call.arguments.push_str(args);
                    if emitted.is_none() {
                        emitted = Some(TextStreamDelta {
                            text: args.to_string(),
                            event_type: StreamEventType::ToolCallDelta,
                            call_id: Some(call.id.clone()),
                        });
                    }
                }
            }
        }
        Ok(emitted)
    }

    fn finish(self: Box<Self>) -> Result<ModelResponse, RociError> {
        let mut output = Vec::new();
        if !self.text.is_empty() {
            output.push(InputItem::assistant(self.text));
        }
        for call in self.calls.into_values() {
            if call.id.is_empty() || call.name.is_empty() {
                return Err(RociError::ModelBehavior(
                    "streamed chat tool call is missing its id or name".to_string(),
                ));
            }
            output.push(InputItem::FunctionCall {
                call_id: call.id,
                name: call.name,
                arguments: call.arguments,
            });
        }
        Ok(ModelResponse {
            output,
            usage: self.usage.unwrap_or(Usage {
                requests: 1,
                ..Default::default()
            }),
            response_id: self.response_id,
        })
    }
}
