//! Responses API dialect.

use serde_json::json;
use tracing::debug;

use super::{
    insert_common_settings, str_field, u32_field, ConvertedTools, Dialect, ModelResponse,
    RequestParts, ResponseFormat, ResponseInclude, StreamAccumulator, ToolChoice, WireConverter,
};
use crate::error::RociError;
use crate::handoff::Handoff;
use crate::tools::{Tool, ToolKind};
use crate::types::{InputItem, MessageContent, Role, StreamEventType, TextStreamDelta, Usage};

/// Converter for the `/responses` endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponsesConverter;

impl ResponsesConverter {
    fn convert_tool(tool: &Tool) -> (serde_json::Value, Option<ResponseInclude>) {
        match tool {
            Tool::Function(f) => (
                json!({
                    "type": "function",
                    "name": f.name(),
                    "description": f.description(),
                    "parameters": f.parameters().schema,
                    "strict": f.strict_json_schema(),
                }),
                None,
            ),
            Tool::FileSearch(fs) => {
                let mut descriptor = json!({
                    "type": "file_search",
                    "vector_store_ids": fs.vector_store_ids,
                });
                if let Some(obj) = descriptor.as_object_mut() {
                    if let Some(max) = fs.max_num_results {
                        obj.insert("max_num_results".into(), max.into());
                    }
                    if let Some(ref ranking) = fs.ranking_options {
                        obj.insert("ranking_options".into(), ranking.clone());
                    }
                    if let Some(ref filters) = fs.filters {
                        obj.insert("filters".into(), filters.clone());
                    }
                }
                let include = fs
                    .include_search_results
                    .then_some(ResponseInclude::FileSearchCallResults);
                (descriptor, include)
            }
            Tool::WebSearch(ws) => {
                let mut descriptor = json!({
                    "type": "web_search_preview",
                    "search_context_size": ws.search_context_size.to_string(),
                });
                if let (Some(location), Some(obj)) = (&ws.user_location, descriptor.as_object_mut())
                {
                    let mut loc = json!(location);
                    if let Some(loc_obj) = loc.as_object_mut() {
                        loc_obj.insert("type".into(), "approximate".into());
                    }
                    obj.insert("user_location".into(), loc);
                }
                (descriptor, None)
            }
            Tool::Computer(c) => {
                let (width, height) = c.dimensions();
                (
                    json!({
                        "type": "computer_use_preview",
                        "environment": c.environment().to_string(),
                        "display_width": width,
                        "display_height": height,
                    }),
                    None,
                )
            }
            Tool::CodeInterpreter(ci) => (
                json!({ "type": "code_interpreter", "container": ci.container }),
                None,
            ),
            Tool::ImageGeneration(ig) => {
                let mut obj = ig.options.clone();
                obj.insert("type".into(), "image_generation".into());
                (serde_json::Value::Object(obj), None)
            }
            Tool::LocalShell(_) => (json!({ "type": "local_shell" }), None),
            Tool::HostedMcp(mcp) => {
                let mut descriptor = json!({
                    "type": "mcp",
                    "server_label": mcp.server_label,
                    "server_url": mcp.server_url,
                });
                if let Some(obj) = descriptor.as_object_mut() {
                    if let Some(ref allowed) = mcp.allowed_tools {
                        obj.insert("allowed_tools".into(), json!(allowed));
                    }
                    if let Some(ref approval) = mcp.require_approval {
                        obj.insert("require_approval".into(), approval.clone().into());
                    }
                    if let Some(ref headers) = mcp.headers {
                        obj.insert("headers".into(), json!(headers));
                    }
                }
                (descriptor, None)
            }
        }
    }

    fn convert_handoff(handoff: &Handoff) -> serde_json::Value {
        json!({
            "type": "function",
            "name": handoff.tool_name,
            "description": handoff.tool_description,
            "parameters": handoff.parameters_schema(),
            "strict": handoff.strict_json_schema,
        })
    }

    fn item_to_wire(item: &InputItem) -> serde_json::Value {
        match item {
            InputItem::Message { role, content } => json!({
                "type": "message",
                "role": role,
                "content": content,
            }),
            InputItem::FunctionCall {
                call_id,
                name,
                arguments,
            } => json!({
                "type": "function_call",
                "call_id": call_id,
                "name": name,
                "arguments": arguments,
            }),
            InputItem::FunctionCallOutput { call_id, output } => json!({
                "type": "function_call_output",
                "call_id": call_id,
                "output": output,
            }),
            InputItem::ComputerCall { raw, .. }
            | InputItem::LocalShellCall { raw, .. }
            | InputItem::HostedToolCall { raw, .. } => raw.clone(),
            InputItem::ComputerCallOutput { call_id, image_url } => json!({
                "type": "computer_call_output",
                "call_id": call_id,
                "output": {
                    "type": "computer_screenshot",
                    "image_url": image_url,
                },
            }),
            InputItem::LocalShellCallOutput { call_id, output } => json!({
                "type": "local_shell_call_output",
                "id": call_id,
                "output": output,
            }),
            InputItem::Reasoning { id, summary } => {
                let mut value = json!({
                    "type": "reasoning",
                    "summary": summary
                        .iter()
                        .map(|text| json!({ "type": "summary_text", "text": text }))
                        .collect::<Vec<_>>(),
                });
                if let (Some(id), Some(obj)) = (id, value.as_object_mut()) {
                    obj.insert("id".into(), id.clone().into());
                }
                value
            }
        }
    }

    fn item_from_wire(item: &serde_json::Value) -> Result<Option<InputItem>, RociError> {
        let item_type = str_field(item, "type").unwrap_or("");
        let parsed = match item_type {
            "message" => {
                let text = item
                    .get("content")
                    .and_then(|c| c.as_array())
                    .map(|parts| {
                        parts
                            .iter()
                            .filter_map(|part| match str_field(part, "type") {
                                Some("output_text") => str_field(part, "text"),
                                Some("refusal") => str_field(part, "refusal"),
                                _ => None,
                            })
                            .collect::<String>()
                    })
                    .unwrap_or_default();
                Some(InputItem::Message {
                    role: Role::Assistant,
                    content: MessageContent::Text(text),
                })
            }
            "function_call" => Some(InputItem::FunctionCall {
                call_id: required_str(item, "call_id")?,
                name: required_str(item, "name")?,
                arguments: str_field(item, "arguments").unwrap_or("").to_string(),
            }),
            "computer_call" => Some(InputItem::ComputerCall {
                call_id: required_str(item, "call_id")?,
                action: item.get("action").cloned().unwrap_or_default(),
                raw: item.clone(),
            }),
            "local_shell_call" => Some(InputItem::LocalShellCall {
                call_id: required_str(item, "call_id")?,
                action: item.get("action").cloned().unwrap_or_default(),
                raw: item.clone(),
            }),
            "reasoning" => Some(InputItem::Reasoning {
                id: str_field(item, "id").map(str::to_string),
                summary: item
                    .get("summary")
                    .and_then(|s| s.as_array())
                    .map(|parts| {
                        parts
                            .iter()
                            .filter_map(|p| str_field(p, "text").map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default(),
            }),
            other => match ToolKind::from_call_type(other) {
                Some(tool) => Some(InputItem::HostedToolCall {
                    tool,
                    raw: item.clone(),
                }),
                None => {
                    debug!(item_type = other, "skipping unknown Responses output item");
                    None
                }
            },
        };
        Ok(parsed)
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
            input_tokens: u32_field(u, "input_tokens"),
            output_tokens: u32_field(u, "output_tokens"),
            total_tokens: u32_field(u, "total_tokens"),
            cached_input_tokens: u
                .get("input_tokens_details")
                .and_then(|d| d.get("cached_tokens"))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32),
            reasoning_tokens: u
                .get("output_tokens_details")
                .and_then(|d| d.get("reasoning_tokens"))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32),
        }
    }
}

fn required_str(item: &serde_json::Value, key: &str) -> Result<String, RociError> {
    str_field(item, key).map(str::to_string).ok_or_else(|| {
        RociError::ModelBehavior(format!(
            "Responses output item '{}' is missing '{key}'",
            str_field(item, "type").unwrap_or("?")
        ))
    })
}

impl WireConverter for ResponsesConverter {
    fn dialect(&self) -> Dialect {
        Dialect::Responses
    }

    fn convert_tools(
        &self,
        tools: &[Tool],
        handoffs: &[Handoff],
    ) -> Result<ConvertedTools, RociError> {
        let computers = tools
            .iter()
            .filter(|t| matches!(t, Tool::Computer(_)))
            .count();
        if computers > 1 {
            return Err(RociError::Configuration(format!(
                "only one computer tool is allowed per agent, got {computers}"
            )));
        }

        let mut converted = ConvertedTools::default();
        for tool in tools {
            let (descriptor, include) = Self::convert_tool(tool);
            converted.tools.push(descriptor);
            if let Some(include) = include {
                converted.push_include(include);
            }
        }
        converted
            .tools
            .extend(handoffs.iter().map(Self::convert_handoff));
        Ok(converted)
    }

    fn tool_choice_to_wire(&self, choice: &ToolChoice) -> Option<serde_json::Value> {
        match choice {
            ToolChoice::Unconstrained => None,
            ToolChoice::Mode(mode) => Some(json!(mode.to_string())),
            ToolChoice::Hosted(hosted) => Some(json!({ "type": hosted.to_string() })),
            ToolChoice::Function { name } => Some(json!({ "type": "function", "name": name })),
        }
    }

    fn items_to_wire(&self, items: &[InputItem]) -> Result<Vec<serde_json::Value>, RociError> {
        Ok(items.iter().map(Self::item_to_wire).collect())
    }

    fn build_request(&self, parts: &RequestParts<'_>) -> Result<serde_json::Value, RociError> {
        let mut obj = serde_json::Map::new();
        if let Some(model) = parts.model {
            obj.insert("model".into(), model.into());
        }
        obj.insert("input".into(), self.items_to_wire(parts.history)?.into());
        if let Some(instructions) = parts.instructions {
            obj.insert("instructions".into(), instructions.into());
        }
        if !parts.tools.tools.is_empty() {
            obj.insert("tools".into(), parts.tools.tools.clone().into());
        }
        if !parts.tools.includes.is_empty() {
            obj.insert("include".into(), json!(parts.tools.includes));
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
                "text".into(),
                json!({
                    "format": {
                        "type": "json_schema",
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
            obj.insert("max_output_tokens".into(), max.into());
        }
        if let Some(parallel) = settings.parallel_tool_calls {
            obj.insert("parallel_tool_calls".into(), parallel.into());
        }
        if let Some(truncation) = settings.truncation {
            obj.insert("truncation".into(), truncation.to_string().into());
        }
        if let Some(effort) = settings.reasoning_effort {
            obj.insert("reasoning".into(), json!({ "effort": effort.to_string() }));
        }
        Ok(serde_json::Value::Object(obj))
    }

    fn parse_response(&self, body: &serde_json::Value) -> Result<ModelResponse, RociError> {
        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let message = str_field(error, "message").unwrap_or("unknown error");
            return Err(RociError::api(200, message));
        }
        let mut output = Vec::new();
        for item in body
            .get("output")
            .and_then(|o| o.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            if let Some(parsed) = Self::item_from_wire(item)? {
                output.push(parsed);
            }
        }
        Ok(ModelResponse {
            output,
            usage: Self::map_usage(body.get("usage")),
            response_id: str_field(body, "id").map(str::to_string),
        })
    }

    fn stream_accumulator(&self) -> Box<dyn StreamAccumulator> {
        Box::new(ResponsesStream::default())
    }
}

/// Folds Responses SSE events; the final `response.completed` event carries
/// the whole response.
#[derive(Debug, Default)]
struct ResponsesStream {
    completed: Option<ModelResponse>,
}

impl StreamAccumulator for ResponsesStream {
    fn push(&mut self, event: &serde_json::Value) -> Result<Option<TextStreamDelta>, RociError> {
        let delta_text = || str_field(event, "delta").unwrap_or("").to_string();
        match str_field(event, "type").unwrap_or("") {
            "response.output_text.delta" => Ok(Some(TextStreamDelta::text(delta_text()))),
            "response.reasoning_summary_text.delta" => Ok(Some(TextStreamDelta {
                text: delta_text(),
                event_type: StreamEventType::ReasoningDelta,
                call_id: None,
            })),
            "response.function_call_arguments.delta" => Ok(Some(TextStreamDelta {
                text: delta_text(),
                event_type: StreamEventType::ToolCallDelta,
                call_id: str_field(event, "item_id").map(str::to_string),
            })),
            "response.completed" => {
                let response = event.get("response").ok_or_else(|| {
                    RociError::Stream("response.completed event without a response".into())
                })?;
                self.completed = Some(ResponsesConverter.parse_response(response)?);
                Ok(Some(TextStreamDelta {
                    text: String::new(),
                    event_type: StreamEventType::Done,
                    call_id: None,
                }))
            }
            "response.failed" | "error" => {
                let message = event
                    .get("response")
                    .and_then(|r| r.get("error"))
                    .or_else(|| event.get("error"))
                    .and_then(|e| str_field(e, "message"))
                    .or_else(|| str_field(event, "message"))
                    .unwrap_or("stream failed");
                Err(RociError::Stream(message.to_string()))
            }
            _ => Ok(None),
        }
    }

    fn finish(self: Box<Self>) -> Result<ModelResponse, RociError> {
        self.completed.ok_or_else(|| {
            RociError::Stream("stream ended before response.completed".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_message_function_call_reasoning_and_usage() {
        let body = json!({
            "id": "resp_1",
            "output": [
                { "type": "reasoning", "id": "rs_1", "summary": [{ "type": "summary_text", "text": "thinking" }] },
                { "type": "message", "role": "assistant", "content": [{ "type": "output_text", "text": "Hi" }] },
                { "type": "function_call", "call_id": "c1", "name": "lookup", "arguments": "{\"q\":1}" },
                { "type": "web_search_call", "id": "ws_1", "status": "completed" },
            ],
            "usage": {
                "input_tokens": 7,
                "output_tokens": 3,
                "total_tokens": 10,
                "input_tokens_details": { "cached_tokens": 2 },
            },
        });

        let parsed = ResponsesConverter.parse_response(&body).unwrap();

        assert_eq!(parsed.response_id.as_deref(), Some("resp_1"));
        assert_eq!(
            parsed.output[0],
            InputItem::Reasoning {
                id: Some("rs_1".into()),
                summary: vec!["thinking".into()],
            }
        );
        assert_eq!(parsed.output[1], InputItem::assistant("Hi"));
        assert_eq!(parsed.output[2].call_id(), Some("c1"));
        assert!(matches!(
            parsed.output[3],
            InputItem::HostedToolCall {
                tool: ToolKind::WebSearch,
                ..
            }
        ));
        assert_eq!(parsed.usage.total_tokens, 10);
        assert_eq!(parsed.usage.cached_input_tokens, Some(2));
        assert_eq!(parsed.usage.requests, 1);
    }

    #[test]
    fn function_call_without_call_id_is_model_behavior_error() {
        let body = json!({ "output": [{ "type": "function_call", "name": "x" }] });
        let err = ResponsesConverter.parse_response(&body).unwrap_err();
        assert!(matches!(err, RociError::ModelBehavior(_)));
    }

    #[test]
    fn history_items_render_as_responses_input() {
        let items = vec![
            InputItem::user("hello"),
            InputItem::function_output("c1", "42"),
            InputItem::LocalShellCallOutput {
                call_id: "sh_1".into(),
                output: "ok".into(),
            },
        ];

        let wire = ResponsesConverter.items_to_wire(&items).unwrap();

        assert_eq!(
            wire,
            vec![
                json!({ "type": "message", "role": "user", "content": "hello" }),
                json!({ "type": "function_call_output", "call_id": "c1", "output": "42" }),
                json!({ "type": "local_shell_call_output", "id": "sh_1", "output": "ok" }),
            ]
        );
    }

    #[test]
    fn stream_yields_text_deltas_then_completed_response() {
        let mut acc = ResponsesConverter.stream_accumulator();
        let delta = acc
            .push(&json!({ "type": "response.output_text.delta", "delta": "He" }))
            .unwrap();
        assert_eq!(delta, Some(TextStreamDelta::text("He")));
        assert_eq!(
            acc.push(&json!({ "type": "response.created" })).unwrap(),
            None
        );
        acc.push(&json!({
            "type": "response.completed",
            "response": {
                "id": "resp_2",
                "output": [{ "type": "message", "content": [{ "type": "output_text", "text": "Hello" }] }],
            },
        }))
        .unwrap();

        let response = acc.finish().unwrap();
        assert_eq!(response.output, vec![InputItem::assistant("Hello")]);
    }

    #[test]
    fn stream_without_completion_is_an_error() {
        let acc = ResponsesConverter.stream_accumulator();
        assert!(matches!(acc.finish(), Err(RociError::Stream(_))));
    }
}
