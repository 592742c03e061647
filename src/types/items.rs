//! Conversation items and run items.
//!
//! [`InputItem`] is the dialect-neutral unit of conversation history. Items
//! the model emits are stored with the same type because every one of them
//! is replayed as input on the next turn. [`RunItem`] wraps an item with the
//! agent that produced it and its role in the run.

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::tools::ToolKind;

/// Conversation role for message items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
}

/// Detail level requested for an image part.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ImageDetail {
    #[default]
    Auto,
    Low,
    High,
}

/// One part of a multimodal message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText {
        text: String,
    },
    InputImage {
        /// An `https:` or `data:` URL.
        image_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<ImageDetail>,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::InputText { text: text.into() }
    }

    pub fn image(image_url: impl Into<String>, detail: Option<ImageDetail>) -> Self {
        Self::InputImage {
            image_url: image_url.into(),
            detail,
        }
    }
}

/// Message body: plain text, or a list of parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// The body when it is plain text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Parts(_) => None,
        }
    }

    /// All text in the body; image parts are skipped.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::InputText { text } => Some(text.as_str()),
                    ContentPart::InputImage { .. } => None,
                })
                .collect(),
        }
    }
}

impl From<String> for MessageContent {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MessageContent {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<ContentPart>> for MessageContent {
    fn from(value: Vec<ContentPart>) -> Self {
        Self::Parts(value)
    }
}

/// One entry of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    Message {
        role: Role,
        content: MessageContent,
    },
    FunctionCall {
        call_id: String,
        name: String,
        /// Raw JSON arguments as produced by the model.
        arguments: String,
    },
    FunctionCallOutput {
        call_id: String,
        output: String,
    },
    ComputerCall {
        call_id: String,
        action: serde_json::Value,
        /// The wire item, replayed verbatim.
        raw: serde_json::Value,
    },
    ComputerCallOutput {
        call_id: String,
        /// `data:` URL of the screenshot taken after the action.
        image_url: String,
    },
    LocalShellCall {
        call_id: String,
        action: serde_json::Value,
        raw: serde_json::Value,
    },
    LocalShellCallOutput {
        call_id: String,
        output: String,
    },
    /// A call executed by the provider (file search, web search, ...).
    HostedToolCall {
        tool: ToolKind,
        raw: serde_json::Value,
    },
    Reasoning {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        summary: Vec<String>,
    },
}

impl InputItem {
    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::Message {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a user message from text and image parts.
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::Message {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Message {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::Message {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Create a function call output.
    pub fn function_output(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::FunctionCallOutput {
            call_id: call_id.into(),
            output: output.into(),
        }
    }

    /// Call id for call and call-output items.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::FunctionCall { call_id, .. }
            | Self::FunctionCallOutput { call_id, .. }
            | Self::ComputerCall { call_id, .. }
            | Self::ComputerCallOutput { call_id, .. }
            | Self::LocalShellCall { call_id, .. }
            | Self::LocalShellCallOutput { call_id, .. } => Some(call_id),
            _ => None,
        }
    }
}

/// Caller input for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunInput {
    Text(String),
    Items(Vec<InputItem>),
}

impl RunInput {
    /// Expand into history items.
    pub fn into_items(self) -> Vec<InputItem> {
        match self {
            Self::Text(text) => vec![InputItem::user(text)],
            Self::Items(items) => items,
        }
    }
}

impl From<&str> for RunInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RunInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<InputItem>> for RunInput {
    fn from(value: Vec<InputItem>) -> Self {
        Self::Items(value)
    }
}

/// A unit of model output or tool interaction produced during a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunItem {
    MessageOutput {
        agent: String,
        raw: InputItem,
    },
    ToolCall {
        agent: String,
        raw: InputItem,
    },
    ToolCallOutput {
        agent: String,
        /// Value returned by the tool before stringification.
        output: serde_json::Value,
        raw: InputItem,
    },
    HandoffCall {
        agent: String,
        raw: InputItem,
    },
    HandoffOutput {
        source_agent: String,
        target_agent: String,
        raw: InputItem,
    },
    Reasoning {
        agent: String,
        raw: InputItem,
    },
}

impl RunItem {
    /// Name of the agent that produced this item.
    pub fn agent(&self) -> &str {
        match self {
            Self::MessageOutput { agent, .. }
            | Self::ToolCall { agent, .. }
            | Self::ToolCallOutput { agent, .. }
            | Self::HandoffCall { agent, .. }
            | Self::Reasoning { agent, .. } => agent,
            Self::HandoffOutput { source_agent, .. } => source_agent,
        }
    }

    /// The history item this run item contributes.
    pub fn to_input_item(&self) -> InputItem {
        match self {
            Self::MessageOutput { raw, .. }
            | Self::ToolCall { raw, .. }
            | Self::ToolCallOutput { raw, .. }
            | Self::HandoffCall { raw, .. }
            | Self::HandoffOutput { raw, .. }
            | Self::Reasoning { raw, .. } => raw.clone(),
        }
    }

    /// Message text for `MessageOutput` items.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::MessageOutput {
                raw: InputItem::Message { content, .. },
                ..
            } => content.as_text(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn input_items_serialize_with_type_tag() {
        let item = InputItem::FunctionCall {
            call_id: "c1".into(),
            name: "lookup".into(),
            arguments: "{}".into(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "function_call",
                "call_id": "c1",
                "name": "lookup",
                "arguments": "{}",
            })
        );
    }

    #[test]
    fn run_item_exposes_history_item_and_agent() {
        let item = RunItem::HandoffOutput {
            source_agent: "triage".into(),
            target_agent: "billing".into(),
            raw: InputItem::function_output("c9", "{\"assistant\":\"billing\"}"),
        };
        assert_eq!(item.agent(), "triage");
        assert_eq!(item.to_input_item().call_id(), Some("c9"));
        assert_eq!(item.text(), None);
    }

    #[test]
    fn multimodal_message_serializes_parts() {
        let item = InputItem::user_parts(vec![
            ContentPart::image("data:image/jpeg;base64,AAAA", Some(ImageDetail::Auto)),
            ContentPart::text("What is this?"),
        ]);
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            serde_json::json!({
                "type": "message",
                "role": "user",
                "content": [
                    { "type": "input_image", "image_url": "data:image/jpeg;base64,AAAA", "detail": "auto" },
                    { "type": "input_text", "text": "What is this?" },
                ],
            })
        );
        let InputItem::Message { content, .. } = &item else {
            unreachable!()
        };
        assert_eq!(content.as_text(), None);
        assert_eq!(content.to_text(), "What is this?");
    }

    #[test]
    fn text_input_expands_to_user_message() {
        let items = RunInput::from("hi").into_items();
        assert_eq!(items, vec![InputItem::user("hi")]);
    }
}
