//! Streaming delta types.

use serde::{Deserialize, Serialize};

/// Type of a decoded stream delta.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreamEventType {
    /// Incremental output text.
    TextDelta,
    /// Incremental reasoning summary text.
    ReasoningDelta,
    /// Incremental tool-call arguments.
    ToolCallDelta,
    /// The model call finished.
    Done,
}

/// A dialect-neutral delta decoded from one raw stream event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextStreamDelta {
    /// The incremental chunk.
    pub text: String,
    pub event_type: StreamEventType,
    /// Call id for tool-call deltas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl TextStreamDelta {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            event_type: StreamEventType::TextDelta,
            call_id: None,
        }
    }
}
