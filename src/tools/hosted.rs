//! Tools executed by the model provider.
//!
//! These carry configuration only. Rendering into a wire shape lives in the
//! converters.

use std::collections::BTreeMap;

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Search over uploaded vector stores.
#[derive(Debug, Clone, Default, Builder, PartialEq)]
pub struct FileSearchTool {
    #[builder(default)]
    pub vector_store_ids: Vec<String>,
    pub max_num_results: Option<u32>,
    /// Ask the provider to return matched chunks with the call item.
    #[builder(default)]
    pub include_search_results: bool,
    pub ranking_options: Option<serde_json::Value>,
    pub filters: Option<serde_json::Value>,
}

/// How much context the web search tool may pull in.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchContextSize {
    Low,
    #[default]
    Medium,
    High,
}

/// Approximate user location used to localise web results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Hosted web search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebSearchTool {
    pub user_location: Option<UserLocation>,
    pub search_context_size: SearchContextSize,
}

/// Sandboxed code execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeInterpreterTool {
    /// Container spec, e.g. `{"type": "auto"}` or a container id string.
    pub container: serde_json::Value,
}

impl Default for CodeInterpreterTool {
    fn default() -> Self {
        Self {
            container: serde_json::json!({ "type": "auto" }),
        }
    }
}

/// Image generation. Options (size, quality, background, ...) are passed
/// through to the provider unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageGenerationTool {
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// A remote MCP server the provider calls on the model's behalf.
#[derive(Debug, Clone, Builder, PartialEq)]
pub struct HostedMcpTool {
    #[builder(into)]
    pub server_label: String,
    #[builder(into)]
    pub server_url: String,
    pub allowed_tools: Option<Vec<String>>,
    /// `always` or `never`.
    #[builder(into)]
    pub require_approval: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
}
