//! Tools an agent can expose to the model.
//!
//! [`Tool`] is a closed set: converters match on it exhaustively, so adding
//! a kind forces every dialect to decide how to render it.

pub mod arguments;
pub mod computer;
pub mod function;
pub mod hosted;
pub mod shell;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use computer::{Computer, ComputerEnvironment, ComputerTool};
pub use function::{FunctionTool, ToolContext};
pub use hosted::{
    CodeInterpreterTool, FileSearchTool, HostedMcpTool, ImageGenerationTool, SearchContextSize,
    UserLocation, WebSearchTool,
};
pub use shell::{LocalShellCommandRequest, LocalShellTool};
pub use types::AgentToolParameters;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Discriminant of a [`Tool`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolKind {
    Function,
    FileSearch,
    WebSearch,
    Computer,
    CodeInterpreter,
    ImageGeneration,
    LocalShell,
    HostedMcp,
}

impl ToolKind {
    /// Kind of a provider-executed call from its wire item type.
    pub fn from_call_type(item_type: &str) -> Option<Self> {
        match item_type {
            "file_search_call" => Some(Self::FileSearch),
            "web_search_call" => Some(Self::WebSearch),
            "computer_call" => Some(Self::Computer),
            "code_interpreter_call" => Some(Self::CodeInterpreter),
            "image_generation_call" => Some(Self::ImageGeneration),
            "local_shell_call" => Some(Self::LocalShell),
            "mcp_call" | "mcp_list_tools" | "mcp_approval_request" => Some(Self::HostedMcp),
            _ => None,
        }
    }
}

/// A tool attached to an agent.
#[derive(Debug, Clone)]
pub enum Tool {
    Function(FunctionTool),
    FileSearch(FileSearchTool),
    WebSearch(WebSearchTool),
    Computer(ComputerTool),
    CodeInterpreter(CodeInterpreterTool),
    ImageGeneration(ImageGenerationTool),
    LocalShell(LocalShellTool),
    HostedMcp(HostedMcpTool),
}

impl Tool {
    /// Name the model uses to refer to this tool.
    pub fn name(&self) -> &str {
        match self {
            Self::Function(tool) => tool.name(),
            Self::FileSearch(_) => "file_search",
            Self::WebSearch(_) => "web_search_preview",
            Self::Computer(_) => "computer_use_preview",
            Self::CodeInterpreter(_) => "code_interpreter",
            Self::ImageGeneration(_) => "image_generation",
            Self::LocalShell(_) => "local_shell",
            Self::HostedMcp(tool) => &tool.server_label,
        }
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Function(_) => ToolKind::Function,
            Self::FileSearch(_) => ToolKind::FileSearch,
            Self::WebSearch(_) => ToolKind::WebSearch,
            Self::Computer(_) => ToolKind::Computer,
            Self::CodeInterpreter(_) => ToolKind::CodeInterpreter,
            Self::ImageGeneration(_) => ToolKind::ImageGeneration,
            Self::LocalShell(_) => ToolKind::LocalShell,
            Self::HostedMcp(_) => ToolKind::HostedMcp,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionTool> {
        match self {
            Self::Function(tool) => Some(tool),
            _ => None,
        }
    }
}

macro_rules! impl_from_tool {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Tool {
                fn from(tool: $ty) -> Self {
                    Self::$variant(tool)
                }
            }
        )*
    };
}

impl_from_tool! {
    Function => FunctionTool,
    FileSearch => FileSearchTool,
    WebSearch => WebSearchTool,
    Computer => ComputerTool,
    CodeInterpreter => CodeInterpreterTool,
    ImageGeneration => ImageGenerationTool,
    LocalShell => LocalShellTool,
    HostedMcp => HostedMcpTool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosted_tools_report_fixed_names() {
        let file: Tool = FileSearchTool::default().into();
        let web: Tool = WebSearchTool::default().into();
        assert_eq!(file.name(), "file_search");
        assert_eq!(web.name(), "web_search_preview");
        assert_eq!(web.kind(), ToolKind::WebSearch);
    }

    #[test]
    fn call_types_map_to_kinds() {
        assert_eq!(
            ToolKind::from_call_type("web_search_call"),
            Some(ToolKind::WebSearch)
        );
        assert_eq!(ToolKind::from_call_type("function_call"), None);
        assert_eq!(ToolKind::CodeInterpreter.to_string(), "code_interpreter");
    }
}
