//! Closure-backed function tools.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::arguments::ToolArguments;
use super::types::AgentToolParameters;
use super::validation::validate_arguments;
use crate::context::RunContext;
use crate::error::RociError;

/// Context available during tool execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub run: RunContext,
    pub tool_name: String,
    pub tool_call_id: String,
}

/// Type alias for the tool handler function.
type ToolHandler = dyn Fn(
        ToolArguments,
        ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, RociError>> + Send>>
    + Send
    + Sync;

/// Turns a tool failure into text returned to the model.
type FailureErrorFunction = dyn Fn(&RociError) -> String + Send + Sync;

/// A tool implemented by a local async function.
///
/// Errors returned by the handler abort the run unless a failure-error
/// function is installed, in which case its text becomes the call output.
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    parameters: AgentToolParameters,
    strict_json_schema: bool,
    handler: Arc<ToolHandler>,
    failure_error_function: Option<Arc<FailureErrorFunction>>,
}

impl FunctionTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: AgentToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, RociError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            strict_json_schema: true,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
            failure_error_function: None,
        }
    }

    pub fn with_strict_json_schema(mut self, strict: bool) -> Self {
        self.strict_json_schema = strict;
        self
    }

    /// Report handler errors to the model instead of failing the run.
    pub fn with_failure_error_function<F>(mut self, f: F) -> Self
    where
        F: Fn(&RociError) -> String + Send + Sync + 'static,
    {
        self.failure_error_function = Some(Arc::new(f));
        self
    }

    /// Use the stock failure message for handler errors.
    pub fn with_default_failure_message(self) -> Self {
        self.with_failure_error_function(|err| {
            format!("An error occurred while running the tool. Please try again. Error: {err}")
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    pub fn strict_json_schema(&self) -> bool {
        self.strict_json_schema
    }

    /// Parse, validate, and run the tool with the model's raw arguments.
    pub async fn invoke(
        &self,
        ctx: ToolContext,
        args_json: &str,
    ) -> Result<serde_json::Value, RociError> {
        let args = ToolArguments::parse(args_json)?;
        validate_arguments(args.raw(), &self.parameters.schema).map_err(|reason| {
            RociError::ModelBehavior(format!(
                "invalid arguments for tool '{}': {reason}",
                self.name
            ))
        })?;
        (self.handler)(args, ctx).await
    }

    /// Model-facing text for a handler error, if a failure function is set.
    pub fn failure_message(&self, err: &RociError) -> Option<String> {
        self.failure_error_function.as_ref().map(|f| f(err))
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("strict_json_schema", &self.strict_json_schema)
            .finish()
    }
}
