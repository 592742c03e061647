//! Local shell tool.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::RociError;

/// A command the model asked to run locally.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalShellCommandRequest {
    #[serde(skip)]
    pub call_id: String,
    pub command: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub working_directory: Option<String>,
}

impl LocalShellCommandRequest {
    /// Decode the `action` object of a `local_shell_call` item.
    pub fn from_action(call_id: &str, action: &serde_json::Value) -> Result<Self, RociError> {
        let mut request: Self = serde_json::from_value(action.clone()).map_err(|e| {
            RociError::ModelBehavior(format!("invalid local shell action: {e}"))
        })?;
        request.call_id = call_id.to_string();
        Ok(request)
    }
}

type LocalShellExecutor = dyn Fn(LocalShellCommandRequest) -> Pin<Box<dyn Future<Output = Result<String, RociError>> + Send>>
    + Send
    + Sync;

/// Lets the model run shell commands through a caller-provided executor.
#[derive(Clone)]
pub struct LocalShellTool {
    executor: Arc<LocalShellExecutor>,
}

impl LocalShellTool {
    pub fn new<F, Fut>(executor: F) -> Self
    where
        F: Fn(LocalShellCommandRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, RociError>> + Send + 'static,
    {
        Self {
            executor: Arc::new(move |request| Box::pin(executor(request))),
        }
    }

    pub async fn execute(&self, request: LocalShellCommandRequest) -> Result<String, RociError> {
        (self.executor)(request).await
    }
}

impl std::fmt::Debug for LocalShellTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalShellTool").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decodes_action_and_runs_executor() {
        let tool = LocalShellTool::new(|req: LocalShellCommandRequest| async move {
            Ok(req.command.join(" "))
        });
        let action = serde_json::json!({
            "type": "exec",
            "command": ["ls", "-la"],
            "env": {},
        });

        let request = LocalShellCommandRequest::from_action("sh_1", &action).unwrap();
        assert_eq!(request.call_id, "sh_1");
        assert_eq!(tool.execute(request).await.unwrap(), "ls -la");
    }

    #[test]
    fn rejects_action_without_command() {
        let err = LocalShellCommandRequest::from_action("sh_1", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, RociError::ModelBehavior(_)));
    }
}
