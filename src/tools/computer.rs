//! Computer-use tool backed by a local [`Computer`] implementation.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::RociError;
use crate::types::InputItem;

/// Environment the computer runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComputerEnvironment {
    Mac,
    Windows,
    Ubuntu,
    Linux,
    Browser,
}

/// A machine the model can drive through computer-use actions.
#[async_trait]
pub trait Computer: Send + Sync {
    fn environment(&self) -> ComputerEnvironment;

    /// Display size as `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Perform one action (`click`, `type`, `scroll`, ...) and return a PNG
    /// screenshot of the resulting screen.
    async fn execute(&self, action: &serde_json::Value) -> Result<Vec<u8>, RociError>;
}

/// Exposes a [`Computer`] to the model.
#[derive(Clone)]
pub struct ComputerTool {
    computer: Arc<dyn Computer>,
}

impl ComputerTool {
    pub fn new(computer: Arc<dyn Computer>) -> Self {
        Self { computer }
    }

    pub fn environment(&self) -> ComputerEnvironment {
        self.computer.environment()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.computer.dimensions()
    }

    /// Run a `computer_call` action and build its output item.
    pub async fn run_action(
        &self,
        call_id: &str,
        action: &serde_json::Value,
    ) -> Result<InputItem, RociError> {
        let png = self.computer.execute(action).await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(png);
        Ok(InputItem::ComputerCallOutput {
            call_id: call_id.to_string(),
            image_url: format!("data:image/png;base64,{encoded}"),
        })
    }
}

impl std::fmt::Debug for ComputerTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputerTool")
            .field("environment", &self.environment())
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeScreen;

    #[async_trait]
    impl Computer for FakeScreen {
        fn environment(&self) -> ComputerEnvironment {
            ComputerEnvironment::Linux
        }

        fn dimensions(&self) -> (u32, u32) {
            (800, 600)
        }

        async fn execute(&self, _action: &serde_json::Value) -> Result<Vec<u8>, RociError> {
            Ok(vec![1, 2, 3])
        }
    }

    #[tokio::test]
    async fn run_action_returns_screenshot_data_url() {
        let tool = ComputerTool::new(Arc::new(FakeScreen));
        let item = tool
            .run_action("call_7", &serde_json::json!({"type": "click", "x": 1, "y": 2}))
            .await
            .unwrap();

        assert_eq!(
            item,
            InputItem::ComputerCallOutput {
                call_id: "call_7".into(),
                image_url: "data:image/png;base64,AQID".into(),
            }
        );
    }
}
