//! Model client trait and the OpenAI HTTP implementation.

pub mod http;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::OpenAiClient;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::convert::Dialect;
use crate::error::RociError;
use crate::types::ModelSettings;

/// A request already rendered into the client's dialect.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub dialect: Dialect,
    /// Model requested by the agent or run; `None` leaves it to the client.
    pub model: Option<String>,
    /// Wire body built by the dialect's converter, without `stream`.
    pub body: serde_json::Value,
    /// Settings the body was built from; clients consult them for
    /// transport-level defaults.
    pub settings: ModelSettings,
}

/// A hosted model API.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Dialect the client speaks; the runner converts requests accordingly.
    fn dialect(&self) -> Dialect;

    /// One complete response body.
    async fn get_response(&self, request: &ModelRequest) -> Result<serde_json::Value, RociError>;

    /// Raw streamed events, in arrival order.
    async fn stream_response(
        &self,
        request: &ModelRequest,
    ) -> Result<BoxStream<'static, Result<serde_json::Value, RociError>>, RociError>;
}
