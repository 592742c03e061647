//! OpenAI client for the Responses and Chat Completions endpoints.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::json;
use tracing::debug;

use super::http::{bearer_headers, shared_client, sse_json_stream, status_to_error};
use super::{ModelClient, ModelRequest};
use crate::config::AgentsConfig;
use crate::convert::Dialect;
use crate::error::RociError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// HTTP client for OpenAI-compatible APIs.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    dialect: Dialect,
    default_model: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("dialect", &self.dialect)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, dialect: Dialect) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            dialect,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Build from layered configuration. An API key is required.
    pub fn from_config(config: &AgentsConfig) -> Result<Self, RociError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            RociError::Authentication("OPENAI_API_KEY is not configured".to_string())
        })?;
        let mut client = Self::new(api_key, config.dialect.unwrap_or_default());
        if let Some(ref url) = config.base_url {
            client = client.with_base_url(url);
        }
        if let Some(ref model) = config.default_model {
            client = client.with_default_model(model);
        }
        Ok(client)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests go to OpenAI itself rather than a compatible server.
    pub fn is_openai(&self) -> bool {
        self.base_url.starts_with("https://api.openai.com")
    }

    fn endpoint(&self) -> String {
        match self.dialect {
            Dialect::Responses => format!("{}/responses", self.base_url),
            Dialect::ChatCompletions => format!("{}/chat/completions", self.base_url),
        }
    }

    /// Final wire body: converter output plus model, stream flag, and the
    /// chat defaults OpenAI applies to Responses implicitly.
    pub fn prepare_body(
        &self,
        request: &ModelRequest,
        stream: bool,
    ) -> Result<serde_json::Value, RociError> {
        if request.dialect != self.dialect {
            return Err(RociError::InvalidState(format!(
                "request rendered for {} sent to a {} client",
                request.dialect, self.dialect
            )));
        }
        let mut body = request.body.clone();
        let obj = body.as_object_mut().ok_or_else(|| {
            RociError::InvalidState("model request body must be a JSON object".to_string())
        })?;

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        obj.insert("model".into(), model.into());
        obj.insert("stream".into(), stream.into());

        if self.dialect == Dialect::ChatCompletions {
            if request.settings.store.is_none() && self.is_openai() {
                obj.insert("store".into(), true.into());
            }
            if stream {
                let include_usage = request
                    .settings
                    .include_usage
                    .or(self.is_openai().then_some(true));
                if let Some(include_usage) = include_usage {
                    obj.insert(
                        "stream_options".into(),
                        json!({ "include_usage": include_usage }),
                    );
                }
            }
        }
        Ok(body)
    }

    async fn send(
        &self,
        request: &ModelRequest,
        stream: bool,
    ) -> Result<reqwest::Response, RociError> {
        let body = self.prepare_body(request, stream)?;
        debug!(
            dialect = %self.dialect,
            model = body.get("model").and_then(|m| m.as_str()).unwrap_or(""),
            stream,
            "OpenAI request"
        );

        let resp = shared_client()
            .post(self.endpoint())
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn get_response(&self, request: &ModelRequest) -> Result<serde_json::Value, RociError> {
        let resp = self.send(request, false).await?;
        Ok(resp.json().await?)
    }

    async fn stream_response(
        &self,
        request: &ModelRequest,
    ) -> Result<BoxStream<'static, Result<serde_json::Value, RociError>>, RociError> {
        let resp = self.send(request, true).await?;
        Ok(sse_json_stream(resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelSettings;

    fn chat_request(settings: ModelSettings) -> ModelRequest {
        ModelRequest {
            dialect: Dialect::ChatCompletions,
            model: None,
            body: json!({ "messages": [] }),
            settings,
        }
    }

    #[test]
    fn chat_defaults_store_and_usage_against_openai() {
        let client = OpenAiClient::new("sk", Dialect::ChatCompletions);
        let body = client
            .prepare_body(&chat_request(ModelSettings::default()), true)
            .unwrap();

        assert_eq!(body["store"], true);
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert_eq!(body["model"], DEFAULT_MODEL);
    }

    #[test]
    fn explicit_settings_and_other_hosts_skip_defaults() {
        let client = OpenAiClient::new("sk", Dialect::ChatCompletions)
            .with_base_url("http://localhost:1234/v1/");
        let body = client
            .prepare_body(&chat_request(ModelSettings::default()), true)
            .unwrap();
        assert!(body.get("store").is_none());
        assert!(body.get("stream_options").is_none());

        let openai = OpenAiClient::new("sk", Dialect::ChatCompletions);
        let settings = ModelSettings::builder()
            .store(false)
            .include_usage(false)
            .build();
        let body = openai.prepare_body(&chat_request(settings), true).unwrap();
        assert!(body.get("store").is_none());
        assert_eq!(body["stream_options"]["include_usage"], false);
    }

    #[test]
    fn dialect_mismatch_is_rejected() {
        let client = OpenAiClient::new("sk", Dialect::Responses);
        let err = client
            .prepare_body(&chat_request(ModelSettings::default()), false)
            .unwrap_err();
        assert!(matches!(err, RociError::InvalidState(_)));
    }
}
