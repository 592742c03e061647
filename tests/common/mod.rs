//! Shared test helpers and a scripted model client.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{json, Value};

use roci_agents::convert::Dialect;
use roci_agents::error::RociError;
use roci_agents::provider::{ModelClient, ModelRequest};

/// One scripted model turn.
enum Scripted {
    Body(Value),
    Error(RociError),
}

/// A model client that replays canned Responses bodies in order.
///
/// Streamed calls turn each body into `response.output_text.delta` events
/// followed by `response.completed`. Every request body is recorded.
pub struct MockModelClient {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<Value>>,
    delay: Option<Duration>,
}

impl MockModelClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue(self, body: Value) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Body(body));
        self
    }

    pub fn queue_error(self, err: RociError) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Error(err));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Request bodies received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &ModelRequest) -> Result<Value, RociError> {
        self.requests.lock().unwrap().push(request.body.clone());
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Body(body)) => Ok(body),
            Some(Scripted::Error(err)) => Err(err),
            None => Err(RociError::InvalidState(
                "mock model client ran out of scripted responses".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    fn dialect(&self) -> Dialect {
        Dialect::Responses
    }

    async fn get_response(&self, request: &ModelRequest) -> Result<Value, RociError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next(request)
    }

    async fn stream_response(
        &self,
        request: &ModelRequest,
    ) -> Result<BoxStream<'static, Result<Value, RociError>>, RociError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let body = self.next(request)?;
        Ok(Box::pin(futures::stream::iter(
            stream_events(&body).into_iter().map(Ok),
        )))
    }
}

/// Responses SSE events equivalent to `body`.
pub fn stream_events(body: &Value) -> Vec<Value> {
    let mut events = vec![json!({ "type": "response.created", "response": { "id": body["id"] } })];
    for item in body["output"].as_array().into_iter().flatten() {
        if item["type"] == "message" {
            for part in item["content"].as_array().into_iter().flatten() {
                events.push(json!({
                    "type": "response.output_text.delta",
                    "delta": part["text"],
                }));
            }
        }
    }
    events.push(json!({ "type": "response.completed", "response": body }));
    events
}

pub fn message(text: &str) -> Value {
    json!({
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "output_text", "text": text }],
    })
}

pub fn function_call(call_id: &str, name: &str, arguments: Value) -> Value {
    json!({
        "type": "function_call",
        "call_id": call_id,
        "name": name,
        "arguments": arguments.to_string(),
    })
}

/// A complete Responses body with fixed usage of 10 in / 5 out.
pub fn response(id: &str, output: Vec<Value>) -> Value {
    json!({
        "id": id,
        "output": output,
        "usage": { "input_tokens": 10, "output_tokens": 5, "total_tokens": 15 },
    })
}

pub fn text_response(id: &str, text: &str) -> Value {
    response(id, vec![message(text)])
}
