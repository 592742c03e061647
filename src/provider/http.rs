//! Shared HTTP client, SSE parsing, and auth utilities.

use std::sync::OnceLock;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::RociError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Parse an SSE "data:" line, returning None for "[DONE]" and other fields.
pub fn parse_sse_data(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data == "[DONE]" {
        return None;
    }
    Some(data)
}

/// Map a non-success HTTP status to an error.
pub fn status_to_error(status: u16, body: &str) -> RociError {
    match status {
        401 | 403 => RociError::Authentication(body.to_string()),
        429 => RociError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => RociError::api(status, body),
    }
}

fn extract_retry_after(body: &str) -> Option<u64> {
    // Try to parse retry-after from JSON error body
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}

/// Decode an SSE response body into its JSON `data:` payloads.
pub fn sse_json_stream(
    resp: reqwest::Response,
) -> BoxStream<'static, Result<serde_json::Value, RociError>> {
    decode_sse(resp.bytes_stream().map(|chunk| chunk.map_err(RociError::Network)))
}

/// Decode a chunked SSE byte stream into its JSON `data:` payloads.
///
/// Lines are split on raw bytes and decoded only once complete, so a
/// multi-byte character may straddle chunk boundaries. Multi-line `data:`
/// fields are joined before decoding. The stream ends at `[DONE]` or when
/// the body ends.
pub fn decode_sse<S, B>(chunks: S) -> BoxStream<'static, Result<serde_json::Value, RociError>>
where
    S: Stream<Item = Result<B, RociError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut pending_data: Vec<String> = Vec::new();
        futures::pin_mut!(chunks);

        'outer: while let Some(chunk_result) = chunks.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e);
                    break;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = match std::str::from_utf8(&raw[..line_end]) {
                    Ok(line) => line.trim_end_matches('\r'),
                    Err(e) => {
                        yield Err(RociError::Stream(format!("SSE line is not UTF-8: {e}")));
                        break 'outer;
                    }
                };

                if line.is_empty() {
                    if pending_data.is_empty() {
                        continue;
                    }
                    let data = pending_data.join("\n");
                    pending_data.clear();
                    match serde_json::from_str::<serde_json::Value>(&data) {
                        Ok(event) => yield Ok(event),
                        Err(e) => {
                            tracing::debug!(error = %e, data = %data, "SSE payload is not JSON");
                        }
                    }
                } else if line.starts_with(':') {
                    continue;
                } else if line.trim_start_matches("data:").trim() == "[DONE]" {
                    break 'outer;
                } else if let Some(data) = parse_sse_data(line) {
                    pending_data.push(data.to_string());
                }
            }
        }

        if !pending_data.is_empty() {
            let data = pending_data.join("\n");
            if let Ok(event) = serde_json::from_str::<serde_json::Value>(&data) {
                yield Ok(event);
            }
        }
    };

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sse_data_strips_prefix_and_done() {
        assert_eq!(parse_sse_data("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(parse_sse_data("data:{}"), Some("{}"));
        assert_eq!(parse_sse_data("data: [DONE]"), None);
        assert_eq!(parse_sse_data("event: response.completed"), None);
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(matches!(
            status_to_error(401, "nope"),
            RociError::Authentication(_)
        ));
        assert!(matches!(
            status_to_error(429, r#"{"error":{"retry_after":1.5}}"#),
            RociError::RateLimited {
                retry_after_ms: Some(1500)
            }
        ));
        assert!(status_to_error(503, "down").is_retryable());
    }

    async fn decode_chunks(chunks: Vec<&'static [u8]>) -> Vec<Result<serde_json::Value, RociError>> {
        let source = futures::stream::iter(chunks.into_iter().map(Ok::<_, RociError>));
        decode_sse(source).collect().await
    }

    #[tokio::test]
    async fn character_split_across_chunks_is_reassembled() {
        let line = "data: {\"type\":\"response.output_text.delta\",\"delta\":\"café\"}\n\n";
        let bytes: &'static [u8] = line.as_bytes();
        // 'é' is two bytes; cut between them.
        let split = line.find('é').unwrap() + 1;

        let events = decode_chunks(vec![&bytes[..split], &bytes[split..]]).await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap()["delta"], "café");
    }

    #[tokio::test]
    async fn multi_line_data_and_done_marker() {
        let events = decode_chunks(vec![
            &b": keep-alive\n"[..],
            &b"data: {\"a\":\r\ndata: 1}\r\n\r\n"[..],
            &b"data: [DONE]\n\ndata: {\"b\":2}\n\n"[..],
        ])
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap(), &serde_json::json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_a_stream_error() {
        let events = decode_chunks(vec![&b"data: \xff\xfe\n\n"[..]]).await;
        assert!(matches!(events.as_slice(), [Err(RociError::Stream(_))]));
    }
}
