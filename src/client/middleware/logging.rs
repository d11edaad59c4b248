//! Structured request/response logging with credential redaction.
//!
//! Logs the method name and a redacted view of the request params and
//! response/error at `debug` level. Object keys matching
//! `password|secret|token|key|credential` (case-insensitive) have their
//! string values redacted to their first and last four characters; shorter
//! values are redacted entirely.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::error::A2AResult;
use crate::types::{JsonRpcRequest, JsonRpcResponse};

use super::super::sse::SseStream;
use super::super::transport::Transport;

const REDACT_PLACEHOLDER: &str = "***";

fn sensitive_key_pattern() -> Regex {
    Regex::new(r"(?i)password|secret|token|key|credential").expect("static pattern is valid")
}

fn redact_string(value: &str) -> String {
    if value.len() <= 8 {
        REDACT_PLACEHOLDER.to_string()
    } else {
        format!("{}...{}", &value[..4], &value[value.len() - 4..])
    }
}

/// Recursively redact string values of object fields whose key matches the
/// sensitive-key pattern.
fn redact_value(value: &Value, pattern: &Regex) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    if pattern.is_match(k) {
                        let redacted = match v {
                            Value::String(s) => Value::String(redact_string(s)),
                            _ => Value::String(REDACT_PLACEHOLDER.to_string()),
                        };
                        (k.clone(), redacted)
                    } else {
                        (k.clone(), redact_value(v, pattern))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| redact_value(v, pattern)).collect())
        }
        other => other.clone(),
    }
}

/// Wraps a [`Transport`], logging every call's method name and a
/// credential-redacted view of its params/result via `tracing`.
pub struct LoggingTransport {
    inner: Box<dyn Transport>,
    sensitive_keys: Regex,
}

impl LoggingTransport {
    pub fn new(inner: Box<dyn Transport>) -> Self {
        Self {
            inner,
            sensitive_keys: sensitive_key_pattern(),
        }
    }

    fn redacted_params(&self, request: &JsonRpcRequest) -> Value {
        request
            .params
            .as_ref()
            .map(|p| redact_value(p, &self.sensitive_keys))
            .unwrap_or(Value::Null)
    }
}

#[async_trait]
impl Transport for LoggingTransport {
    async fn send(&self, request: &JsonRpcRequest) -> A2AResult<JsonRpcResponse> {
        tracing::debug!(
            method = %request.method,
            params = %self.redacted_params(request),
            "sending A2A request"
        );
        let result = self.inner.send(request).await;
        match &result {
            Ok(response) => tracing::debug!(
                method = %request.method,
                error = response.error.is_some(),
                "received A2A response"
            ),
            Err(e) => tracing::warn!(method = %request.method, error = %e, "A2A request failed"),
        }
        result
    }

    async fn send_stream(&self, request: &JsonRpcRequest) -> A2AResult<SseStream> {
        tracing::debug!(
            method = %request.method,
            params = %self.redacted_params(request),
            "opening A2A stream"
        );
        let result = self.inner.send_stream(request).await;
        if let Err(e) = &result {
            tracing::warn!(method = %request.method, error = %e, "A2A stream request failed");
        }
        result
    }

    async fn close(&self) -> A2AResult<()> {
        self.inner.close().await
    }
}
