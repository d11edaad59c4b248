//! Retries retryable failures with the backoff formula shared with the
//! server's push notification sender.

use async_trait::async_trait;

use crate::backoff::{next_delay, should_retry, BackoffConfig};
use crate::error::A2AResult;
use crate::types::{JsonRpcRequest, JsonRpcResponse};

use super::super::sse::SseStream;
use super::super::transport::Transport;

/// Wraps a [`Transport`], retrying calls that fail with a retryable
/// [`crate::error::A2AError`] (per [`crate::error::A2AError::is_retryable`])
/// up to `config.max_attempts` times, sleeping [`next_delay`] between
/// attempts.
///
/// Streaming calls ([`Transport::send_stream`]) are retried only up to the
/// point the connection is established — once a stream is handed to the
/// caller, mid-stream failures are the caller's concern, matching the
/// teacher's SSE reconnect logic living on the client side rather than here.
pub struct RetryTransport {
    inner: Box<dyn Transport>,
    config: BackoffConfig,
}

impl RetryTransport {
    pub fn new(inner: Box<dyn Transport>, config: BackoffConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Transport for RetryTransport {
    async fn send(&self, request: &JsonRpcRequest) -> A2AResult<JsonRpcResponse> {
        let mut attempt: u32 = 0;
        loop {
            match self.inner.send(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && should_retry(attempt, &self.config) => {
                    attempt += 1;
                    let delay = next_delay(attempt, &self.config, rand::random::<f64>());
                    tracing::debug!(attempt, ?delay, error = %e, "retrying A2A request");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_stream(&self, request: &JsonRpcRequest) -> A2AResult<SseStream> {
        let mut attempt: u32 = 0;
        loop {
            match self.inner.send_stream(request).await {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_retryable() && should_retry(attempt, &self.config) => {
                    attempt += 1;
                    let delay = next_delay(attempt, &self.config, rand::random::<f64>());
                    tracing::debug!(attempt, ?delay, error = %e, "retrying A2A stream request");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn close(&self) -> A2AResult<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::A2AError;
    use crate::types::JsonRpcId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FlakyTransport {
        fail_count: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send(&self, _request: &JsonRpcRequest) -> A2AResult<JsonRpcResponse> {
            if self.fail_count.load(Ordering::SeqCst) > 0 {
                self.fail_count.fetch_sub(1, Ordering::SeqCst);
                return Err(A2AError::Timeout("slow".to_string()));
            }
            Ok(JsonRpcResponse::success(None, serde_json::json!(null)))
        }

        async fn send_stream(&self, _request: &JsonRpcRequest) -> A2AResult<SseStream> {
            unimplemented!("not exercised by these tests")
        }
    }

    fn request() -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(JsonRpcId::Number(1)),
            method: "message/send".to_string(),
            params: None,
        }
    }

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_millis(1),
            multiplier: 1.0,
            max_delay: Duration::from_millis(5),
            max_attempts: 3,
            jitter_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn succeeds_after_retryable_failures() {
        let inner = Box::new(FlakyTransport {
            fail_count: AtomicUsize::new(2),
        });
        let transport = RetryTransport::new(inner, fast_backoff());
        transport.send(&request()).await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let inner = Box::new(FlakyTransport {
            fail_count: AtomicUsize::new(10),
        });
        let transport = RetryTransport::new(inner, fast_backoff());
        let result = transport.send(&request()).await;
        assert!(matches!(result, Err(A2AError::Timeout(_))));
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        struct AlwaysInvalidParams;

        #[async_trait]
        impl Transport for AlwaysInvalidParams {
            async fn send(&self, _request: &JsonRpcRequest) -> A2AResult<JsonRpcResponse> {
                Err(A2AError::invalid_params("bad params"))
            }

            async fn send_stream(&self, _request: &JsonRpcRequest) -> A2AResult<SseStream> {
                unimplemented!("not exercised by this test")
            }
        }

        let transport = RetryTransport::new(Box::new(AlwaysInvalidParams), fast_backoff());
        let result = transport.send(&request()).await;
        assert!(matches!(result, Err(A2AError::InvalidParams { .. })));
    }
}
