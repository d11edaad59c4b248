//! Token-bucket rate limiting for outbound client requests.

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};

use crate::config::RateLimitConfig;
use crate::error::{A2AError, A2AResult};
use crate::types::{JsonRpcRequest, JsonRpcResponse};

use super::super::sse::SseStream;
use super::super::transport::Transport;

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Wraps a [`Transport`], rejecting calls with
/// [`A2AError::RateLimitExceeded`] once the configured token bucket is
/// exhausted, instead of queuing or blocking the caller.
pub struct RateLimitTransport {
    inner: Box<dyn Transport>,
    limiter: DirectRateLimiter,
}

impl RateLimitTransport {
    pub fn new(inner: Box<dyn Transport>, config: RateLimitConfig) -> Self {
        let per_second = NonZeroU32::new(config.requests_per_second.max(1))
            .unwrap_or(NonZeroU32::new(1).unwrap());
        let burst = NonZeroU32::new(config.burst.max(1)).unwrap_or(per_second);
        let quota = Quota::per_second(per_second).allow_burst(burst);
        Self {
            inner,
            limiter: RateLimiter::direct(quota),
        }
    }

    fn check(&self) -> A2AResult<()> {
        self.limiter
            .check()
            .map_err(|_not_until| A2AError::rate_limit_exceeded("client-side rate limit exceeded"))
    }
}

#[async_trait]
impl Transport for RateLimitTransport {
    async fn send(&self, request: &JsonRpcRequest) -> A2AResult<JsonRpcResponse> {
        self.check()?;
        self.inner.send(request).await
    }

    async fn send_stream(&self, request: &JsonRpcRequest) -> A2AResult<SseStream> {
        self.check()?;
        self.inner.send_stream(request).await
    }

    async fn close(&self) -> A2AResult<()> {
        self.inner.close().await
    }
}
