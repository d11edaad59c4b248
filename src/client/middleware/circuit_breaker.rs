//! Client-side circuit breaker: stops sending requests to an agent that has
//! been failing, and probes it periodically to see if it has recovered.

use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::config::CircuitBreakerConfig;
use crate::error::{A2AError, A2AResult};
use crate::types::{JsonRpcRequest, JsonRpcResponse};

use super::super::sse::SseStream;
use super::super::transport::Transport;

/// The three states of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests pass through normally.
    Closed,
    /// Requests are rejected without reaching the transport.
    Open,
    /// A single probe request is allowed through to test recovery.
    HalfOpen,
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Wraps a [`Transport`], tripping to [`CircuitState::Open`] after
/// `failure_threshold` consecutive failures and rejecting calls with
/// [`A2AError::AgentUnavailable`] until `open_timeout` has elapsed, at which
/// point a single probe call is let through ([`CircuitState::HalfOpen`]).
/// The probe's outcome closes the circuit again on success or re-opens it on
/// failure.
pub struct CircuitBreakerTransport {
    inner: Box<dyn Transport>,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreakerTransport {
    pub fn new(inner: Box<dyn Transport>, config: CircuitBreakerConfig) -> Self {
        Self {
            inner,
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// Returns the breaker's current state, transitioning `Open` to
    /// `HalfOpen` first if the open timeout has elapsed.
    pub async fn state(&self) -> CircuitState {
        let mut guard = self.state.lock().await;
        self.maybe_half_open(&mut guard);
        guard.state
    }

    fn maybe_half_open(&self, guard: &mut BreakerState) {
        if guard.state == CircuitState::Open {
            if let Some(opened_at) = guard.opened_at {
                if opened_at.elapsed() >= self.config.open_timeout {
                    guard.state = CircuitState::HalfOpen;
                }
            }
        }
    }

    async fn before_call(&self) -> A2AResult<()> {
        let mut guard = self.state.lock().await;
        self.maybe_half_open(&mut guard);
        match guard.state {
            CircuitState::Open => Err(A2AError::agent_unavailable(
                "circuit breaker is open, refusing call",
            )),
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
        }
    }

    async fn record_success(&self) {
        let mut guard = self.state.lock().await;
        guard.consecutive_failures = 0;
        guard.state = CircuitState::Closed;
        guard.opened_at = None;
    }

    async fn record_failure(&self) {
        let mut guard = self.state.lock().await;
        match guard.state {
            CircuitState::HalfOpen => {
                guard.state = CircuitState::Open;
                guard.opened_at = Some(Instant::now());
            }
            CircuitState::Closed => {
                guard.consecutive_failures += 1;
                if guard.consecutive_failures >= self.config.failure_threshold {
                    guard.state = CircuitState::Open;
                    guard.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }
}

#[async_trait]
impl Transport for CircuitBreakerTransport {
    async fn send(&self, request: &JsonRpcRequest) -> A2AResult<JsonRpcResponse> {
        self.before_call().await?;
        match self.inner.send(request).await {
            Ok(response) => {
                self.record_success().await;
                Ok(response)
            }
            Err(e) => {
                self.record_failure().await;
                Err(e)
            }
        }
    }

    async fn send_stream(&self, request: &JsonRpcRequest) -> A2AResult<SseStream> {
        self.before_call().await?;
        match self.inner.send_stream(request).await {
            Ok(stream) => {
                self.record_success().await;
                Ok(stream)
            }
            Err(e) => {
                self.record_failure().await;
                Err(e)
            }
        }
    }

    async fn close(&self) -> A2AResult<()> {
        self.inner.close().await
    }
}
