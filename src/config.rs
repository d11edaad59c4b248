//! Runtime configuration shared across client and server.
//!
//! No file-format parser is provided — callers build a [`Config`] directly,
//! or load one from `A2A_*` environment variables with
//! [`Config::from_env`]. Matches the defaults the teacher's demos already
//! read loosely from the environment (`PORT`, etc.), now centralized.

use std::env;
use std::time::Duration;

use crate::backoff::BackoffConfig;

/// Rate limiting options for outbound client requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10,
            burst: 20,
        }
    }
}

/// Circuit breaker options for outbound client requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
        }
    }
}

/// Top-level configuration for an A2A client or server.
///
/// Every field has a default matching the values a fresh `Config::default()`
/// produces; `from_env()` overlays `A2A_*` environment variables on top of
/// those defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Per-request deadline before a pending call is canceled with
    /// `AgentUnavailable{reason: "deadline_exceeded"}`.
    pub default_timeout: Duration,

    /// Protocol version advertised in agent cards and checked against peers.
    pub protocol_version: String,

    /// Transport used when a client has no explicit preference. One of
    /// `"JSONRPC"`, `"GRPC"`, `"HTTP+JSON"` — matches the free-form strings
    /// `AgentInterface::transport` already uses on the wire.
    pub default_transport: String,

    /// Whether the server advertises/accepts `message/stream`.
    pub streaming_enabled: bool,

    /// Whether the server advertises/accepts push notification config.
    pub push_notifications_enabled: bool,

    /// Default input MIME types advertised in the agent card.
    pub default_input_modes: Vec<String>,

    /// Default output MIME types advertised in the agent card.
    pub default_output_modes: Vec<String>,

    /// Maximum number of history messages retained per task.
    pub max_history_length: usize,

    /// Maximum entries in the server-side `TtlCache`.
    pub cache_size: usize,

    /// Time-to-live, in seconds, for `TtlCache` entries.
    pub cache_ttl: Duration,

    /// Interval between SSE heartbeat events on an idle connection.
    pub heartbeat_interval: Duration,

    /// Client-side delay before attempting to reconnect a dropped SSE stream.
    pub reconnect_delay: Duration,

    /// Maximum client-side SSE reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,

    pub rate_limit: RateLimitConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: BackoffConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            protocol_version: "0.3.0".to_string(),
            default_transport: "JSONRPC".to_string(),
            streaming_enabled: true,
            push_notifications_enabled: true,
            default_input_modes: vec!["text/plain".to_string()],
            default_output_modes: vec!["text/plain".to_string()],
            max_history_length: 100,
            cache_size: 1000,
            cache_ttl: Duration::from_secs(300),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_delay: Duration::from_millis(3000),
            max_reconnect_attempts: 10,
            rate_limit: RateLimitConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            retry: BackoffConfig::default(),
        }
    }
}

impl Config {
    /// Start from [`Config::default`] and overlay any recognized `A2A_*`
    /// environment variables. Unset or unparseable variables are left at
    /// their default value.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(v) = env_u64("A2A_DEFAULT_TIMEOUT_SECS") {
            config.default_timeout = Duration::from_secs(v);
        }
        if let Ok(v) = env::var("A2A_PROTOCOL_VERSION") {
            config.protocol_version = v;
        }
        if let Ok(v) = env::var("A2A_DEFAULT_TRANSPORT") {
            config.default_transport = v;
        }
        if let Some(v) = env_bool("A2A_STREAMING_ENABLED") {
            config.streaming_enabled = v;
        }
        if let Some(v) = env_bool("A2A_PUSH_NOTIFICATIONS_ENABLED") {
            config.push_notifications_enabled = v;
        }
        if let Some(v) = env_usize("A2A_MAX_HISTORY_LENGTH") {
            config.max_history_length = v;
        }
        if let Some(v) = env_usize("A2A_CACHE_SIZE") {
            config.cache_size = v;
        }
        if let Some(v) = env_u64("A2A_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("A2A_HEARTBEAT_INTERVAL_SECS") {
            config.heartbeat_interval = Duration::from_secs(v);
        }
        if let Some(v) = env_u64("A2A_RECONNECT_DELAY_MS") {
            config.reconnect_delay = Duration::from_millis(v);
        }
        if let Some(v) = env_u32("A2A_MAX_RECONNECT_ATTEMPTS") {
            config.max_reconnect_attempts = v;
        }
        if let Some(v) = env_u32("A2A_RATE_LIMIT_RPS") {
            config.rate_limit.requests_per_second = v;
        }
        if let Some(v) = env_u32("A2A_RATE_LIMIT_BURST") {
            config.rate_limit.burst = v;
        }
        if let Some(v) = env_u32("A2A_CIRCUIT_BREAKER_FAILURE_THRESHOLD") {
            config.circuit_breaker.failure_threshold = v;
        }
        if let Some(v) = env_u64("A2A_CIRCUIT_BREAKER_TIMEOUT_SECS") {
            config.circuit_breaker.open_timeout = Duration::from_secs(v);
        }
        if let Some(v) = env_u32("A2A_RETRY_MAX_ATTEMPTS") {
            config.retry.max_attempts = v;
        }
        if let Some(v) = env_u64("A2A_RETRY_INITIAL_DELAY_MS") {
            config.retry.initial_delay = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("A2A_RETRY_MAX_DELAY_MS") {
            config.retry.max_delay = Duration::from_millis(v);
        }

        config
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|v| match v.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}
