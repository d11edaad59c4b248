//! Small seam traits for the ambient concerns a host application may want
//! to swap out — clock, logging, metrics, id generation — without touching
//! the A2A protocol logic itself.
//!
//! These are intentionally thin: the crate's own code uses `chrono`/`tracing`/
//! `uuid` directly for its own bookkeeping, matching the teacher. `ports`
//! exists for embedders who need to inject a fake clock in tests or route
//! metrics into their own collector, not as a replacement for those crates.

use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;

/// A source of the current time, abstracted so tests can control it.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Severity levels for [`Logger`], mirroring `tracing`'s levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A logging seam. The default implementation forwards to `tracing`.
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// Forwards to the crate's existing `tracing` spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => debug!("{message}"),
            LogLevel::Info => info!("{message}"),
            LogLevel::Warn => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }
    }
}

/// A metrics seam for counters and observed durations. No-op by default;
/// embedders wire this to their own collector (Prometheus, StatsD, ...).
pub trait Metrics: Send + Sync {
    fn increment_counter(&self, name: &str, value: u64);
    fn observe_duration_ms(&self, name: &str, value_ms: f64);
}

/// A `Metrics` implementation that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn increment_counter(&self, _name: &str, _value: u64) {}
    fn observe_duration_ms(&self, _name: &str, _value_ms: f64) {}
}

/// Generates identifiers for messages, artifacts, and tasks.
pub trait RandomId: Send + Sync {
    fn generate(&self) -> String;
}

/// Generates random UUIDv4 strings, the format used throughout the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRandomId;

impl RandomId for UuidRandomId {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// The composition root: `Config` plus the ambient ports, built once at
/// startup and threaded through explicitly rather than reached for as hidden
/// global state. Tests construct their own `Runtime` with fake ports instead
/// of depending on process-wide statics.
#[derive(Clone)]
pub struct Runtime {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub logger: Arc<dyn Logger>,
    pub metrics: Arc<dyn Metrics>,
    pub random_id: Arc<dyn RandomId>,
}

impl Runtime {
    /// A `Runtime` with the default config and the trivial port
    /// implementations (`SystemClock`, `TracingLogger`, `NoopMetrics`,
    /// `UuidRandomId`).
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            logger: Arc::new(TracingLogger),
            metrics: Arc::new(NoopMetrics),
            random_id: Arc::new(UuidRandomId),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_random_id(mut self, random_id: Arc<dyn RandomId>) -> Self {
        self.random_id = random_id;
        self
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
