//! SSE event envelope and kind discriminator.
//!
//! Wraps the existing [`StreamResponse`] payloads with the outer envelope
//! needed for SSE replay (`Last-Event-ID`) and heartbeats, neither of which
//! `StreamResponse` carries on its own. [`super::sse_buffer::SseBuffer`]
//! retains recent envelopes so a reconnecting client can resume.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::StreamResponse;

/// Discriminates the kind of payload carried by an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    TaskStatusUpdate,
    TaskArtifactUpdate,
    Message,
    Task,
    Heartbeat,
    ConnectionEstablished,
    ConnectionClosed,
    Error,
}

impl EventKind {
    /// The SSE `event:` field value for this kind.
    pub fn as_sse_event_name(&self) -> &'static str {
        match self {
            EventKind::TaskStatusUpdate => "statusUpdate",
            EventKind::TaskArtifactUpdate => "artifactUpdate",
            EventKind::Message => "message",
            EventKind::Task => "task",
            EventKind::Heartbeat => "heartbeat",
            EventKind::ConnectionEstablished => "connectionEstablished",
            EventKind::ConnectionClosed => "connectionClosed",
            EventKind::Error => "error",
        }
    }
}

/// An SSE envelope: a monotonically increasing id, a kind, an optional
/// `StreamResponse` payload, an optional free-text message (used by
/// `Error`), and a timestamp.
///
/// The `id` is what the client echoes back via `Last-Event-ID` to resume a
/// dropped stream from the connection's ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StreamResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl Event {
    fn new(id: u64, kind: EventKind) -> Self {
        Self {
            id,
            kind,
            data: None,
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Wrap a `StreamResponse` payload, deriving the event kind from its variant.
    pub fn from_stream_response(id: u64, response: StreamResponse) -> Self {
        let kind = match &response {
            StreamResponse::StatusUpdate(_) => EventKind::TaskStatusUpdate,
            StreamResponse::ArtifactUpdate(_) => EventKind::TaskArtifactUpdate,
            StreamResponse::Message(_) => EventKind::Message,
            StreamResponse::Task(_) => EventKind::Task,
        };
        let mut event = Self::new(id, kind);
        event.data = Some(response);
        event
    }

    /// A periodic keep-alive, sent on connections idle past the configured
    /// heartbeat interval.
    pub fn heartbeat(id: u64) -> Self {
        Self::new(id, EventKind::Heartbeat)
    }

    /// Sent once, immediately after an SSE connection is accepted.
    pub fn connection_established(id: u64) -> Self {
        Self::new(id, EventKind::ConnectionEstablished)
    }

    /// Sent once, immediately before an SSE stream closes cleanly.
    pub fn connection_closed(id: u64) -> Self {
        Self::new(id, EventKind::ConnectionClosed)
    }

    /// An in-band error, distinct from a JSON-RPC error response — used when
    /// something goes wrong mid-stream, after the JSON-RPC envelope has
    /// already committed to a 200 SSE response.
    pub fn error(id: u64, message: impl Into<String>) -> Self {
        let mut event = Self::new(id, EventKind::Error);
        event.message = Some(message.into());
        event
    }

    /// Returns `true` if this event should end the SSE stream once sent.
    pub fn is_terminal(&self) -> bool {
        match &self.kind {
            EventKind::ConnectionClosed | EventKind::Error => true,
            EventKind::TaskStatusUpdate => self
                .data
                .as_ref()
                .map(|d| matches!(d, StreamResponse::StatusUpdate(u) if u.r#final))
                .unwrap_or(false),
            EventKind::Message | EventKind::Task => true,
            _ => false,
        }
    }
}

/// Generates monotonically increasing event ids, one counter per SSE
/// connection (or per task, if shared across reconnects via
/// [`super::sse_buffer::SseBuffer`]).
#[derive(Debug, Default)]
pub struct EventIdCounter(AtomicU64);

impl EventIdCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Returns the next id, starting from 1.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}
