//! Per-task ring buffer of recent SSE [`Event`]s, enabling replay when a
//! client reconnects with a `Last-Event-ID` header.
//!
//! Mirrors the mutex-guarded-`HashMap` idiom of [`super::task_store::InMemoryTaskStore`]
//! and [`super::event_queue::InMemoryQueueManager`] rather than reaching for
//! an external ring-buffer crate.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::event::{Event, EventIdCounter};

/// Default number of events retained per task for replay.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

struct TaskBuffer {
    events: VecDeque<Event>,
    id_counter: Arc<EventIdCounter>,
}

/// Retains the last `capacity` SSE events per task ID, so a reconnecting
/// client's `Last-Event-ID` can be resolved to a replay window instead of
/// losing everything published while it was disconnected.
pub struct SseBuffer {
    capacity: usize,
    tasks: Mutex<HashMap<String, TaskBuffer>>,
}

impl SseBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }

    /// Returns the id counter shared by all events published for this task,
    /// creating a fresh buffer for the task if this is the first call.
    pub async fn counter_for(&self, task_id: &str) -> Arc<EventIdCounter> {
        let mut tasks = self.tasks.lock().await;
        let buffer = tasks.entry(task_id.to_string()).or_insert_with(|| TaskBuffer {
            events: VecDeque::new(),
            id_counter: Arc::new(EventIdCounter::new()),
        });
        Arc::clone(&buffer.id_counter)
    }

    /// Record an event in the task's ring buffer, evicting the oldest entry
    /// once at capacity.
    pub async fn record(&self, task_id: &str, event: Event) {
        let mut tasks = self.tasks.lock().await;
        let buffer = tasks.entry(task_id.to_string()).or_insert_with(|| TaskBuffer {
            events: VecDeque::new(),
            id_counter: Arc::new(EventIdCounter::new()),
        });
        if buffer.events.len() >= self.capacity {
            buffer.events.pop_front();
        }
        buffer.events.push_back(event);
    }

    /// Return all buffered events for `task_id` with `id` strictly greater
    /// than `last_event_id`, in order. Returns an empty vec if the task has
    /// no buffer, or if `last_event_id` is older than the buffer's retention
    /// window (the caller has no way to tell a true gap from an empty
    /// replay — both come back empty here).
    pub async fn replay_after(&self, task_id: &str, last_event_id: u64) -> Vec<Event> {
        let tasks = self.tasks.lock().await;
        match tasks.get(task_id) {
            Some(buffer) => buffer
                .events
                .iter()
                .filter(|e| e.id > last_event_id)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Drop the buffer for a task, e.g. once it reaches a terminal state and
    /// is no longer subscribable.
    pub async fn clear(&self, task_id: &str) {
        let mut tasks = self.tasks.lock().await;
        tasks.remove(task_id);
    }
}

impl Default for SseBuffer {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
