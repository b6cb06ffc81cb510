//! Per-query structured trace.
//!
//! A bounded in-memory buffer of pipeline stage events, owned by the engine.
//! Subscribers get a snapshot of the whole buffer on every append, which
//! keeps the consumer contract trivial (no cursor management) at the cost of
//! copying, which is acceptable at a 500-event bound. Event ids and timestamps come
//! from one engine-owned source, so buffer order is causal order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Maximum retained events; the oldest is evicted beyond this.
pub const EVENT_LOG_CAPACITY: usize = 500;

/// Stage markers recorded per query.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    QueryStart,
    RetrievalComplete,
    ContextBuilt,
    GenerationComplete,
    GenerationError,
    PolishComplete,
    PolishError,
    QueryComplete,
    Error,
}

/// One structured trace record.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Event {
    /// Monotonic within one engine.
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

type Subscriber = Arc<dyn Fn(&[Event]) + Send + Sync>;

#[derive(Default)]
struct EventLogInner {
    buffer: VecDeque<Event>,
    next_id: u64,
    subscribers: Vec<(u64, Subscriber)>,
    next_subscriber_id: u64,
}

/// Single-writer, multi-reader event buffer.
#[derive(Default)]
pub struct EventLog {
    inner: Mutex<EventLogInner>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and fan a buffer snapshot out to subscribers.
    pub fn append(
        &self,
        event_type: EventType,
        data: serde_json::Value,
        duration: Option<Duration>,
    ) {
        let (snapshot, subscribers) = {
            let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            let id = inner.next_id;
            inner.next_id += 1;
            if inner.buffer.len() == EVENT_LOG_CAPACITY {
                inner.buffer.pop_front();
            }
            inner.buffer.push_back(Event {
                id,
                timestamp: Utc::now(),
                event_type,
                data,
                duration_ms: duration.map(|d| d.as_millis() as u64),
            });
            let snapshot: Vec<Event> = inner.buffer.iter().cloned().collect();
            let subscribers: Vec<Subscriber> =
                inner.subscribers.iter().map(|(_, s)| s.clone()).collect();
            (snapshot, subscribers)
        };
        // Callbacks run outside the lock so a subscriber may re-read the log.
        for subscriber in subscribers {
            subscriber(&snapshot);
        }
    }

    /// Register a callback invoked with a full snapshot on every append.
    /// Returns a token for [`Self::unsubscribe`].
    pub fn subscribe(&self, subscriber: Subscriber) -> u64 {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let token = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;
        inner.subscribers.push((token, subscriber));
        token
    }

    pub fn unsubscribe(&self, token: u64) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.subscribers.retain(|(t, _)| *t != token);
    }

    /// Current buffer contents, oldest first.
    pub fn snapshot(&self) -> Vec<Event> {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.buffer.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("len", &self.len()).finish()
    }
}
