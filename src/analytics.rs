use crate::config::PortalConfig;
use crate::store::{keys, StateStore};
use crate::transport::{AnalyticsWireEvent, TransportFailure};
use serde_json::Value;
use uuid::Uuid;

/// Buffered events are flushed this long after the first one arrives.
pub const SEND_INTERVAL_MS: u64 = 5_000;
/// Identical `(session, name)` pairs inside this window collapse to one.
pub const DEBOUNCE_WINDOW_MS: u64 = 2_000;

/// Delivery target for analytics events. Failures are always swallowed by the
/// queue; the sink only reports them for the caller's own bookkeeping.
pub trait AnalyticsSink {
    fn send(&mut self, event: &AnalyticsWireEvent) -> Result<(), TransportFailure>;
}

/// One queued event, pre-serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub ts: u64,
    pub props: Value,
}

/// Best-effort, debounced telemetry queue. Never blocks gameplay: delivery
/// failures are discarded and nothing is retried.
#[derive(Debug, Clone)]
pub struct AnalyticsQueue {
    game_id: String,
    session_id: String,
    enabled: bool,
    buffer: Vec<AnalyticsEvent>,
    flush_due_ms: Option<u64>,
    last_event_key: String,
    last_event_ts: u64,
}

impl AnalyticsQueue {
    pub fn new(config: &PortalConfig, session_id: impl Into<String>) -> Self {
        Self {
            game_id: config.game_id.clone(),
            session_id: session_id.into(),
            enabled: config.is_configured(),
            buffer: Vec::new(),
            flush_due_ms: None,
            last_event_key: String::new(),
            last_event_ts: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Queues an event unless an identical `(session, name)` fired within the
    /// debounce window. Returns whether the event was accepted. The single
    /// flush timer is armed by the first buffered event.
    pub fn event(&mut self, name: &str, props: Value, now_ms: u64) -> bool {
        let key = format!("{}:{}", self.session_id, name);
        if key == self.last_event_key && now_ms.saturating_sub(self.last_event_ts) < DEBOUNCE_WINDOW_MS
        {
            return false;
        }
        self.last_event_key = key;
        self.last_event_ts = now_ms;
        self.push(name, props, now_ms);
        true
    }

    /// Queues an event bypassing the debounce filter. Used for per-session
    /// result events that carry their own send-once guard upstream.
    pub fn event_undebounced(&mut self, name: &str, props: Value, now_ms: u64) {
        self.push(name, props, now_ms);
    }

    fn push(&mut self, name: &str, props: Value, now_ms: u64) {
        self.buffer.push(AnalyticsEvent {
            name: name.to_string(),
            ts: now_ms,
            props,
        });
        if self.flush_due_ms.is_none() {
            self.flush_due_ms = Some(now_ms + SEND_INTERVAL_MS);
        }
    }

    /// Flushes when the timer has elapsed. Call from the caller's idle loop.
    pub fn tick(&mut self, sink: &mut dyn AnalyticsSink, now_ms: u64) {
        if matches!(self.flush_due_ms, Some(due) if now_ms >= due) {
            self.flush(sink);
        }
    }

    /// Immediate best-effort drain (page hide / unload path). Events are sent
    /// individually; failures are dropped silently.
    pub fn flush(&mut self, sink: &mut dyn AnalyticsSink) {
        self.flush_due_ms = None;
        for event in self.buffer.drain(..) {
            if !self.enabled {
                continue;
            }
            let wire = AnalyticsWireEvent {
                game_id: self.game_id.clone(),
                session_id: self.session_id.clone(),
                event_name: event.name,
                ts: event.ts,
                props: event.props,
            };
            let _ = sink.send(&wire);
        }
    }

    /// Events waiting for the next flush, oldest first.
    pub fn buffered(&self) -> &[AnalyticsEvent] {
        &self.buffer
    }

    /// Absolute time of the pending timer flush, if one is armed.
    pub fn flush_due_ms(&self) -> Option<u64> {
        self.flush_due_ms
    }
}

/// Loads the per-session analytics id, minting and persisting one on first
/// use. Storage failures fall back to an ephemeral id.
pub fn load_or_create_session_id(store: &mut dyn StateStore) -> String {
    if let Some(existing) = store.get(keys::SESSION_ID) {
        if !existing.is_empty() {
            return existing;
        }
    }
    let fresh = Uuid::new_v4().to_string();
    let _ = store.set(keys::SESSION_ID, &fresh);
    fresh
}
