use bakeneko::{
    load_or_create_session_id, AdsMode, AnalyticsQueue, AnalyticsSink, AnalyticsWireEvent,
    InMemoryStore, PageContext, PortalConfig, SdkApiType, TransportFailure, DEBOUNCE_WINDOW_MS,
    SEND_INTERVAL_MS,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

struct SinkState {
    failures_remaining: usize,
    sent: Vec<AnalyticsWireEvent>,
}

#[derive(Clone)]
struct MockSink {
    state: Rc<RefCell<SinkState>>,
}

impl AnalyticsSink for MockSink {
    fn send(&mut self, event: &AnalyticsWireEvent) -> Result<(), TransportFailure> {
        let mut state = self.state.borrow_mut();
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(TransportFailure::Network("offline".to_string()));
        }
        state.sent.push(event.clone());
        Ok(())
    }
}

fn mock_sink(failures_remaining: usize) -> (MockSink, Rc<RefCell<SinkState>>) {
    let state = Rc::new(RefCell::new(SinkState {
        failures_remaining,
        sent: Vec::new(),
    }));
    (
        MockSink {
            state: state.clone(),
        },
        state,
    )
}

fn config() -> PortalConfig {
    PortalConfig::resolve(
        Some("https://api.example.com"),
        &PageContext {
            configured_game_id: Some("kohada".to_string()),
            ..PageContext::default()
        },
        AdsMode::Pseudo,
        SdkApiType::Placement,
    )
}

#[test]
fn duplicate_events_inside_the_window_collapse_to_one() {
    let mut queue = AnalyticsQueue::new(&config(), "sess-1");
    assert!(queue.event("game_start", json!({}), 1_000));
    assert!(!queue.event("game_start", json!({}), 1_000 + DEBOUNCE_WINDOW_MS - 1));
    assert_eq!(queue.buffered().len(), 1);
}

#[test]
fn duplicate_events_past_the_window_both_queue() {
    let mut queue = AnalyticsQueue::new(&config(), "sess-1");
    assert!(queue.event("game_start", json!({}), 1_000));
    assert!(queue.event("game_start", json!({}), 1_000 + DEBOUNCE_WINDOW_MS));
    assert_eq!(queue.buffered().len(), 2);
}

#[test]
fn rejected_duplicates_do_not_extend_the_window() {
    let mut queue = AnalyticsQueue::new(&config(), "sess-1");
    assert!(queue.event("game_start", json!({}), 1_000));
    assert!(!queue.event("game_start", json!({}), 2_000));
    // measured from the accepted event, not the rejected one
    assert!(queue.event("game_start", json!({}), 1_000 + DEBOUNCE_WINDOW_MS));
}

#[test]
fn different_names_are_never_debounced_against_each_other() {
    let mut queue = AnalyticsQueue::new(&config(), "sess-1");
    assert!(queue.event("game_start", json!({}), 1_000));
    assert!(queue.event("game_end", json!({}), 1_001));
    assert_eq!(queue.buffered().len(), 2);
}

#[test]
fn first_event_arms_a_single_flush_timer() {
    let (mut sink, state) = mock_sink(0);
    let mut queue = AnalyticsQueue::new(&config(), "sess-1");
    queue.event("game_start", json!({}), 1_000);
    queue.event("game_end", json!({}), 2_000);
    assert_eq!(queue.flush_due_ms(), Some(1_000 + SEND_INTERVAL_MS));

    queue.tick(&mut sink, 1_000 + SEND_INTERVAL_MS - 1);
    assert!(state.borrow().sent.is_empty());

    queue.tick(&mut sink, 1_000 + SEND_INTERVAL_MS);
    assert_eq!(state.borrow().sent.len(), 2);
    assert!(queue.buffered().is_empty());
    assert_eq!(queue.flush_due_ms(), None);
}

#[test]
fn wire_events_carry_game_session_and_props() {
    let (mut sink, state) = mock_sink(0);
    let mut queue = AnalyticsQueue::new(&config(), "sess-1");
    queue.event("rewarded_result", json!({ "result": "granted" }), 1_000);
    queue.flush(&mut sink);

    let state = state.borrow();
    assert_eq!(state.sent.len(), 1);
    assert_eq!(state.sent[0].game_id, "kohada");
    assert_eq!(state.sent[0].session_id, "sess-1");
    assert_eq!(state.sent[0].event_name, "rewarded_result");
    assert_eq!(state.sent[0].ts, 1_000);
    assert_eq!(state.sent[0].props["result"], "granted");
}

#[test]
fn delivery_failures_are_dropped_not_retried() {
    let (mut sink, state) = mock_sink(1);
    let mut queue = AnalyticsQueue::new(&config(), "sess-1");
    queue.event("game_start", json!({}), 1_000);
    queue.event("game_end", json!({}), 1_500);
    queue.flush(&mut sink);

    // the failed first event is gone; the second still went out
    assert_eq!(state.borrow().sent.len(), 1);
    assert_eq!(state.borrow().sent[0].event_name, "game_end");
    assert!(queue.buffered().is_empty());

    queue.flush(&mut sink);
    assert_eq!(state.borrow().sent.len(), 1);
}

#[test]
fn unconfigured_queue_buffers_but_never_sends() {
    let (mut sink, state) = mock_sink(0);
    let unconfigured = PortalConfig::resolve(
        None,
        &PageContext::default(),
        AdsMode::Pseudo,
        SdkApiType::Placement,
    );
    let mut queue = AnalyticsQueue::new(&unconfigured, "sess-1");
    queue.event("game_start", json!({}), 1_000);
    queue.flush(&mut sink);
    assert!(state.borrow().sent.is_empty());
}

#[test]
fn session_id_is_minted_once_and_reloaded() {
    let mut store = InMemoryStore::new();
    let first = load_or_create_session_id(&mut store);
    let second = load_or_create_session_id(&mut store);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}
