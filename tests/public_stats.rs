use bakeneko::{
    keys, AdsMode, InMemoryStore, PageContext, PortalConfig, PublicStatsClient,
    PublicStatsResponse, SdkApiType, StateStore, StatsTransport, TransportFailure,
    PUBLIC_STATS_CACHE_TTL_MS,
};
use std::cell::RefCell;
use std::rc::Rc;

struct MockState {
    responses: Vec<Result<PublicStatsResponse, TransportFailure>>,
    requests: Vec<String>,
}

#[derive(Clone)]
struct MockStats {
    state: Rc<RefCell<MockState>>,
}

impl StatsTransport for MockStats {
    fn fetch_public_stats(
        &mut self,
        game_id: &str,
    ) -> Result<PublicStatsResponse, TransportFailure> {
        let mut state = self.state.borrow_mut();
        state.requests.push(game_id.to_string());
        state.responses.remove(0)
    }
}

fn mock_stats(
    responses: Vec<Result<PublicStatsResponse, TransportFailure>>,
) -> (MockStats, Rc<RefCell<MockState>>) {
    let state = Rc::new(RefCell::new(MockState {
        responses,
        requests: Vec::new(),
    }));
    (
        MockStats {
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
fn success_maps_counts_and_persists_the_fallback() {
    let (mut transport, state) = mock_stats(vec![Ok(PublicStatsResponse {
        today_support_count: Some(12),
        total_support_count: Some(90),
        total_plays: Some(400),
        total_pv: Some(1_000),
        today_pv: Some(30),
        total_rewards: None,
    })]);
    let mut store = InMemoryStore::new();
    let mut client = PublicStatsClient::new(&config());

    let stats = client.get(&mut transport, &mut store, 0);
    assert_eq!(stats.today_support_count, 12);
    assert_eq!(stats.total_support_count, 90);
    assert_eq!(stats.total_plays, 400);
    assert_eq!(store.get(keys::FALLBACK_TODAY_SUPPORT).as_deref(), Some("12"));
    assert_eq!(state.borrow().requests, vec!["kohada".to_string()]);
}

#[test]
fn legacy_rewards_field_backfills_missing_support_counts() {
    let (mut transport, _state) = mock_stats(vec![Ok(PublicStatsResponse {
        total_rewards: Some(5),
        ..PublicStatsResponse::default()
    })]);
    let mut store = InMemoryStore::new();
    let mut client = PublicStatsClient::new(&config());

    let stats = client.get(&mut transport, &mut store, 0);
    assert_eq!(stats.today_support_count, 5);
    assert_eq!(stats.total_support_count, 5);
}

#[test]
fn fresh_cache_short_circuits_the_network() {
    let (mut transport, state) = mock_stats(vec![
        Ok(PublicStatsResponse {
            today_support_count: Some(1),
            ..PublicStatsResponse::default()
        }),
        Ok(PublicStatsResponse {
            today_support_count: Some(2),
            ..PublicStatsResponse::default()
        }),
    ]);
    let mut store = InMemoryStore::new();
    let mut client = PublicStatsClient::new(&config());

    assert_eq!(client.get(&mut transport, &mut store, 0).today_support_count, 1);
    let cached = client.get(&mut transport, &mut store, PUBLIC_STATS_CACHE_TTL_MS - 1);
    assert_eq!(cached.today_support_count, 1);
    assert_eq!(state.borrow().requests.len(), 1);

    let refreshed = client.get(&mut transport, &mut store, PUBLIC_STATS_CACHE_TTL_MS);
    assert_eq!(refreshed.today_support_count, 2);
    assert_eq!(state.borrow().requests.len(), 2);
}

#[test]
fn failure_falls_back_to_the_persisted_counter() {
    let (mut transport, _state) = mock_stats(vec![Err(TransportFailure::Network(
        "offline".to_string(),
    ))]);
    let mut store = InMemoryStore::new();
    store
        .set(keys::FALLBACK_TODAY_SUPPORT, "9")
        .expect("seed fallback");
    let mut client = PublicStatsClient::new(&config());

    let stats = client.get(&mut transport, &mut store, 0);
    assert_eq!(stats.today_support_count, 9);
    assert_eq!(stats.total_support_count, 9);
    assert_eq!(stats.total_plays, 0);
}

#[test]
fn failure_without_a_fallback_reads_all_zeros() {
    let (mut transport, _state) = mock_stats(vec![Err(TransportFailure::Protocol {
        status: 500,
        detail: "Internal Server Error".to_string(),
    })]);
    let mut store = InMemoryStore::new();
    let mut client = PublicStatsClient::new(&config());
    let stats = client.get(&mut transport, &mut store, 0);
    assert_eq!(stats.today_support_count, 0);
    assert_eq!(stats.total_support_count, 0);
}

#[test]
fn unconfigured_client_returns_zeros_without_calls() {
    let (mut transport, state) = mock_stats(Vec::new());
    let mut store = InMemoryStore::new();
    let unconfigured = PortalConfig::resolve(
        None,
        &PageContext::default(),
        AdsMode::Pseudo,
        SdkApiType::Placement,
    );
    let mut client = PublicStatsClient::new(&unconfigured);
    let stats = client.get(&mut transport, &mut store, 0);
    assert_eq!(stats.today_support_count, 0);
    assert!(state.borrow().requests.is_empty());
}
