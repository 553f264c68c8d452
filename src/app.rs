use crate::analytics::{load_or_create_session_id, AnalyticsQueue};
use crate::clock::{Clock, SystemClock};
use crate::config::PortalConfig;
use crate::reward::adapter::RewardedAdAdapter;
use crate::reward::sdk::UnavailableSdkPresenter;
use crate::stats::PublicStatsClient;
use crate::store::FileStore;
use crate::support::flow::{FlushTick, SupportEnv, SupportFlow};
use crate::transport::HttpTransport;
use anyhow::{anyhow, Context, Result};
use std::env;

const ENV_STATE_FILE: &str = "BAKENEKO_STATE_FILE";
const DEFAULT_STATE_FILE: &str = ".bakeneko-state.json";

// Give up a flush run after this many consecutive failed campaigns.
const MAX_FLUSH_FAILURES: u32 = 3;

/// Command-line entrypoint: load configuration, report availability and
/// public counters, then drain any support backlog left by earlier runs.
pub fn run() -> Result<()> {
    let config = PortalConfig::from_env();
    if !config.is_configured() {
        return Err(anyhow!(
            "api base and game id are required; set BAKENEKO_API_BASE and BAKENEKO_GAME_ID"
        ));
    }
    let api_base = config
        .api_base
        .clone()
        .context("api base missing after configuration check")?;

    let state_path = env::var(ENV_STATE_FILE).unwrap_or_else(|_| DEFAULT_STATE_FILE.to_string());
    let mut store = FileStore::open(state_path);
    let mut clock = SystemClock;
    let mut transport = HttpTransport::new(api_base.clone())
        .with_context(|| format!("cannot build transport for {api_base}"))?;
    let mut support_transport = transport.clone();
    let mut stats_transport = transport.clone();
    let mut analytics_sink = transport.clone();

    let session_id = load_or_create_session_id(&mut store);
    let mut analytics = AnalyticsQueue::new(&config, session_id);

    let mut adapter = RewardedAdAdapter::new(config.clone());
    adapter.load_ads_config(&mut transport);
    println!(
        "game {} ({} mode): rewarded {}",
        config.game_id,
        config.mode.as_str(),
        if adapter.is_rewarded_available() {
            "available"
        } else {
            "unavailable"
        }
    );

    let mut stats_client = PublicStatsClient::new(&config);
    let now = clock.now_ms();
    let stats = stats_client.get(&mut stats_transport, &mut store, now);
    println!(
        "support today {} / total {}",
        stats.today_support_count, stats.total_support_count
    );

    let mut flow = SupportFlow::new(config);
    flow.adopt_counts(stats.today_support_count, stats.total_support_count);
    let mut presenter = UnavailableSdkPresenter;
    let mut failures = 0u32;
    loop {
        let mut env = SupportEnv {
            store: &mut store,
            reward_transport: &mut transport,
            support_transport: &mut support_transport,
            presenter: &mut presenter,
            analytics: &mut analytics,
            clock: &mut clock,
        };
        match flow.flush_tick(&mut env) {
            FlushTick::Done => break,
            FlushTick::Sent { remaining } => {
                println!("delivered queued support, {remaining} remaining");
            }
            FlushTick::WaitUntil(at_ms) => {
                let now = clock.now_ms();
                clock.sleep_ms(at_ms.saturating_sub(now));
            }
            FlushTick::Failed { wait_ms, .. } => {
                failures += 1;
                if failures >= MAX_FLUSH_FAILURES {
                    println!("support backlog retained; delivery keeps failing");
                    break;
                }
                clock.sleep_ms(wait_ms);
            }
        }
    }

    analytics.flush(&mut analytics_sink);
    Ok(())
}
