use crate::analytics::AnalyticsQueue;
use crate::clock::Clock;
use crate::config::PortalConfig;
use crate::reward::adapter::RewardedAdAdapter;
use crate::reward::sdk::AdPresenter;
use crate::reward::verification::RewardTransport;
use crate::store::{keys, StateStore};
use crate::support::lock::{LockToken, SupportLock};
use crate::support::queue::{
    clear_backoff, load_backoff, load_queue, next_backoff, push_entry, save_backoff, save_queue,
    SupportQueueEntry, BACKOFF_BASE_MS, BACKOFF_CEILING_MS,
};
use crate::transport::{IncrementRequest, IncrementResponse, TransportFailure};
use serde_json::json;
use uuid::Uuid;

/// Entries delivered per flush batch.
pub const FLUSH_BATCH_SIZE: usize = 3;
/// Pacing gap between successful sends, to avoid bursting the server.
pub const FLUSH_PACING_MS: u64 = 500;

/// Support increment endpoint.
pub trait SupportTransport {
    fn increment(&mut self, request: &IncrementRequest)
        -> Result<IncrementResponse, TransportFailure>;
}

/// Everything the support flow talks to, bundled so call sites stay readable.
pub struct SupportEnv<'a> {
    pub store: &'a mut dyn StateStore,
    pub reward_transport: &'a mut dyn RewardTransport,
    pub support_transport: &'a mut dyn SupportTransport,
    pub presenter: &'a mut dyn AdPresenter,
    pub analytics: &'a mut AnalyticsQueue,
    pub clock: &'a mut dyn Clock,
}

/// Support counters shown on the meter. `None` until a server value or local
/// fallback has been learned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportCounters {
    pub today: Option<u64>,
    pub total: Option<u64>,
}

impl SupportCounters {
    /// Server counts are authoritative; when the response omits them the
    /// local value is bumped by one. The drift this can cause across devices
    /// is accepted, documented behavior.
    fn apply_increment(&mut self, response: &IncrementResponse) {
        if let Some(today) = response.today_support_count {
            self.today = Some(today);
            self.total = Some(
                response
                    .total_support_count
                    .unwrap_or_else(|| self.total.unwrap_or(0)),
            );
        } else {
            self.today = Some(self.today.unwrap_or(0) + 1);
            self.total = Some(self.total.unwrap_or(0) + 1);
        }
    }
}

/// Why a support flow did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupportRefusal {
    AlreadyProcessing,
    FlushInProgress,
    AlreadySupportedThisPlay,
    LockHeldElsewhere,
    NotConfigured,
}

/// Result of one support attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportOutcome {
    /// A guard refused the flow; nothing happened.
    Refused(SupportRefusal),
    /// The reward flow settled not-granted; generic failure messaging.
    NotGranted,
    /// The increment reached the server.
    Confirmed { replayed: bool },
    /// The increment was queued for later delivery. The user is told their
    /// support was saved, not that an error occurred.
    Queued { saved: bool, queue_len: usize },
}

/// Progress report from one flush tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTick {
    /// Backlog is empty; nothing to do.
    Done,
    /// Waiting for a backoff window, pacing gap, or a foreign lock to expire.
    WaitUntil(u64),
    /// One entry delivered; `remaining` are still queued.
    Sent { remaining: usize },
    /// Delivery failed; the entry went back to the front and the campaign
    /// stopped until `retry_at_ms`.
    Failed { wait_ms: u64, retry_at_ms: u64 },
}

#[derive(Debug)]
struct FlushCampaign {
    batch_remaining: usize,
    not_before_ms: u64,
    token: LockToken,
}

/// Orchestrates the "thank-you support" flow: reward gate, idempotent
/// increment, durable offline queue with batched, backed-off flushing.
pub struct SupportFlow {
    config: PortalConfig,
    lock: SupportLock,
    counters: SupportCounters,
    processing: bool,
    flushing: bool,
    flush_backoff_ms: u64,
    campaign: Option<FlushCampaign>,
}

impl SupportFlow {
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            lock: SupportLock::new(),
            counters: SupportCounters::default(),
            processing: false,
            flushing: false,
            flush_backoff_ms: BACKOFF_BASE_MS,
            campaign: None,
        }
    }

    pub fn counters(&self) -> SupportCounters {
        self.counters
    }

    /// Seeds the meter from public stats (displayed before any increment).
    pub fn adopt_counts(&mut self, today: u64, total: u64) {
        self.counters.today = Some(today);
        self.counters.total = Some(total);
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// Runs one support attempt end to end. Guards, then the reward flow,
    /// then the increment; a delivery failure queues the increment instead
    /// of surfacing an error.
    pub fn start(
        &mut self,
        reward: &mut RewardedAdAdapter,
        env: &mut SupportEnv<'_>,
    ) -> SupportOutcome {
        if self.processing {
            return SupportOutcome::Refused(SupportRefusal::AlreadyProcessing);
        }
        if self.flushing {
            return SupportOutcome::Refused(SupportRefusal::FlushInProgress);
        }
        if has_supported_current_play(env.store) {
            return SupportOutcome::Refused(SupportRefusal::AlreadySupportedThisPlay);
        }
        let now = env.clock.now_ms();
        let Some(token) = self.lock.try_acquire(env.store, now) else {
            return SupportOutcome::Refused(SupportRefusal::LockHeldElsewhere);
        };
        self.processing = true;
        self.telemetry(env, "support_cta_click", json!({}));
        if !self.config.is_configured() {
            self.telemetry(env, "support_increment_fail", json!({}));
            self.finish(env.store, &token);
            return SupportOutcome::Refused(SupportRefusal::NotConfigured);
        }

        let granted =
            reward.run_rewarded(env.reward_transport, env.presenter, env.analytics, env.clock);
        if !granted {
            self.telemetry(env, "support_increment_fail", json!({}));
            self.finish(env.store, &token);
            return SupportOutcome::NotGranted;
        }
        self.telemetry(env, "reward_granted", json!({}));

        let now = env.clock.now_ms();
        self.lock.renew(env.store, &token, now);
        // One key per logical increment; a queued replay reuses it.
        let idempotency_key = Uuid::new_v4().to_string();
        let request = IncrementRequest {
            game_id: self.config.game_id.clone(),
            idempotency_key: idempotency_key.clone(),
        };
        match env.support_transport.increment(&request) {
            Ok(response) => {
                let replayed = response.idempotency_replay;
                if replayed {
                    self.telemetry(env, "idempotency_replay", json!({ "replayed": true }));
                }
                self.apply_increment_response(env.store, &response);
                mark_supported_current_play(env.store);
                self.telemetry(env, "support_increment_success", json!({}));
                self.finish(env.store, &token);
                SupportOutcome::Confirmed { replayed }
            }
            Err(_) => {
                let (queue_len, saved) = push_entry(
                    env.store,
                    SupportQueueEntry {
                        game_id: self.config.game_id.clone(),
                        idempotency_key,
                    },
                );
                self.telemetry(env, "support_queue_len", json!({ "value": queue_len }));
                self.telemetry(env, "support_increment_queued", json!({}));
                self.finish(env.store, &token);
                SupportOutcome::Queued { saved, queue_len }
            }
        }
    }

    /// Advances backlog delivery by at most one send. Callers (page load,
    /// post-support idle loop) invoke this repeatedly; `WaitUntil` tells them
    /// when to come back.
    pub fn flush_tick(&mut self, env: &mut SupportEnv<'_>) -> FlushTick {
        let now = env.clock.now_ms();
        if self.campaign.is_none() {
            let queue = load_queue(env.store);
            if queue.is_empty() {
                clear_backoff(env.store);
                self.flushing = false;
                return FlushTick::Done;
            }
            if !self.config.is_configured() {
                return FlushTick::Done;
            }
            if let Some(backoff) = load_backoff(env.store, now) {
                self.flush_backoff_ms = backoff.backoff_ms;
                return FlushTick::WaitUntil(backoff.until_ms);
            }
            let Some(token) = self.lock.try_acquire(env.store, now) else {
                return FlushTick::WaitUntil(now + self.lock.ttl_ms());
            };
            self.flushing = true;
            self.campaign = Some(FlushCampaign {
                batch_remaining: FLUSH_BATCH_SIZE,
                not_before_ms: now,
                token,
            });
        }
        let Some(mut campaign) = self.campaign.take() else {
            return FlushTick::Done;
        };
        if now < campaign.not_before_ms {
            let at = campaign.not_before_ms;
            self.campaign = Some(campaign);
            return FlushTick::WaitUntil(at);
        }
        let mut queue = load_queue(env.store);
        if queue.is_empty() {
            self.finish_campaign(env.store, &campaign.token);
            return FlushTick::Done;
        }
        self.lock.renew(env.store, &campaign.token, now);
        let entry = queue.remove(0);
        let request = IncrementRequest {
            game_id: entry.game_id.clone(),
            idempotency_key: entry.idempotency_key.clone(),
        };
        match env.support_transport.increment(&request) {
            Ok(response) => {
                if response.idempotency_replay {
                    self.telemetry(env, "idempotency_replay", json!({ "replayed": true }));
                }
                self.apply_increment_response(env.store, &response);
                save_queue(env.store, &queue);
                campaign.batch_remaining -= 1;
                if queue.is_empty() {
                    self.telemetry(env, "support_flush_result", json!({ "result": "success" }));
                    self.finish_campaign(env.store, &campaign.token);
                    return FlushTick::Sent { remaining: 0 };
                }
                if campaign.batch_remaining == 0 {
                    self.telemetry(env, "support_flush_result", json!({ "result": "success" }));
                    campaign.batch_remaining = FLUSH_BATCH_SIZE;
                }
                campaign.not_before_ms = now + FLUSH_PACING_MS;
                let remaining = queue.len();
                self.campaign = Some(campaign);
                FlushTick::Sent { remaining }
            }
            Err(_) => {
                queue.insert(0, entry);
                save_queue(env.store, &queue);
                let wait_ms = self.flush_backoff_ms.clamp(BACKOFF_BASE_MS, BACKOFF_CEILING_MS);
                self.flush_backoff_ms = next_backoff(wait_ms);
                save_backoff(env.store, self.flush_backoff_ms, now + wait_ms);
                self.telemetry(env, "support_flush_result", json!({ "result": "fail" }));
                self.lock.release(env.store, &campaign.token);
                self.flushing = false;
                FlushTick::Failed {
                    wait_ms,
                    retry_at_ms: now + wait_ms,
                }
            }
        }
    }

    fn finish(&mut self, store: &mut dyn StateStore, token: &LockToken) {
        self.processing = false;
        self.lock.release(store, token);
    }

    fn finish_campaign(&mut self, store: &mut dyn StateStore, token: &LockToken) {
        save_queue(store, &[]);
        clear_backoff(store);
        self.flush_backoff_ms = BACKOFF_BASE_MS;
        self.flushing = false;
        self.lock.release(store, token);
    }

    fn apply_increment_response(&mut self, store: &mut dyn StateStore, response: &IncrementResponse) {
        self.counters.apply_increment(response);
        if let Some(today) = self.counters.today {
            let _ = store.set(keys::FALLBACK_TODAY_SUPPORT, &today.to_string());
        }
    }

    fn telemetry(&mut self, env: &mut SupportEnv<'_>, name: &str, props: serde_json::Value) {
        let now = env.clock.now_ms();
        env.analytics.event_undebounced(name, props, now);
    }
}

/// Stable id for the current play session, minted on first use.
pub fn current_play_id(store: &mut dyn StateStore) -> String {
    if let Some(existing) = store.get(keys::PLAY_ID) {
        if !existing.is_empty() {
            return existing;
        }
    }
    let fresh = Uuid::new_v4().to_string();
    let _ = store.set(keys::PLAY_ID, &fresh);
    fresh
}

/// Begins a new play session, re-enabling one support for it.
pub fn start_new_play(store: &mut dyn StateStore) -> String {
    store.remove(keys::PLAY_ID);
    current_play_id(store)
}

/// True when the current play already produced a successful support.
pub fn has_supported_current_play(store: &mut dyn StateStore) -> bool {
    let Some(done) = store.get(keys::SUPPORTED_PLAY_ID) else {
        return false;
    };
    !done.is_empty() && done == current_play_id(store)
}

fn mark_supported_current_play(store: &mut dyn StateStore) {
    let play_id = current_play_id(store);
    let _ = store.set(keys::SUPPORTED_PLAY_ID, &play_id);
}
