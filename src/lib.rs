//! Reward and support reliability layer for the portal's browser games:
//! rewarded-ad gating with server-side nonce verification, idempotent
//! support increments with a durable offline queue, and loss-tolerant
//! analytics batching.

pub mod analytics;
pub mod app;
pub mod clock;
pub mod config;
pub mod logging;
pub mod ranking;
pub mod reward;
pub mod stats;
pub mod store;
pub mod support;
pub mod transport;

pub use analytics::{
    load_or_create_session_id, AnalyticsEvent, AnalyticsQueue, AnalyticsSink, DEBOUNCE_WINDOW_MS,
    SEND_INTERVAL_MS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    normalize_api_base, resolve_game_id, AdsConfig, AdsMode, GameIdSource, PageContext,
    PortalConfig, SdkApiType, DEFAULT_GAME_ID,
};
pub use logging::{DiagnosticsLog, LogLevel};
pub use ranking::{
    RankingClient, RankingSubmitRequest, RankingTransport, SubmitResult, DEFAULT_LEADERBOARD_LIMIT,
    DEFAULT_NICKNAME,
};
pub use reward::adapter::{
    FailureCategory, RewardRequest, RewardResult, RewardedAdAdapter, COOLDOWN_MS,
    FAILURE_REASON_ALLOWLIST, PSEUDO_LOADING_MS, REWARD_TIMEOUT_MS,
};
pub use reward::sdk::{
    AdOutcome, AdPresenter, SdkEvent, SdkPhase, SdkSession, UnavailableSdkPresenter,
    PLACEMENT_SETTLE_TIMEOUT_MS, SDK_WAIT_MAX_MS,
};
pub use reward::verification::{
    NonceOutcome, NonceVerificationClient, RewardTransport, VerifyDecision, AD_NETWORK_PSEUDO,
    AD_NETWORK_REAL,
};
pub use stats::{PublicStats, PublicStatsClient, StatsTransport, PUBLIC_STATS_CACHE_TTL_MS};
pub use store::{keys, read_ms, FileStore, InMemoryStore, StateStore, StoreError};
pub use support::flow::{
    current_play_id, has_supported_current_play, start_new_play, FlushTick, SupportCounters,
    SupportEnv, SupportFlow, SupportOutcome, SupportRefusal, SupportTransport, FLUSH_BATCH_SIZE,
    FLUSH_PACING_MS,
};
pub use support::lock::{LockToken, SupportLock, SUPPORT_LOCK_TTL_MS};
pub use support::queue::{
    load_queue, push_entry, save_queue, BackoffState, SupportQueueEntry, BACKOFF_BASE_MS,
    BACKOFF_CEILING_MS, MAX_QUEUE_LENGTH, QUOTA_TRIM_LENGTH,
};
pub use transport::{
    call_with_network_retry, AnalyticsWireEvent, HttpTransport, IncrementRequest,
    IncrementResponse, NonceRequest, NonceResponse, PublicStatsResponse, TransportFailure,
    VerifyRequest, VerifyResponse,
};
