use crate::analytics::AnalyticsQueue;
use crate::clock::Clock;
use crate::config::{AdsConfig, AdsMode, PortalConfig};
use crate::logging::{DiagnosticsLog, LogLevel};
use crate::reward::sdk::{AdOutcome, AdPresenter, SdkSession};
use crate::reward::verification::{
    NonceOutcome, NonceVerificationClient, RewardTransport, AD_NETWORK_REAL,
};
use serde_json::json;
use std::mem;

/// Pseudo mode shows a loading gate this long between nonce and verify.
pub const PSEUDO_LOADING_MS: u64 = 5_000;
/// Hard ceiling on one reward session, whatever phase it is stuck in.
pub const REWARD_TIMEOUT_MS: u64 = 90_000;
/// Failed attempts refuse new sessions locally for this long.
pub const COOLDOWN_MS: u64 = 5_000;
/// Poll pacing used by the synchronous convenience driver.
pub const POLL_INTERVAL_MS: u64 = 50;

/// Reasons safe to surface to UI copy. Anything else reads as empty.
pub const FAILURE_REASON_ALLOWLIST: &[&str] = &[
    "missing_nonce",
    "nonexistent_nonce",
    "invalid_or_used_nonce",
    "game_id_mismatch",
    "attempts_exceeded",
    "used_token",
    "missing_token",
    "verification_failed",
    "rate_limited",
    "unknown_reason",
];

/// UX-facing classification of a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Transient,
    UserAction,
    Suspicious,
    Unknown,
}

impl FailureCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureCategory::Transient => "transient",
            FailureCategory::UserAction => "user_action",
            FailureCategory::Suspicious => "suspicious",
            FailureCategory::Unknown => "unknown",
        }
    }
}

/// Telemetry rendering of a session result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardResult {
    Granted,
    Skipped,
    SdkError,
}

impl RewardResult {
    pub fn as_str(self) -> &'static str {
        match self {
            RewardResult::Granted => "granted",
            RewardResult::Skipped => "skipped",
            RewardResult::SdkError => "sdk_error",
        }
    }
}

/// Internal per-session result captured before categorization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SessionResult {
    success: bool,
    reason: String,
    was_429: bool,
    timeout: bool,
    sdk_error: bool,
}

impl SessionResult {
    fn granted() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn failed(reason: &str) -> Self {
        Self {
            reason: reason.to_string(),
            ..Self::default()
        }
    }

    fn rate_limited() -> Self {
        Self {
            was_429: true,
            reason: "rate_limited".to_string(),
            ..Self::default()
        }
    }

    fn timed_out() -> Self {
        Self {
            timeout: true,
            ..Self::default()
        }
    }

    fn sdk_error() -> Self {
        Self {
            sdk_error: true,
            ..Self::default()
        }
    }

    fn telemetry_result(&self) -> RewardResult {
        if self.success {
            RewardResult::Granted
        } else if self.sdk_error {
            RewardResult::SdkError
        } else {
            RewardResult::Skipped
        }
    }
}

/// Categorization rule, applied once per settled session.
fn infer_category(result: &SessionResult) -> FailureCategory {
    if result.was_429 || result.reason == "rate_limited" {
        return FailureCategory::Suspicious;
    }
    if result.timeout {
        return FailureCategory::Transient;
    }
    if result.reason == "missing_token" {
        return FailureCategory::UserAction;
    }
    match result.reason.as_str() {
        "missing_nonce" | "nonexistent_nonce" | "invalid_or_used_nonce" | "verification_failed"
        | "attempts_exceeded" => FailureCategory::Transient,
        _ => FailureCategory::Unknown,
    }
}

/// Session phases between the suspension points.
#[derive(Debug, Clone)]
enum RewardPhase {
    Idle,
    NoncePending,
    PseudoLoading { nonce: String, until_ms: u64 },
    Displaying { nonce: String, session: SdkSession },
    VerifyPending { nonce: String, token: Option<String> },
}

/// Disposition of a reward request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardRequest {
    /// A fresh session started; drive it with `advance`.
    Started,
    /// A session is already in flight; this caller observes its settlement.
    Joined,
    /// Inside the cooldown window: resolved not-granted without any I/O.
    CooldownRefused,
}

/// Presents exactly one reward opportunity per session and enforces the
/// contract that only a server-verified view grants a reward. Never panics,
/// never errors out to callers: every session settles to a boolean.
pub struct RewardedAdAdapter {
    config: PortalConfig,
    ads_config: AdsConfig,
    nonce_client: NonceVerificationClient,
    phase: RewardPhase,
    started_at_ms: u64,
    deadline_ms: u64,
    waiters: u32,
    cooldown_until_ms: u64,
    last_failure_category: Option<FailureCategory>,
    last_failure_reason: Option<String>,
    telemetry_sent: bool,
    diagnostics: DiagnosticsLog,
}

impl RewardedAdAdapter {
    pub fn new(config: PortalConfig) -> Self {
        let nonce_client = NonceVerificationClient::new(&config);
        let mut diagnostics = DiagnosticsLog::new();
        diagnostics.log_once(
            "game_id_resolution",
            LogLevel::Info,
            "resolved game id",
            &[
                ("game_id", config.game_id.as_str()),
                ("source", config.game_id_source.as_str()),
            ],
        );
        Self {
            config,
            ads_config: AdsConfig::default(),
            nonce_client,
            phase: RewardPhase::Idle,
            started_at_ms: 0,
            deadline_ms: 0,
            waiters: 0,
            cooldown_until_ms: 0,
            last_failure_category: None,
            last_failure_reason: None,
            telemetry_sent: false,
            diagnostics,
        }
    }

    /// Fetches the server ads configuration; failure degrades to rewarded-off.
    pub fn load_ads_config(&mut self, transport: &mut dyn RewardTransport) {
        if !self.config.is_configured() {
            return;
        }
        self.ads_config = transport
            .fetch_ads_config(&self.config.game_id)
            .unwrap_or_default();
    }

    pub fn is_rewarded_available(&self) -> bool {
        match self.config.mode {
            AdsMode::Pseudo => self.config.is_configured(),
            AdsMode::Real => self.ads_config.rewarded_enabled() && !self.config.game_id.is_empty(),
        }
    }

    pub fn in_flight(&self) -> bool {
        !matches!(self.phase, RewardPhase::Idle)
    }

    pub fn cooldown_remaining_ms(&self, now_ms: u64) -> u64 {
        self.cooldown_until_ms.saturating_sub(now_ms)
    }

    pub fn last_failure_category(&self) -> Option<FailureCategory> {
        self.last_failure_category
    }

    /// Last server reason, filtered through the allow-list.
    pub fn last_failure_reason(&self) -> &str {
        match self.last_failure_reason.as_deref() {
            Some(reason) if FAILURE_REASON_ALLOWLIST.contains(&reason) => reason,
            _ => "",
        }
    }

    pub fn diagnostics(&self) -> &DiagnosticsLog {
        &self.diagnostics
    }

    /// Requests a reward opportunity. Joins the in-flight session when one
    /// exists; refuses locally inside the cooldown window.
    pub fn request(&mut self, now_ms: u64) -> RewardRequest {
        if self.in_flight() {
            self.waiters += 1;
            return RewardRequest::Joined;
        }
        if now_ms < self.cooldown_until_ms {
            return RewardRequest::CooldownRefused;
        }
        self.telemetry_sent = false;
        self.started_at_ms = now_ms;
        self.deadline_ms = now_ms + REWARD_TIMEOUT_MS;
        self.waiters = 1;
        self.phase = RewardPhase::NoncePending;
        RewardRequest::Started
    }

    /// Drives the in-flight session across at most one suspension point.
    /// Returns the settled grant decision once the session finishes; all
    /// joined callers observe that same settlement. Past the deadline the
    /// session settles as a timeout and late results are discarded.
    pub fn advance(
        &mut self,
        transport: &mut dyn RewardTransport,
        presenter: &mut dyn AdPresenter,
        analytics: &mut AnalyticsQueue,
        now_ms: u64,
    ) -> Option<bool> {
        if !self.in_flight() {
            return None;
        }
        if now_ms >= self.deadline_ms {
            return Some(self.settle(SessionResult::timed_out(), analytics, now_ms));
        }
        let phase = mem::replace(&mut self.phase, RewardPhase::Idle);
        match phase {
            RewardPhase::Idle => None,
            RewardPhase::NoncePending => match self.nonce_client.get_nonce(transport) {
                NonceOutcome::Issued(nonce) => {
                    self.phase = match self.config.mode {
                        AdsMode::Pseudo => RewardPhase::PseudoLoading {
                            nonce,
                            until_ms: now_ms + PSEUDO_LOADING_MS,
                        },
                        AdsMode::Real => {
                            self.diagnostics.log_once(
                                "rewarded_sdk_probe",
                                LogLevel::Info,
                                "probing rewarded sdk",
                                &[("api_type", match self.config.sdk_api_type {
                                    crate::config::SdkApiType::Placement => "placement",
                                    crate::config::SdkApiType::Simple => "simple",
                                })],
                            );
                            RewardPhase::Displaying {
                                nonce,
                                session: SdkSession::begin(now_ms),
                            }
                        }
                    };
                    None
                }
                NonceOutcome::RateLimited => {
                    Some(self.settle(SessionResult::rate_limited(), analytics, now_ms))
                }
                NonceOutcome::Missing | NonceOutcome::Failed => {
                    Some(self.settle(SessionResult::failed(""), analytics, now_ms))
                }
            },
            RewardPhase::PseudoLoading { nonce, until_ms } => {
                if now_ms >= until_ms {
                    self.phase = RewardPhase::VerifyPending { nonce, token: None };
                } else {
                    self.phase = RewardPhase::PseudoLoading { nonce, until_ms };
                }
                None
            }
            RewardPhase::Displaying { nonce, mut session } => {
                match presenter.display(&mut session, now_ms) {
                    Some(AdOutcome::Viewed { token }) => {
                        self.phase = RewardPhase::VerifyPending { nonce, token };
                        None
                    }
                    Some(AdOutcome::Dismissed) => {
                        Some(self.settle(SessionResult::failed("missing_token"), analytics, now_ms))
                    }
                    Some(AdOutcome::Error(_)) => {
                        Some(self.settle(SessionResult::sdk_error(), analytics, now_ms))
                    }
                    None => {
                        self.phase = RewardPhase::Displaying { nonce, session };
                        None
                    }
                }
            }
            RewardPhase::VerifyPending { nonce, token } => {
                let ad_network = match self.config.mode {
                    AdsMode::Real => Some(AD_NETWORK_REAL),
                    AdsMode::Pseudo => None,
                };
                let decision =
                    self.nonce_client
                        .verify_reward(transport, &nonce, token.as_deref(), ad_network);
                let result = if decision.granted {
                    SessionResult::granted()
                } else if decision.reason == "rate_limited" {
                    SessionResult::rate_limited()
                } else {
                    SessionResult::failed(&decision.reason)
                };
                Some(self.settle(result, analytics, now_ms))
            }
        }
    }

    /// Synchronous convenience driver: request, then poll to settlement.
    pub fn run_rewarded(
        &mut self,
        transport: &mut dyn RewardTransport,
        presenter: &mut dyn AdPresenter,
        analytics: &mut AnalyticsQueue,
        clock: &mut dyn Clock,
    ) -> bool {
        let now = clock.now_ms();
        if matches!(self.request(now), RewardRequest::CooldownRefused) {
            return false;
        }
        loop {
            let now = clock.now_ms();
            if let Some(granted) = self.advance(transport, presenter, analytics, now) {
                return granted;
            }
            clock.sleep_ms(POLL_INTERVAL_MS);
        }
    }

    fn settle(
        &mut self,
        result: SessionResult,
        analytics: &mut AnalyticsQueue,
        now_ms: u64,
    ) -> bool {
        self.phase = RewardPhase::Idle;
        self.waiters = 0;
        self.send_result_telemetry(&result, analytics, now_ms);
        if result.success {
            self.last_failure_category = None;
            self.last_failure_reason = None;
            self.cooldown_until_ms = 0;
            return true;
        }
        self.last_failure_category = Some(infer_category(&result));
        self.last_failure_reason = if result.reason.is_empty() {
            None
        } else {
            Some(result.reason.clone())
        };
        self.cooldown_until_ms = now_ms + COOLDOWN_MS;
        false
    }

    /// Sends the per-session `rewarded_result` event at most once. The guard
    /// resets only when a fresh session starts.
    fn send_result_telemetry(
        &mut self,
        result: &SessionResult,
        analytics: &mut AnalyticsQueue,
        now_ms: u64,
    ) {
        if self.telemetry_sent {
            return;
        }
        self.telemetry_sent = true;
        let props = json!({
            "gameId": self.config.game_id,
            "mode": self.config.mode.as_str(),
            "result": result.telemetry_result().as_str(),
            "ms": now_ms.saturating_sub(self.started_at_ms),
            "source": "adapter",
        });
        analytics.event_undebounced("rewarded_result", props, now_ms);
    }
}
