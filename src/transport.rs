use crate::analytics::AnalyticsSink;
use crate::config::AdsConfig;
use crate::ranking::{RankingSubmitRequest, RankingTransport};
use crate::reward::verification::RewardTransport;
use crate::stats::StatsTransport;
use crate::support::flow::SupportTransport;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Classified failure for every portal HTTP call. Retry and categorization
/// logic operates on this data instead of inspecting exception shapes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportFailure {
    /// HTTP 429. Authoritative; never retried client-side.
    #[error("rate limited")]
    RateLimited,
    /// The request failed before any HTTP response arrived.
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx/non-429 response, or a response body that failed to decode.
    #[error("protocol error: status {status}: {detail}")]
    Protocol { status: u16, detail: String },
}

impl TransportFailure {
    pub fn is_network(&self) -> bool {
        matches!(self, TransportFailure::Network(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportFailure::RateLimited)
    }
}

/// Runs `call`, retrying exactly once when the failure is network-level (no
/// HTTP response received). Rate limits and protocol errors are authoritative
/// and returned as-is. The attempt index is passed through for diagnostics.
pub fn call_with_network_retry<T, F>(mut call: F) -> Result<T, TransportFailure>
where
    F: FnMut(u32) -> Result<T, TransportFailure>,
{
    match call(0) {
        Err(failure) if failure.is_network() => call(1),
        other => other,
    }
}

// ---- wire bodies -----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NonceRequest {
    #[serde(rename = "gameId")]
    pub game_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NonceResponse {
    #[serde(default)]
    pub nonce: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyRequest {
    #[serde(rename = "gameId")]
    pub game_id: String,
    pub nonce: String,
    #[serde(rename = "adNetwork")]
    pub ad_network: String,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub granted: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncrementRequest {
    #[serde(rename = "gameId")]
    pub game_id: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IncrementResponse {
    #[serde(rename = "todaySupportCount", default)]
    pub today_support_count: Option<u64>,
    #[serde(rename = "totalSupportCount", default)]
    pub total_support_count: Option<u64>,
    #[serde(default)]
    pub idempotency_replay: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsWireEvent {
    pub game_id: String,
    pub session_id: String,
    pub event_name: String,
    pub ts: u64,
    pub props: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PublicStatsResponse {
    #[serde(rename = "totalPlays", default)]
    pub total_plays: Option<u64>,
    #[serde(rename = "totalPv", default)]
    pub total_pv: Option<u64>,
    #[serde(rename = "todayPv", default)]
    pub today_pv: Option<u64>,
    #[serde(rename = "todaySupportCount", default)]
    pub today_support_count: Option<u64>,
    #[serde(rename = "totalSupportCount", default)]
    pub total_support_count: Option<u64>,
    /// Legacy field some deployments still report instead of the daily count.
    #[serde(rename = "totalRewards", default)]
    pub total_rewards: Option<u64>,
}

// ---- HTTP binding ----------------------------------------------------------

const NONCE_PATH: &str = "/api/reward/nonce";
const VERIFY_PATH: &str = "/api/reward/verify";
const INCREMENT_PATH: &str = "/api/support/increment";
const ANALYTICS_PATH: &str = "/api/analytics/event";
const ADS_CONFIG_PATH: &str = "/api/ads-config";
const PUBLIC_STATS_PATH: &str = "/api/public-stats";
const RANKING_SUBMIT_PATH: &str = "/api/ranking/submit";
const RANKING_LEADERBOARD_PATH: &str = "/api/ranking/leaderboard";

/// Blocking HTTP transport targeting the portal API and translating every
/// response into the classified failure contract.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: String,
}

impl HttpTransport {
    /// Creates a transport for the normalized API base (no trailing slash).
    pub fn new(base: impl Into<String>) -> Result<Self, TransportFailure> {
        let base = base.into();
        if base.trim().is_empty() {
            return Err(TransportFailure::Network(
                "api base must not be empty".to_string(),
            ));
        }
        let client = Client::builder().build().map_err(|err| {
            TransportFailure::Network(format!("http client build failed: {err}"))
        })?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), path)
    }

    fn query_url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, TransportFailure> {
        let mut url = Url::parse(&self.endpoint(path))
            .map_err(|err| TransportFailure::Network(format!("bad api base: {err}")))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    fn decode<R: DeserializeOwned>(response: Response) -> Result<R, TransportFailure> {
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(TransportFailure::RateLimited);
        }
        if !status.is_success() {
            return Err(TransportFailure::Protocol {
                status: status.as_u16(),
                detail: status.canonical_reason().unwrap_or("error").to_string(),
            });
        }
        response.json().map_err(|err| TransportFailure::Protocol {
            status: status.as_u16(),
            detail: format!("decode failed: {err}"),
        })
    }

    fn post_json<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, TransportFailure> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .map_err(|err| TransportFailure::Network(err.to_string()))?;
        Self::decode(response)
    }

    fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<R, TransportFailure> {
        let url = self.query_url(path, query)?;
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| TransportFailure::Network(err.to_string()))?;
        Self::decode(response)
    }
}

impl RewardTransport for HttpTransport {
    fn fetch_nonce(&mut self, request: &NonceRequest) -> Result<NonceResponse, TransportFailure> {
        self.post_json(NONCE_PATH, request)
    }

    fn verify(&mut self, request: &VerifyRequest) -> Result<VerifyResponse, TransportFailure> {
        self.post_json(VERIFY_PATH, request)
    }

    fn fetch_ads_config(&mut self, game_id: &str) -> Result<AdsConfig, TransportFailure> {
        self.get_json(ADS_CONFIG_PATH, &[("game", game_id)])
    }
}

impl SupportTransport for HttpTransport {
    fn increment(&mut self, request: &IncrementRequest) -> Result<IncrementResponse, TransportFailure> {
        self.post_json(INCREMENT_PATH, request)
    }
}

impl AnalyticsSink for HttpTransport {
    fn send(&mut self, event: &AnalyticsWireEvent) -> Result<(), TransportFailure> {
        // Fire-and-forget: the response body is never inspected.
        let response = self
            .client
            .post(self.endpoint(ANALYTICS_PATH))
            .json(event)
            .send()
            .map_err(|err| TransportFailure::Network(err.to_string()))?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(TransportFailure::RateLimited);
        }
        if !status.is_success() {
            return Err(TransportFailure::Protocol {
                status: status.as_u16(),
                detail: status.canonical_reason().unwrap_or("error").to_string(),
            });
        }
        Ok(())
    }
}

impl StatsTransport for HttpTransport {
    fn fetch_public_stats(&mut self, game_id: &str) -> Result<PublicStatsResponse, TransportFailure> {
        self.get_json(PUBLIC_STATS_PATH, &[("gameId", game_id)])
    }
}

impl RankingTransport for HttpTransport {
    fn submit(&mut self, request: &RankingSubmitRequest) -> Result<Value, TransportFailure> {
        self.post_json(RANKING_SUBMIT_PATH, request)
    }

    fn leaderboard(&mut self, game_id: &str, limit: u32) -> Result<Value, TransportFailure> {
        let limit = limit.to_string();
        self.get_json(
            RANKING_LEADERBOARD_PATH,
            &[("gameId", game_id), ("limit", limit.as_str())],
        )
    }
}
