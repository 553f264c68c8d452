use crate::config::{AdsConfig, PortalConfig};
use crate::transport::{
    call_with_network_retry, NonceRequest, NonceResponse, TransportFailure, VerifyRequest,
    VerifyResponse,
};

/// Ad network reported when a real SDK produced a completion token.
pub const AD_NETWORK_REAL: &str = "adsense";
/// Ad network reported by the pseudo flow (no token).
pub const AD_NETWORK_PSEUDO: &str = "pseudo";

/// Reward-verification endpoints. The HTTP binding lives in `transport`;
/// tests install scripted implementations.
pub trait RewardTransport {
    fn fetch_nonce(&mut self, request: &NonceRequest) -> Result<NonceResponse, TransportFailure>;
    fn verify(&mut self, request: &VerifyRequest) -> Result<VerifyResponse, TransportFailure>;
    fn fetch_ads_config(&mut self, game_id: &str) -> Result<AdsConfig, TransportFailure>;
}

/// Result of a nonce request, keeping the rate-limit signal distinct so the
/// adapter can categorize the session failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonceOutcome {
    Issued(String),
    /// The server answered without a usable nonce.
    Missing,
    RateLimited,
    /// Network or protocol failure after the retry policy ran.
    Failed,
}

/// Server verdict on a completed view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyDecision {
    pub granted: bool,
    /// Server-provided reason; empty when absent or malformed.
    pub reason: String,
}

/// Issues single-use nonces and verifies completion tokens server-side. The
/// client never grants a reward locally.
#[derive(Debug, Clone)]
pub struct NonceVerificationClient {
    game_id: String,
    enabled: bool,
}

impl NonceVerificationClient {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            game_id: config.game_id.clone(),
            enabled: config.is_configured(),
        }
    }

    /// Requests a nonce. A 429 is authoritative and fails immediately; a
    /// network-level failure is retried exactly once.
    pub fn get_nonce(&self, transport: &mut dyn RewardTransport) -> NonceOutcome {
        if !self.enabled {
            return NonceOutcome::Failed;
        }
        let request = NonceRequest {
            game_id: self.game_id.clone(),
        };
        match call_with_network_retry(|_attempt| transport.fetch_nonce(&request)) {
            Ok(NonceResponse { nonce: Some(nonce) }) if !nonce.is_empty() => {
                NonceOutcome::Issued(nonce)
            }
            Ok(_) => NonceOutcome::Missing,
            Err(TransportFailure::RateLimited) => NonceOutcome::RateLimited,
            Err(_) => NonceOutcome::Failed,
        }
    }

    /// Submits the nonce plus completion token for verification. Applies the
    /// same 429-no-retry / network-retry-once policy; 429 maps to
    /// `rate_limited`, malformed or failed responses to an empty reason.
    pub fn verify_reward(
        &self,
        transport: &mut dyn RewardTransport,
        nonce: &str,
        token: Option<&str>,
        ad_network: Option<&str>,
    ) -> VerifyDecision {
        if !self.enabled || nonce.is_empty() {
            return VerifyDecision::default();
        }
        let network = ad_network.unwrap_or(if token.is_some() {
            AD_NETWORK_REAL
        } else {
            AD_NETWORK_PSEUDO
        });
        let request = VerifyRequest {
            game_id: self.game_id.clone(),
            nonce: nonce.to_string(),
            ad_network: network.to_string(),
            token: token.unwrap_or("").to_string(),
        };
        match call_with_network_retry(|_attempt| transport.verify(&request)) {
            Ok(response) => VerifyDecision {
                granted: response.granted,
                reason: response.reason.unwrap_or_default(),
            },
            Err(TransportFailure::RateLimited) => VerifyDecision {
                granted: false,
                reason: "rate_limited".to_string(),
            },
            Err(_) => VerifyDecision::default(),
        }
    }
}
