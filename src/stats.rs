use crate::config::PortalConfig;
use crate::store::{keys, StateStore};
use crate::transport::{PublicStatsResponse, TransportFailure};

/// Cached public stats are reused for this long before refetching.
pub const PUBLIC_STATS_CACHE_TTL_MS: u64 = 60_000;

/// Public stats endpoint.
pub trait StatsTransport {
    fn fetch_public_stats(
        &mut self,
        game_id: &str,
    ) -> Result<PublicStatsResponse, TransportFailure>;
}

/// Counts shown on the portal page. Missing server fields collapse to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicStats {
    pub today_support_count: u64,
    pub total_support_count: u64,
    pub total_plays: u64,
    pub total_pv: u64,
    pub today_pv: u64,
}

/// Fetches display counters with a short-lived cache and a persisted local
/// fallback so the meter never renders blank after a prior success.
pub struct PublicStatsClient {
    game_id: String,
    enabled: bool,
    cache: Option<PublicStats>,
    cache_at_ms: u64,
}

impl PublicStatsClient {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            game_id: config.game_id.clone(),
            enabled: config.is_configured(),
            cache: None,
            cache_at_ms: 0,
        }
    }

    /// Returns stats, preferring the fresh cache, then the network, then the
    /// persisted fallback counter. Never fails; worst case is all zeros.
    pub fn get(
        &mut self,
        transport: &mut dyn StatsTransport,
        store: &mut dyn StateStore,
        now_ms: u64,
    ) -> PublicStats {
        if !self.enabled {
            return PublicStats::default();
        }
        if let Some(cached) = self.cache {
            if now_ms.saturating_sub(self.cache_at_ms) < PUBLIC_STATS_CACHE_TTL_MS {
                return cached;
            }
        }
        match transport.fetch_public_stats(&self.game_id) {
            Ok(response) => {
                // Older deployments reported rewards instead of supports.
                let today = response
                    .today_support_count
                    .or(response.total_rewards)
                    .unwrap_or(0);
                let stats = PublicStats {
                    today_support_count: today,
                    total_support_count: response.total_support_count.unwrap_or(today),
                    total_plays: response.total_plays.unwrap_or(0),
                    total_pv: response.total_pv.unwrap_or(0),
                    today_pv: response.today_pv.unwrap_or(0),
                };
                let _ = store.set(keys::FALLBACK_TODAY_SUPPORT, &today.to_string());
                self.cache = Some(stats);
                self.cache_at_ms = now_ms;
                stats
            }
            Err(_) => {
                let fallback = store
                    .get(keys::FALLBACK_TODAY_SUPPORT)
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .unwrap_or(0);
                PublicStats {
                    today_support_count: fallback,
                    total_support_count: fallback,
                    ..PublicStats::default()
                }
            }
        }
    }
}
