use crate::config::PortalConfig;
use crate::transport::TransportFailure;
use serde::Serialize;
use serde_json::Value;

/// Shown when a player submits without entering a name.
pub const DEFAULT_NICKNAME: &str = "名無しさん";
/// Leaderboard rows fetched when the caller gives no limit.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankingSubmitRequest {
    #[serde(rename = "gameId")]
    pub game_id: String,
    pub nickname: String,
    pub score: i64,
}

/// Ranking endpoints.
pub trait RankingTransport {
    fn submit(&mut self, request: &RankingSubmitRequest) -> Result<Value, TransportFailure>;
    fn leaderboard(&mut self, game_id: &str, limit: u32) -> Result<Value, TransportFailure>;
}

/// Result of a score submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    pub ok: bool,
    pub error: Option<String>,
}

/// Best-effort score submission and leaderboard reads. Failures degrade to
/// empty results rather than surfacing errors to gameplay.
pub struct RankingClient {
    game_id: String,
    enabled: bool,
}

impl RankingClient {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            game_id: config.game_id.clone(),
            enabled: config.is_configured(),
        }
    }

    pub fn submit(
        &mut self,
        transport: &mut dyn RankingTransport,
        nickname: &str,
        score: i64,
    ) -> SubmitResult {
        if !self.enabled {
            return SubmitResult {
                ok: false,
                error: Some("missing config".to_string()),
            };
        }
        let nickname = if nickname.trim().is_empty() {
            DEFAULT_NICKNAME
        } else {
            nickname.trim()
        };
        let request = RankingSubmitRequest {
            game_id: self.game_id.clone(),
            nickname: nickname.to_string(),
            score,
        };
        match transport.submit(&request) {
            Ok(_) => SubmitResult { ok: true, error: None },
            Err(failure) => SubmitResult {
                ok: false,
                error: Some(failure.to_string()),
            },
        }
    }

    /// Returns leaderboard rows, tolerating the shapes the endpoint has used
    /// over time: a bare array, `{"items": [...]}`, or `{"rankings": [...]}`.
    pub fn leaderboard(
        &mut self,
        transport: &mut dyn RankingTransport,
        limit: Option<u32>,
    ) -> Vec<Value> {
        if !self.enabled {
            return Vec::new();
        }
        let limit = limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
        let body = match transport.leaderboard(&self.game_id, limit) {
            Ok(body) => body,
            Err(_) => return Vec::new(),
        };
        extract_rows(&body)
    }
}

fn extract_rows(body: &Value) -> Vec<Value> {
    if let Some(rows) = body.as_array() {
        return rows.clone();
    }
    for key in ["items", "rankings"] {
        if let Some(rows) = body.get(key).and_then(Value::as_array) {
            return rows.clone();
        }
    }
    Vec::new()
}
