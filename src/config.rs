use serde::Deserialize;
use serde_json::{Map, Value};
use std::env;
use url::Url;

/// Game id used when nothing else resolves.
pub const DEFAULT_GAME_ID: &str = "template";

/// Environment variables recognized by the portal core.
pub const ENV_API_BASE: &str = "BAKENEKO_API_BASE";
pub const ENV_GAME_ID: &str = "BAKENEKO_GAME_ID";
pub const ENV_USE_REAL_ADS: &str = "BAKENEKO_USE_REAL_ADS";
pub const ENV_REWARDED_API_TYPE: &str = "BAKENEKO_REWARDED_API_TYPE";

/// Selects the pseudo reward flow (loading gate, no SDK) or a real ad SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdsMode {
    Pseudo,
    Real,
}

impl AdsMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AdsMode::Pseudo => "pseudo",
            AdsMode::Real => "real",
        }
    }
}

/// Integration style of the installed ad SDK binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkApiType {
    /// Placement-style call with viewed/dismissed/break-done callbacks.
    Placement,
    /// Simple object with complete/close/error callbacks.
    Simple,
}

/// Where the effective game id came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameIdSource {
    Configured,
    PageMetadata,
    PathInferred,
    Fallback,
}

impl GameIdSource {
    pub fn as_str(self) -> &'static str {
        match self {
            GameIdSource::Configured => "configured",
            GameIdSource::PageMetadata => "page_metadata",
            GameIdSource::PathInferred => "path_inferred",
            GameIdSource::Fallback => "fallback",
        }
    }
}

/// Page-level inputs available for game-id resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub configured_game_id: Option<String>,
    /// Content of the `bakeneko:gameId` page metadata entry.
    pub meta_game_id: Option<String>,
    /// Value of a `data-bakeneko-game-id` attribute, if any element carries one.
    pub data_attribute_game_id: Option<String>,
    /// Page path, e.g. `/games/kohada/index.html`.
    pub path: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolves the game id with the fixed precedence: explicit configuration,
/// page metadata (meta entry, then data attribute), path segment after
/// `/games/`, then the fixed fallback.
pub fn resolve_game_id(ctx: &PageContext) -> (String, GameIdSource) {
    if let Some(id) = non_empty(&ctx.configured_game_id) {
        return (id, GameIdSource::Configured);
    }
    if let Some(id) = non_empty(&ctx.meta_game_id) {
        return (id, GameIdSource::PageMetadata);
    }
    if let Some(id) = non_empty(&ctx.data_attribute_game_id) {
        return (id, GameIdSource::PageMetadata);
    }
    if let Some(path) = ctx.path.as_deref() {
        if let Some(rest) = path.split("/games/").nth(1) {
            let segment = rest.split('/').next().unwrap_or("");
            if !segment.is_empty() {
                return (segment.to_string(), GameIdSource::PathInferred);
            }
        }
    }
    (DEFAULT_GAME_ID.to_string(), GameIdSource::Fallback)
}

/// Normalizes an API base: origin plus path with trailing slashes stripped.
/// Unparseable non-empty input degrades to plain trailing-slash trimming;
/// empty input means "not configured".
pub fn normalize_api_base(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match Url::parse(trimmed) {
        Ok(url) if !url.cannot_be_a_base() => {
            let origin = url.origin().ascii_serialization();
            if origin == "null" {
                return Some(trimmed.trim_end_matches('/').to_string());
            }
            let path = url.path().trim_end_matches('/');
            Some(format!("{origin}{path}"))
        }
        _ => Some(trimmed.trim_end_matches('/').to_string()),
    }
}

/// Effective client configuration. Absence of the API base degrades every
/// network operation to a safe local no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub api_base: Option<String>,
    pub game_id: String,
    pub game_id_source: GameIdSource,
    pub mode: AdsMode,
    pub sdk_api_type: SdkApiType,
}

impl PortalConfig {
    pub fn resolve(
        raw_api_base: Option<&str>,
        ctx: &PageContext,
        mode: AdsMode,
        sdk_api_type: SdkApiType,
    ) -> Self {
        let api_base = raw_api_base.and_then(normalize_api_base);
        let (game_id, game_id_source) = resolve_game_id(ctx);
        Self {
            api_base,
            game_id,
            game_id_source,
            mode,
            sdk_api_type,
        }
    }

    /// Reads the recognized globals from the environment.
    pub fn from_env() -> Self {
        let raw_base = env::var(ENV_API_BASE).ok();
        let ctx = PageContext {
            configured_game_id: env::var(ENV_GAME_ID).ok(),
            ..PageContext::default()
        };
        let mode = match env::var(ENV_USE_REAL_ADS) {
            Ok(value) if value.eq_ignore_ascii_case("true") => AdsMode::Real,
            _ => AdsMode::Pseudo,
        };
        let sdk_api_type = match env::var(ENV_REWARDED_API_TYPE) {
            Ok(value) if value.eq_ignore_ascii_case("simple") => SdkApiType::Simple,
            _ => SdkApiType::Placement,
        };
        Self::resolve(raw_base.as_deref(), &ctx, mode, sdk_api_type)
    }

    /// True when network operations can be attempted at all.
    pub fn is_configured(&self) -> bool {
        self.api_base.is_some() && !self.game_id.is_empty()
    }
}

/// Server-side ads configuration from `GET /api/ads-config`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AdsConfig {
    #[serde(default)]
    pub banner: String,
    #[serde(default)]
    pub rewarded: String,
    #[serde(default)]
    pub placements: Map<String, Value>,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            banner: "off".to_string(),
            rewarded: "off".to_string(),
            placements: Map::new(),
        }
    }
}

impl AdsConfig {
    pub fn rewarded_enabled(&self) -> bool {
        self.rewarded == "on"
    }
}
