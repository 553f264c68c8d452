use bakeneko::{
    normalize_api_base, resolve_game_id, AdsMode, GameIdSource, PageContext, PortalConfig,
    SdkApiType, DEFAULT_GAME_ID,
};

#[test]
fn api_base_trailing_slashes_are_stripped() {
    assert_eq!(
        normalize_api_base("https://api.example.com/"),
        Some("https://api.example.com".to_string())
    );
    assert_eq!(
        normalize_api_base("https://api.example.com/v1/"),
        Some("https://api.example.com/v1".to_string())
    );
}

#[test]
fn api_base_keeps_explicit_ports() {
    assert_eq!(
        normalize_api_base("http://localhost:3000/"),
        Some("http://localhost:3000".to_string())
    );
}

#[test]
fn empty_api_base_means_unconfigured() {
    assert_eq!(normalize_api_base(""), None);
    assert_eq!(normalize_api_base("   "), None);
}

#[test]
fn unparseable_api_base_degrades_to_plain_trimming() {
    assert_eq!(
        normalize_api_base("not a url/"),
        Some("not a url".to_string())
    );
}

#[test]
fn configured_game_id_wins_over_everything() {
    let ctx = PageContext {
        configured_game_id: Some("alpha".to_string()),
        meta_game_id: Some("beta".to_string()),
        data_attribute_game_id: Some("gamma".to_string()),
        path: Some("/games/delta/index.html".to_string()),
    };
    assert_eq!(
        resolve_game_id(&ctx),
        ("alpha".to_string(), GameIdSource::Configured)
    );
}

#[test]
fn page_metadata_beats_the_path() {
    let ctx = PageContext {
        meta_game_id: Some("beta".to_string()),
        path: Some("/games/delta/index.html".to_string()),
        ..PageContext::default()
    };
    assert_eq!(
        resolve_game_id(&ctx),
        ("beta".to_string(), GameIdSource::PageMetadata)
    );

    let ctx = PageContext {
        data_attribute_game_id: Some("gamma".to_string()),
        path: Some("/games/delta/index.html".to_string()),
        ..PageContext::default()
    };
    assert_eq!(
        resolve_game_id(&ctx),
        ("gamma".to_string(), GameIdSource::PageMetadata)
    );
}

#[test]
fn path_segment_after_games_is_inferred() {
    let ctx = PageContext {
        path: Some("/games/kohada/index.html".to_string()),
        ..PageContext::default()
    };
    assert_eq!(
        resolve_game_id(&ctx),
        ("kohada".to_string(), GameIdSource::PathInferred)
    );
}

#[test]
fn blank_candidates_are_skipped_not_used() {
    let ctx = PageContext {
        configured_game_id: Some("   ".to_string()),
        meta_game_id: Some(String::new()),
        path: Some("/games/kohada".to_string()),
        ..PageContext::default()
    };
    assert_eq!(
        resolve_game_id(&ctx),
        ("kohada".to_string(), GameIdSource::PathInferred)
    );
}

#[test]
fn everything_missing_falls_back_to_the_template_id() {
    assert_eq!(
        resolve_game_id(&PageContext::default()),
        (DEFAULT_GAME_ID.to_string(), GameIdSource::Fallback)
    );
    let ctx = PageContext {
        path: Some("/about.html".to_string()),
        ..PageContext::default()
    };
    assert_eq!(
        resolve_game_id(&ctx),
        (DEFAULT_GAME_ID.to_string(), GameIdSource::Fallback)
    );
}

#[test]
fn missing_api_base_disables_network_operations() {
    let config = PortalConfig::resolve(
        None,
        &PageContext {
            configured_game_id: Some("kohada".to_string()),
            ..PageContext::default()
        },
        AdsMode::Pseudo,
        SdkApiType::Placement,
    );
    assert!(!config.is_configured());
    assert_eq!(config.game_id, "kohada");

    let config = PortalConfig::resolve(
        Some("https://api.example.com/"),
        &PageContext {
            configured_game_id: Some("kohada".to_string()),
            ..PageContext::default()
        },
        AdsMode::Pseudo,
        SdkApiType::Placement,
    );
    assert!(config.is_configured());
    assert_eq!(config.api_base.as_deref(), Some("https://api.example.com"));
}
