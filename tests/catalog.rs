//! Integration tests for the tournament catalog, stages and server configuration.

use league_site::{SiteConfig, SelectionError, Stage, TournamentCatalog, TournamentKind};
use std::collections::HashMap;
use std::path::PathBuf;

const HEADER: &str = "id,name,kind,fallback_season_id,current_round,has_table,has_bracket,\
primary_color,accent_color,stage_a_season_id,stage_b_season_id,stage_final_season_id\n";

fn csv(rows: &[&str]) -> String {
    let mut out = HEADER.to_string();
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    out
}

#[test]
fn builtin_catalog_lists_five_tournaments() {
    let catalog = TournamentCatalog::builtin().unwrap();
    assert_eq!(catalog.len(), 5);
    assert_eq!(catalog.default_tournament().id, "pl");
    assert_eq!(catalog.group_stage().map(|t| t.id.as_str()), Some("2l"));

    let cup = catalog.get("cup").unwrap();
    assert_eq!(cup.kind, TournamentKind::Cup);
    assert!(cup.has_bracket && !cup.has_table);
    assert_eq!(cup.current_round, None);
    assert!(cup.stage_fallbacks.is_none());

    let pl = catalog.get("pl").unwrap();
    assert!(pl.is_round_based());
    assert_eq!(pl.current_round, Some(26));
    assert_eq!(pl.colors.primary, "#0b3d91");

    let second = catalog.get("2l").unwrap();
    assert!(!second.is_round_based());
    assert_eq!(second.stage_fallbacks.map(|s| s.get(Stage::Final)), Some(Some(82)));
    assert!(catalog.get("nope").is_none());
}

#[test]
fn ordered_without_map_keeps_catalog_order() {
    let catalog = TournamentCatalog::builtin().unwrap();
    let ids: Vec<&str> = catalog.ordered(None).iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["pl", "1l", "2l", "cup", "wl"]);
}

#[test]
fn duplicate_ids_are_rejected() {
    let raw = csv(&[
        "pl,Premier League,league,61,26,true,false,#000,#fff,,,",
        "pl,Copy,cup,63,,false,true,#000,#fff,,,",
    ]);
    assert!(matches!(
        TournamentCatalog::from_csv(raw.as_bytes()),
        Err(SelectionError::Catalog(_))
    ));
}

#[test]
fn second_group_stage_is_rejected() {
    let raw = csv(&[
        "2l,Second League,group_stage,80,,true,false,#000,#fff,80,81,82",
        "3l,Third League,group_stage,90,,true,false,#000,#fff,90,91,92",
    ]);
    let err = TournamentCatalog::from_csv(raw.as_bytes()).unwrap_err();
    assert!(err.to_string().starts_with("Invalid tournament catalog"));
}

#[test]
fn unknown_kind_and_empty_table_are_rejected() {
    let raw = csv(&["pl,Premier League,friendly,61,26,true,false,#000,#fff,,,"]);
    assert!(TournamentCatalog::from_csv(raw.as_bytes()).is_err());
    assert!(matches!(
        TournamentCatalog::from_csv(HEADER.as_bytes()),
        Err(SelectionError::Catalog(_))
    ));
}

#[test]
fn stage_parses_case_insensitively() {
    assert_eq!("B".parse::<Stage>().unwrap(), Stage::B);
    assert_eq!(" final ".parse::<Stage>().unwrap(), Stage::Final);
    assert_eq!(
        "c".parse::<Stage>(),
        Err(SelectionError::UnknownStage("c".to_string()))
    );
    assert_eq!(Stage::default(), Stage::A);
    for stage in Stage::ALL {
        assert_eq!(stage.as_str().parse::<Stage>().unwrap(), stage);
    }
}

#[test]
fn config_defaults_when_env_is_empty() {
    let config = SiteConfig::from_lookup(|_| None);
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 8080);
    assert_eq!(config.season_map_path, PathBuf::from("data/season_map.json"));
    assert_eq!(config.data_dir, PathBuf::from("var/selections"));
    assert_eq!(config.selection_ttl_hours, 30 * 24);
    assert!(config.session_key.is_none());
}

#[test]
fn config_reads_overrides_and_ignores_bad_port() {
    let env: HashMap<&str, &str> = [
        ("HOST", "127.0.0.1"),
        ("PORT", "not-a-port"),
        ("SEASON_MAP_PATH", "/srv/season_map.json"),
        ("SELECTION_DATA_DIR", " "),
        ("SELECTION_TTL_HOURS", "-5"),
    ]
    .into_iter()
    .collect();
    let config = SiteConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8080);
    assert_eq!(config.season_map_path, PathBuf::from("/srv/season_map.json"));
    assert_eq!(config.data_dir, PathBuf::from("var/selections"));
    assert_eq!(config.selection_ttl_hours, 30 * 24);

    let config = SiteConfig::from_lookup(|key| {
        (key == "SELECTION_TTL_HOURS").then(|| "48".to_string())
    });
    assert_eq!(config.selection_ttl_hours, 48);

    let config = SiteConfig::from_lookup(|key| (key == "PORT").then(|| "3000".to_string()));
    assert_eq!(config.port, 3000);
}
