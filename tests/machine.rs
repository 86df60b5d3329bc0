//! Integration tests for the selection state machine: switches, URL adoption, season
//! correction, persistence and theme.

use league_site::logic::{ACCENT_COLOR_VAR, PRIMARY_COLOR_VAR};
use league_site::{
    CssVariables, KvStore, MemoryStore, PersistenceSink, PushOptions, RecordingNavigator,
    SeasonMap, SeasonMapEntry, SeasonMapState, SelectionStateMachine, Stage, StageSeasonIds,
    TournamentCatalog, STAGE_KEY, TOURNAMENT_KEY,
};
use std::sync::Arc;

type Machine = SelectionStateMachine<RecordingNavigator, CssVariables>;

struct Harness {
    machine: Machine,
    durable: MemoryStore,
    cookie: MemoryStore,
}

impl Harness {
    fn pushes(&self) -> Vec<String> {
        self.machine
            .navigator()
            .pushed_urls()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

fn catalog() -> Arc<TournamentCatalog> {
    Arc::new(TournamentCatalog::builtin().unwrap())
}

fn build(navigator: RecordingNavigator, durable: MemoryStore, cookie: MemoryStore) -> Harness {
    let persistence = PersistenceSink::new(durable.clone(), cookie.clone());
    let mut machine =
        SelectionStateMachine::new(catalog(), persistence, navigator, CssVariables::default());
    machine.mount();
    Harness {
        machine,
        durable,
        cookie,
    }
}

fn mounted(url: &str) -> Harness {
    build(
        RecordingNavigator::new(url),
        MemoryStore::new(),
        MemoryStore::new(),
    )
}

fn flat(season_id: u32) -> SeasonMapEntry {
    SeasonMapEntry {
        season_id: Some(season_id),
        has_table: true,
        ..Default::default()
    }
}

fn loaded(entries: Vec<(&str, SeasonMapEntry)>) -> SeasonMapState {
    let map: SeasonMap = entries
        .into_iter()
        .map(|(id, entry)| (id.to_string(), entry))
        .collect();
    SeasonMapState::Loaded(Arc::new(map))
}

fn second_league_entry(a: u32, b: u32, final_stage: u32) -> SeasonMapEntry {
    SeasonMapEntry {
        season_id: Some(79),
        stage_season_ids: Some(StageSeasonIds {
            a: Some(a),
            b: Some(b),
            final_stage: Some(final_stage),
        }),
        has_table: true,
        ..Default::default()
    }
}

#[test]
fn set_current_tournament_never_navigates() {
    let mut h = mounted("/matches?tournament=pl&season=61");
    assert!(h.pushes().is_empty());
    h.machine.set_tournament("pl").unwrap();
    assert!(h.pushes().is_empty());

    let mut h = mounted("/");
    h.machine.set_tournament("pl").unwrap();
    assert!(h.pushes().is_empty());
}

#[test]
fn unknown_tournament_is_rejected_without_side_effects() {
    let mut h = mounted("/matches?tournament=pl&season=61");
    assert!(h.machine.set_tournament("zz").is_err());
    assert!(h.pushes().is_empty());
    assert_eq!(h.machine.selection().tournament_id, "pl");
}

#[test]
fn group_stage_default_stage_resolves_from_map() {
    let mut h = mounted("/?tournament=2l");
    h.machine
        .apply_season_map(&loaded(vec![("2l", second_league_entry(80, 81, 82))]));
    assert_eq!(h.machine.second_league_stage(), Some(Stage::A));
    assert_eq!(h.machine.effective_season_id(), 80);
}

#[test]
fn switch_to_league_carries_round() {
    let mut h = mounted("/matches?tournament=2l&season=80");
    assert!(h.pushes().is_empty());
    assert_eq!(h.machine.effective_season_id(), 80);

    h.machine.set_tournament("pl").unwrap();
    assert_eq!(h.pushes(), vec!["/matches?tournament=pl&season=61&round=26"]);
    assert_eq!(h.machine.second_league_stage(), None);
    assert_eq!(h.durable.get(STAGE_KEY), None);
    assert_eq!(h.cookie.get(STAGE_KEY), None);
    assert_eq!(h.durable.get(TOURNAMENT_KEY).as_deref(), Some("pl"));
}

#[test]
fn detail_routes_redirect_to_tournament_home() {
    for path in [
        "/player/157",
        "/team/91",
        "/team/91/",
        "/teams/91",
        "/kz/team/91",
        "/matches/123",
    ] {
        let mut h = mounted(path);
        h.machine.set_tournament("cup").unwrap();
        assert_eq!(h.pushes(), vec!["/?tournament=cup&season=63"], "path {}", path);

        let mut h = mounted(path);
        h.machine.set_tournament("2l").unwrap();
        assert_eq!(h.pushes(), vec!["/?tournament=2l&season=80"], "path {}", path);
    }
}

#[test]
fn list_routes_keep_their_path() {
    let mut h = mounted("/matches");
    h.machine.set_tournament("1l").unwrap();
    assert_eq!(h.pushes(), vec!["/matches?tournament=1l&season=62&round=24"]);

    let mut h = mounted("/table");
    h.machine.set_tournament("cup").unwrap();
    assert_eq!(h.pushes(), vec!["/table?tournament=cup&season=63"]);
}

#[test]
fn every_push_keeps_scroll_position() {
    let mut h = mounted("/teams?tournament=pl&season=61");
    h.machine.set_tournament("2l").unwrap();
    h.machine.set_second_league_stage(Stage::B);
    h.machine.set_tournament("wl").unwrap();
    h.machine.set_round(3);
    assert_eq!(h.machine.navigator().pushes().len(), 4);
    assert!(h
        .machine
        .navigator()
        .pushes()
        .iter()
        .all(|(_, options)| *options == PushOptions::NO_SCROLL));
}

#[test]
fn remote_map_corrects_url_season() {
    let mut h = mounted("/matches?tournament=pl&season=61");
    assert!(h.pushes().is_empty());
    h.machine.apply_season_map(&loaded(vec![("pl", flat(999))]));
    assert_eq!(h.pushes(), vec!["/matches?tournament=pl&season=999"]);
    assert_eq!(h.machine.effective_season_id(), 999);

    // A second snapshot is never taken.
    h.machine.apply_season_map(&loaded(vec![("pl", flat(5))]));
    assert_eq!(h.machine.effective_season_id(), 999);
    assert_eq!(h.pushes().len(), 1);
}

#[test]
fn unavailable_map_keeps_fallbacks_without_navigation() {
    let mut h = mounted("/matches?tournament=pl&season=61");
    h.machine.apply_season_map(&SeasonMapState::Unavailable);
    assert!(h.pushes().is_empty());
    assert_eq!(h.machine.effective_season_id(), 61);
}

#[test]
fn switch_while_router_lags_never_mixes_tournaments() {
    let mut h = mounted("/teams?tournament=pl&season=61");
    h.machine.set_tournament("2l").unwrap();
    assert_eq!(h.pushes(), vec!["/teams?tournament=2l&season=80"]);

    // Router catches up: nothing further to do.
    h.machine
        .navigator_mut()
        .set_location("/teams?tournament=2l&season=80");
    h.machine.sync();
    assert_eq!(h.pushes().len(), 1);
    for url in h.pushes() {
        assert!(!(url.contains("tournament=pl") && url.contains("season=80")), "{}", url);
    }
}

#[test]
fn switch_after_unconfirmed_season_correction_never_mixes_tournaments() {
    let mut h = mounted("/teams?tournament=pl&season=61");
    h.machine.apply_season_map(&loaded(vec![
        ("pl", flat(999)),
        ("2l", second_league_entry(80, 81, 82)),
    ]));
    assert_eq!(h.pushes(), vec!["/teams?tournament=pl&season=999"]);

    // The router has not reported the correction yet when the user switches.
    h.machine.set_tournament("2l").unwrap();
    assert_eq!(
        h.pushes(),
        vec![
            "/teams?tournament=pl&season=999",
            "/teams?tournament=2l&season=80",
        ]
    );
    for url in h.pushes() {
        assert!(!(url.contains("tournament=pl") && url.contains("season=80")), "{}", url);
    }
}

#[test]
fn map_arriving_after_switch_corrects_new_tournament_only() {
    let mut h = mounted("/teams?tournament=pl&season=61");
    h.machine.set_tournament("2l").unwrap();
    h.machine
        .apply_season_map(&loaded(vec![("2l", second_league_entry(85, 86, 87))]));
    assert_eq!(
        h.pushes(),
        vec!["/teams?tournament=2l&season=80", "/teams?tournament=2l&season=85"]
    );
}

#[test]
fn synchronous_router_follows_pushes() {
    let mut h = build(
        RecordingNavigator::following("/teams?tournament=pl&season=61"),
        MemoryStore::new(),
        MemoryStore::new(),
    );
    h.machine.set_tournament("2l").unwrap();
    h.machine.sync();
    assert_eq!(h.pushes(), vec!["/teams?tournament=2l&season=80"]);
    assert_eq!(
        h.machine.location().to_string(),
        "/teams?tournament=2l&season=80"
    );
}

#[test]
fn url_change_is_adopted_and_persisted() {
    let mut h = mounted("/");
    h.machine
        .navigator_mut()
        .set_location("/matches?tournament=cup&season=63");
    h.machine.sync();
    assert_eq!(h.machine.selection().tournament_id, "cup");
    assert_eq!(h.durable.get(TOURNAMENT_KEY).as_deref(), Some("cup"));
    assert_eq!(h.cookie.get(TOURNAMENT_KEY).as_deref(), Some("cup"));
    assert!(h.pushes().is_empty());
}

#[test]
fn unknown_url_tournament_is_ignored() {
    let mut h = mounted("/matches?tournament=cup&season=63");
    h.machine
        .navigator_mut()
        .set_location("/matches?tournament=zz&season=1");
    h.machine.sync();
    assert_eq!(h.machine.selection().tournament_id, "cup");
    assert!(h.pushes().is_empty());
}

#[test]
fn url_stage_is_adopted_and_invalid_stage_ignored() {
    let h = mounted("/?tournament=2l&stage=b");
    assert_eq!(h.machine.second_league_stage(), Some(Stage::B));
    assert_eq!(h.machine.effective_season_id(), 81);
    assert_eq!(h.durable.get(STAGE_KEY).as_deref(), Some("b"));

    let h = mounted("/?tournament=2l&stage=zz");
    assert_eq!(h.machine.second_league_stage(), Some(Stage::A));

    let h = mounted("/?tournament=pl&stage=b");
    assert_eq!(h.machine.second_league_stage(), None);
}

#[test]
fn deep_link_with_stale_season_is_corrected() {
    let h = mounted("/table?tournament=cup&season=5");
    assert_eq!(h.pushes(), vec!["/table?tournament=cup&season=63"]);
    assert_eq!(h.machine.effective_season_id(), 63);
}

#[test]
fn stage_switch_rewrites_stage_and_season() {
    let mut h = mounted("/table?tournament=2l&season=80");
    h.machine.set_second_league_stage(Stage::Final);
    assert_eq!(h.pushes(), vec!["/table?tournament=2l&season=82&stage=final"]);
    assert_eq!(h.machine.effective_season_id(), 82);
    assert_eq!(h.durable.get(STAGE_KEY).as_deref(), Some("final"));
    assert_eq!(h.cookie.get(STAGE_KEY).as_deref(), Some("final"));

    // Same stage again: nothing to do.
    h.machine.set_second_league_stage(Stage::Final);
    assert_eq!(h.pushes().len(), 1);
}

#[test]
fn back_to_default_stage_url_restores_default_stage() {
    let mut h = build(
        RecordingNavigator::following("/table?tournament=pl&season=61"),
        MemoryStore::new(),
        MemoryStore::new(),
    );
    h.machine.set_tournament("2l").unwrap();
    h.machine.set_second_league_stage(Stage::B);
    assert_eq!(h.machine.effective_season_id(), 81);

    // Back: the router reports the URL pushed for stage A, which carries no `stage`.
    h.machine
        .navigator_mut()
        .set_location("/table?tournament=2l&season=80");
    h.machine.sync();
    assert_eq!(h.machine.second_league_stage(), Some(Stage::A));
    assert_eq!(h.machine.effective_season_id(), 80);
    assert_eq!(h.durable.get(STAGE_KEY).as_deref(), Some("a"));
    assert_eq!(
        h.pushes(),
        vec![
            "/table?tournament=2l&season=80",
            "/table?tournament=2l&season=81&stage=b",
        ]
    );
}

#[test]
fn fresh_mount_on_default_stage_url_ignores_stored_stage() {
    let durable = MemoryStore::with_values([(TOURNAMENT_KEY, "2l"), (STAGE_KEY, "b")]);
    let h = build(
        RecordingNavigator::new("/table?tournament=2l&season=80"),
        durable,
        MemoryStore::new(),
    );
    assert_eq!(h.machine.second_league_stage(), Some(Stage::A));
    assert!(h.pushes().is_empty());
}

#[test]
fn stage_switch_outside_group_stage_is_noop() {
    let mut h = mounted("/table?tournament=pl&season=61");
    h.machine.set_second_league_stage(Stage::B);
    assert!(h.pushes().is_empty());
    assert_eq!(h.machine.second_league_stage(), None);
    assert_eq!(h.durable.get(STAGE_KEY), None);
}

#[test]
fn switch_into_group_stage_uses_persisted_stage() {
    let durable = MemoryStore::with_values([(TOURNAMENT_KEY, "pl"), (STAGE_KEY, "b")]);
    let mut h = build(RecordingNavigator::new("/matches"), durable, MemoryStore::new());
    assert_eq!(h.machine.second_league_stage(), None);

    h.machine.set_tournament("2l").unwrap();
    assert_eq!(h.pushes(), vec!["/matches?tournament=2l&stage=b&season=81"]);
    assert_eq!(h.machine.second_league_stage(), Some(Stage::B));
}

#[test]
fn season_and_round_rewrites_do_not_move_effective_season() {
    let mut h = mounted("/matches?tournament=pl&season=61&round=26");
    h.machine.set_round(20);
    assert_eq!(h.pushes(), vec!["/matches?tournament=pl&season=61&round=20"]);
    assert_eq!(h.machine.selected_round(), Some(20));
    assert_eq!(h.machine.current_round(), Some(26));

    h.machine.set_season(60);
    assert_eq!(h.pushes().len(), 2);
    assert_eq!(h.pushes()[1], "/matches?tournament=pl&season=60&round=20");
    assert_eq!(h.machine.effective_season_id(), 61);
}

#[test]
fn round_rewrite_ignored_for_cup() {
    let mut h = mounted("/bracket?tournament=cup&season=63");
    h.machine.set_round(2);
    assert!(h.pushes().is_empty());
    assert_eq!(h.machine.selected_round(), None);
}

#[test]
fn theme_follows_tournament() {
    let mut h = mounted("/?tournament=cup");
    assert_eq!(h.machine.theme().get(PRIMARY_COLOR_VAR), Some("#a4161a"));
    assert_eq!(h.machine.theme().get(ACCENT_COLOR_VAR), Some("#f5f3f4"));

    h.machine.set_tournament("pl").unwrap();
    assert_eq!(h.machine.theme().get(PRIMARY_COLOR_VAR), Some("#0b3d91"));
    assert_eq!(h.machine.theme().get(ACCENT_COLOR_VAR), Some("#f2c14e"));
}

#[test]
fn mount_reconciles_backends_and_seeds_selection() {
    let durable = MemoryStore::with_values([(TOURNAMENT_KEY, "cup")]);
    let h = build(RecordingNavigator::new("/"), durable, MemoryStore::new());
    assert_eq!(h.cookie.get(TOURNAMENT_KEY).as_deref(), Some("cup"));
    assert_eq!(h.machine.selection().tournament_id, "cup");

    let cookie = MemoryStore::with_values([(TOURNAMENT_KEY, "2l"), (STAGE_KEY, "final")]);
    let h = build(RecordingNavigator::new("/"), MemoryStore::new(), cookie);
    assert_eq!(h.durable.get(TOURNAMENT_KEY).as_deref(), Some("2l"));
    assert_eq!(h.durable.get(STAGE_KEY).as_deref(), Some("final"));
    assert_eq!(h.machine.effective_season_id(), 82);

    let durable = MemoryStore::with_values([(TOURNAMENT_KEY, "cup")]);
    let cookie = MemoryStore::with_values([(TOURNAMENT_KEY, "pl")]);
    let h = build(RecordingNavigator::new("/"), durable, cookie);
    assert_eq!(h.cookie.get(TOURNAMENT_KEY).as_deref(), Some("cup"));
    assert_eq!(h.machine.selection().tournament_id, "cup");
}

#[test]
fn stored_unknown_tournament_falls_back_to_default() {
    let durable = MemoryStore::with_values([(TOURNAMENT_KEY, "zz")]);
    let h = build(RecordingNavigator::new("/"), durable, MemoryStore::new());
    assert_eq!(h.machine.selection().tournament_id, "pl");
    assert!(h.pushes().is_empty());
}

#[test]
fn switch_persists_to_both_backends() {
    let mut h = mounted("/teams?tournament=pl&season=61");
    h.machine.set_tournament("2l").unwrap();
    for store in [&h.durable, &h.cookie] {
        assert_eq!(store.get(TOURNAMENT_KEY).as_deref(), Some("2l"));
        assert_eq!(store.get(STAGE_KEY).as_deref(), Some("a"));
    }
}

#[test]
fn flags_follow_map_when_loaded() {
    let mut h = mounted("/?tournament=cup");
    assert!(h.machine.is_cup());
    assert!(!h.machine.is_league());
    assert!(h.machine.show_bracket());
    assert!(!h.machine.show_table());

    h.machine.apply_season_map(&loaded(vec![(
        "cup",
        SeasonMapEntry {
            season_id: Some(63),
            has_table: true,
            has_bracket: true,
            sort_order: 1,
            ..Default::default()
        },
    )]));
    assert!(h.machine.show_table());
}

#[test]
fn tournaments_ordered_by_map_sort_order() {
    let mut h = mounted("/");
    let ids: Vec<&str> = h.machine.tournaments().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["pl", "1l", "2l", "cup", "wl"]);

    let entry = |sort_order| SeasonMapEntry {
        sort_order,
        ..Default::default()
    };
    h.machine.apply_season_map(&loaded(vec![
        ("cup", entry(1)),
        ("wl", entry(2)),
        ("pl", entry(3)),
    ]));
    let ids: Vec<&str> = h.machine.tournaments().iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["cup", "wl", "pl", "1l", "2l"]);
}

#[test]
fn current_season_display_record() {
    let h = mounted("/?tournament=2l&stage=b");
    let season = h.machine.current_season();
    assert_eq!(season.tournament_id, "2l");
    assert_eq!(season.season_id, 81);
    assert_eq!(season.stage, Some(Stage::B));
    assert_eq!(season.label, "Second League 81 (Group B)");

    let view = h.machine.view();
    assert_eq!(view.effective_season_id, 81);
    assert_eq!(view.second_league_stage, Some(Stage::B));
    assert!(view.is_league);
    assert_eq!(view.current_round, None);
}

#[test]
fn mutators_before_mount_skip_effects() {
    let persistence = PersistenceSink::new(MemoryStore::new(), MemoryStore::new());
    let mut machine: Machine = SelectionStateMachine::new(
        catalog(),
        persistence,
        RecordingNavigator::new("/matches"),
        CssVariables::default(),
    );
    machine.set_tournament("cup").unwrap();
    assert_eq!(
        machine.navigator().pushed_urls(),
        vec!["/matches?tournament=cup&season=63"]
    );
    assert_eq!(machine.theme().get(PRIMARY_COLOR_VAR), None);
}

#[test]
fn encoded_url_stage_is_adopted() {
    let h = mounted("/?tournament=%32l&stage=%66inal");
    assert_eq!(h.machine.selection().tournament_id, "2l");
    assert_eq!(h.machine.second_league_stage(), Some(Stage::Final));
    assert_eq!(h.machine.effective_season_id(), 82);
}
