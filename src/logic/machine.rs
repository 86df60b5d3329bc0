//! Selection state machine: owns `(tournament, stage)`, derives the effective season, and
//! keeps the URL, the persistence backends and the theme in step with it.
//!
//! Reconciliation runs as a list of watchers. Each watcher pairs a dependency selector with a
//! reconcile step; after every mutation or external signal the driver re-evaluates the
//! selectors and re-runs the steps whose dependencies changed, until nothing changes.
//! Mutators build their full target URL inline, so their push is the last word for the
//! transition and later watcher runs only confirm it.

use crate::logic::navigator::{Navigator, PushOptions, ThemeSink};
use crate::logic::persistence::PersistenceSink;
use crate::logic::resolve::resolve_season_id;
use crate::logic::route;
use crate::logic::season_map::SeasonMapState;
use crate::models::{
    Location, RouteQuery, SeasonDisplay, SeasonMap, Selection, SelectionError, SelectionView,
    Stage, TournamentCatalog, TournamentDescriptor, TournamentKind, ROUND_PARAM, SEASON_PARAM,
    STAGE_PARAM, TOURNAMENT_PARAM,
};
use log::{debug, info, warn};
use std::sync::Arc;

/// Upper bound on driver passes; watchers converge in two passes in practice.
const MAX_DRIVE_PASSES: usize = 8;

/// What a watcher last saw. A watcher runs when its current value differs.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Dependency {
    UrlSelection {
        tournament: Option<String>,
        stage: Option<Stage>,
    },
    SelectionAndMap {
        selection: Selection,
        map_loaded: bool,
    },
    Tournament(String),
}

struct Watcher<N: Navigator, T: ThemeSink> {
    name: &'static str,
    select: fn(&SelectionStateMachine<N, T>) -> Dependency,
    reconcile: fn(&mut SelectionStateMachine<N, T>),
    last: Option<Dependency>,
}

impl<N: Navigator, T: ThemeSink> Watcher<N, T> {
    fn new(
        name: &'static str,
        select: fn(&SelectionStateMachine<N, T>) -> Dependency,
        reconcile: fn(&mut SelectionStateMachine<N, T>),
    ) -> Self {
        Self {
            name,
            select,
            reconcile,
            last: None,
        }
    }
}

/// A push the router has not reported back yet.
#[derive(Clone, Debug)]
struct PendingPush {
    /// Location the router reported when the push was issued.
    from: Location,
    to: Location,
}

pub struct SelectionStateMachine<N: Navigator, T: ThemeSink> {
    catalog: Arc<TournamentCatalog>,
    season_map: Option<Arc<SeasonMap>>,
    selection: Selection,
    persistence: PersistenceSink,
    navigator: N,
    theme: T,
    pending: Option<PendingPush>,
    watchers: Vec<Watcher<N, T>>,
    mounted: bool,
}

impl<N: Navigator, T: ThemeSink> SelectionStateMachine<N, T> {
    pub fn new(
        catalog: Arc<TournamentCatalog>,
        persistence: PersistenceSink,
        navigator: N,
        theme: T,
    ) -> Self {
        let default = catalog.default_tournament();
        let selection = Selection::new(
            default.id.clone(),
            default.is_group_stage().then(Stage::default),
        );
        Self {
            catalog,
            season_map: None,
            selection,
            persistence,
            navigator,
            theme,
            pending: None,
            watchers: vec![
                Watcher::new("url-adoption", Self::url_dependency, Self::adopt_url_selection),
                Watcher::new(
                    "season-correction",
                    Self::season_dependency,
                    Self::correct_url_season,
                ),
                Watcher::new("theme", Self::theme_dependency, Self::apply_theme),
            ],
            mounted: false,
        }
    }

    /// First mount: reconcile the two backends, seed the selection from them, run every
    /// watcher once. Later calls do nothing.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.persistence.reconcile();
        self.selection = self.seed_selection();
        debug!("mounted with {:?}", self.selection);
        self.drive();
    }

    /// The router reported a location change (back/forward, deep link, round-trip of a push).
    pub fn sync(&mut self) {
        self.drive();
    }

    /// Season map fetch settled. Only the first loaded snapshot is taken.
    pub fn apply_season_map(&mut self, state: &SeasonMapState) {
        match state {
            SeasonMapState::Loaded(map) if self.season_map.is_none() => {
                self.season_map = Some(Arc::clone(map));
                self.drive();
            }
            SeasonMapState::Loaded(_) => debug!("season map already loaded, ignoring snapshot"),
            SeasonMapState::Pending | SeasonMapState::Unavailable => {}
        }
    }

    fn seed_selection(&self) -> Selection {
        let stored = self.persistence.tournament();
        let descriptor = match stored.as_deref().map(|id| (id, self.catalog.get(id))) {
            Some((_, Some(d))) => d,
            Some((id, None)) => {
                debug!("ignoring stored tournament {:?}", id);
                self.catalog.default_tournament()
            }
            None => self.catalog.default_tournament(),
        };
        let stage = descriptor
            .is_group_stage()
            .then(|| self.persistence.stage().unwrap_or_default());
        Selection::new(descriptor.id.clone(), stage)
    }

    // ---- read side -------------------------------------------------------------------

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn catalog(&self) -> &TournamentCatalog {
        &self.catalog
    }

    pub fn season_map(&self) -> Option<&SeasonMap> {
        self.season_map.as_deref()
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn navigator_mut(&mut self) -> &mut N {
        &mut self.navigator
    }

    pub fn theme(&self) -> &T {
        &self.theme
    }

    pub fn current_tournament(&self) -> &TournamentDescriptor {
        self.catalog
            .get(&self.selection.tournament_id)
            .unwrap_or_else(|| self.catalog.default_tournament())
    }

    /// Season id that drives data fetching. Never read from the URL.
    pub fn effective_season_id(&self) -> u32 {
        resolve_season_id(
            self.current_tournament(),
            self.selection.stage,
            self.season_map(),
        )
    }

    pub fn current_round(&self) -> Option<u32> {
        let t = self.current_tournament();
        t.current_round.filter(|_| t.is_round_based())
    }

    /// Round to display: the URL `round` override for round-based tournaments, else the
    /// catalog's current round.
    pub fn selected_round(&self) -> Option<u32> {
        if !self.current_tournament().is_round_based() {
            return None;
        }
        self.location().query.round().or_else(|| self.current_round())
    }

    pub fn second_league_stage(&self) -> Option<Stage> {
        self.selection.stage
    }

    pub fn is_cup(&self) -> bool {
        self.current_tournament().kind == TournamentKind::Cup
    }

    pub fn is_league(&self) -> bool {
        !self.is_cup()
    }

    pub fn show_table(&self) -> bool {
        let t = self.current_tournament();
        self.season_map()
            .and_then(|map| map.get(&t.id))
            .map_or(t.has_table, |entry| entry.has_table)
    }

    pub fn show_bracket(&self) -> bool {
        let t = self.current_tournament();
        self.season_map()
            .and_then(|map| map.get(&t.id))
            .map_or(t.has_bracket, |entry| entry.has_bracket)
    }

    pub fn current_season(&self) -> SeasonDisplay {
        let t = self.current_tournament();
        let season_id = self.effective_season_id();
        let label = match self.selection.stage {
            Some(stage) => format!("{} {} ({})", t.name, season_id, stage.label()),
            None => format!("{} {}", t.name, season_id),
        };
        SeasonDisplay {
            tournament_id: t.id.clone(),
            tournament_name: t.name.clone(),
            season_id,
            stage: self.selection.stage,
            label,
        }
    }

    /// Catalog in display order (season map `sort_order` once loaded).
    pub fn tournaments(&self) -> Vec<&TournamentDescriptor> {
        self.catalog.ordered(self.season_map())
    }

    pub fn view(&self) -> SelectionView {
        SelectionView {
            tournament: self.current_tournament().clone(),
            season: self.current_season(),
            effective_season_id: self.effective_season_id(),
            current_round: self.current_round(),
            selected_round: self.selected_round(),
            second_league_stage: self.second_league_stage(),
            is_league: self.is_league(),
            is_cup: self.is_cup(),
            show_table: self.show_table(),
            show_bracket: self.show_bracket(),
        }
    }

    /// Location as the machine sees it: the target of its own unconfirmed push while the
    /// router still reports the pre-push URL, the router's report otherwise.
    pub fn location(&self) -> Location {
        let reported = self.navigator.location();
        match &self.pending {
            Some(pending) if pending.from == reported => pending.to.clone(),
            _ => reported,
        }
    }

    // ---- mutators --------------------------------------------------------------------

    /// Switch tournament. Resolves the carried stage and the next season from the current
    /// snapshot, persists, and pushes the complete target URL in one call.
    pub fn set_tournament(&mut self, id: &str) -> Result<(), SelectionError> {
        if id == self.selection.tournament_id {
            debug!("set_tournament({}): already selected", id);
            return Ok(());
        }
        let catalog = Arc::clone(&self.catalog);
        let descriptor = catalog
            .get(id)
            .ok_or_else(|| SelectionError::UnknownTournament(id.to_string()))?;
        self.settle_pending();

        let stage = if descriptor.is_group_stage() {
            Some(
                self.selection
                    .stage
                    .or_else(|| self.persistence.stage())
                    .unwrap_or_default(),
            )
        } else {
            None
        };
        let season_id = resolve_season_id(descriptor, stage, self.season_map());
        let selection = Selection::new(descriptor.id.clone(), stage);
        self.persistence.save(&selection);
        self.selection = selection;

        let mut query = RouteQuery::default();
        query.set(TOURNAMENT_PARAM, &descriptor.id);
        if let Some(stage) = stage.filter(|s| *s != Stage::default()) {
            query.set(STAGE_PARAM, stage);
        }
        query.set(SEASON_PARAM, season_id);
        if let Some(round) = descriptor.current_round {
            query.set(ROUND_PARAM, round);
        }
        let current = self.location();
        info!(
            "tournament -> {} (season {}) from {}",
            descriptor.id, season_id, current
        );
        self.navigate(Location::new(route::target_path(&current.pathname), query));
        self.drive();
        Ok(())
    }

    /// Switch stage within the group-stage tournament; no-op for any other tournament.
    pub fn set_second_league_stage(&mut self, stage: Stage) {
        let catalog = Arc::clone(&self.catalog);
        let Some(descriptor) = catalog
            .get(&self.selection.tournament_id)
            .filter(|t| t.is_group_stage())
        else {
            debug!(
                "set_second_league_stage({}): {} has no stages",
                stage, self.selection.tournament_id
            );
            return;
        };
        if self.selection.stage == Some(stage) {
            return;
        }
        self.settle_pending();

        let selection = Selection::new(descriptor.id.clone(), Some(stage));
        self.persistence.save(&selection);
        self.selection = selection;
        let season_id = resolve_season_id(descriptor, Some(stage), self.season_map());

        let mut target = self.location();
        target.query.set(STAGE_PARAM, stage);
        target.query.set(SEASON_PARAM, season_id);
        info!("stage -> {} (season {})", stage, season_id);
        self.navigate(target);
        self.drive();
    }

    /// Rewrite `season` in the URL. Display only: the effective season is unchanged.
    pub fn set_season(&mut self, season_id: u32) {
        self.settle_pending();
        let mut target = self.location();
        target.query.set(SEASON_PARAM, season_id);
        self.navigate(target);
        self.drive();
    }

    /// Rewrite `round` in the URL; ignored for tournaments that are not round-based.
    pub fn set_round(&mut self, round: u32) {
        if !self.current_tournament().is_round_based() {
            debug!("set_round({}): {} is not round-based", round, self.selection.tournament_id);
            return;
        }
        self.settle_pending();
        let mut target = self.location();
        target.query.set(ROUND_PARAM, round);
        self.navigate(target);
        self.drive();
    }

    // ---- driver ----------------------------------------------------------------------

    fn drive(&mut self) {
        if !self.mounted {
            return;
        }
        self.settle_pending();
        for _ in 0..MAX_DRIVE_PASSES {
            let mut fired = false;
            for i in 0..self.watchers.len() {
                let select = self.watchers[i].select;
                let current = select(self);
                if self.watchers[i].last.as_ref() == Some(&current) {
                    continue;
                }
                debug!("effect {}: {:?}", self.watchers[i].name, current);
                self.watchers[i].last = Some(current);
                let reconcile = self.watchers[i].reconcile;
                reconcile(self);
                fired = true;
            }
            if !fired {
                return;
            }
        }
        warn!("selection effects still changing after {} passes", MAX_DRIVE_PASSES);
    }

    /// Forget the pending push once the router reports anything other than the pre-push URL.
    fn settle_pending(&mut self) {
        let reported = self.navigator.location();
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.from != reported)
        {
            debug!("navigation settled at {}", reported);
            self.pending = None;
        }
    }

    fn navigate(&mut self, target: Location) {
        let current = self.location();
        if target == current {
            debug!("already at {}", target);
            return;
        }
        let url = target.to_string();
        let from = self.navigator.location();
        self.navigator.push(&url, PushOptions::NO_SCROLL);
        self.pending = Some(PendingPush { from, to: target });
    }

    // ---- watchers --------------------------------------------------------------------

    fn url_dependency(&self) -> Dependency {
        let location = self.location();
        Dependency::UrlSelection {
            tournament: location.query.tournament().map(str::to_string),
            stage: location.query.stage(),
        }
    }

    /// URL -> state: adopt a valid `tournament`/`stage` from the URL and persist it.
    fn adopt_url_selection(&mut self) {
        let location = self.location();
        let Some(id) = location.query.tournament() else {
            return;
        };
        let catalog = Arc::clone(&self.catalog);
        let Some(descriptor) = catalog.get(id) else {
            warn!("ignoring unknown tournament {:?} in URL", id);
            return;
        };
        let stage = if descriptor.is_group_stage() {
            let raw_stage = location.query.get(STAGE_PARAM);
            if raw_stage.is_some() && location.query.stage().is_none() {
                warn!("ignoring unknown stage in URL {}", location);
            }
            // Mutators omit the default stage, so on the same tournament no `stage` means `a`.
            let carried = match (self.selection.tournament_id == descriptor.id, raw_stage) {
                (true, None) => None,
                (true, Some(_)) => self.selection.stage,
                (false, _) => self.persistence.stage(),
            };
            Some(location.query.stage().or(carried).unwrap_or_default())
        } else {
            None
        };
        let next = Selection::new(descriptor.id.clone(), stage);
        if next == self.selection {
            return;
        }
        info!("adopting {:?} from URL {}", next, location);
        self.persistence.save(&next);
        self.selection = next;
    }

    fn season_dependency(&self) -> Dependency {
        Dependency::SelectionAndMap {
            selection: self.selection.clone(),
            map_loaded: self.season_map.is_some(),
        }
    }

    /// State -> URL: when the URL carries a `season` that disagrees with the resolved one,
    /// rewrite `season` alone. A URL naming another tournament is left alone.
    fn correct_url_season(&mut self) {
        let expected = self.effective_season_id();
        let mut target = self.location();
        if target.query.get(SEASON_PARAM).is_none() || target.query.season() == Some(expected) {
            return;
        }
        if let Some(other) = target
            .query
            .tournament()
            .filter(|t| *t != self.selection.tournament_id)
        {
            debug!("season correction skipped: URL names {}", other);
            return;
        }
        info!("correcting URL season to {}", expected);
        target.query.set(SEASON_PARAM, expected);
        self.navigate(target);
    }

    fn theme_dependency(&self) -> Dependency {
        Dependency::Tournament(self.selection.tournament_id.clone())
    }

    fn apply_theme(&mut self) {
        let colors = self.current_tournament().colors.clone();
        self.theme.apply(&colors);
    }
}
