//! Selection synchronizer logic: resolution, routing, persistence, season map, state machine.

mod backends;
mod machine;
mod navigator;
mod persistence;
mod resolve;
mod route;
mod season_map;

pub use backends::{CookieStore, JsonFileStore};
pub use machine::SelectionStateMachine;
pub use navigator::{
    CssVariables, Navigator, PushOptions, RecordingNavigator, ThemeSink, ACCENT_COLOR_VAR,
    PRIMARY_COLOR_VAR,
};
pub use persistence::{KvStore, MemoryStore, PersistenceSink, STAGE_KEY, TOURNAMENT_KEY};
pub use resolve::resolve_season_id;
pub use route::{build_target_url, classify, target_path, RouteKind, TOURNAMENT_HOME};
pub use season_map::{
    FileSeasonMapService, SeasonMapFuture, SeasonMapResolver, SeasonMapService, SeasonMapState,
};
