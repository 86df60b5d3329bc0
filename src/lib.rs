//! League site: tournament/season selection synchronizer shared by every page.

pub mod config;
pub mod logic;
pub mod models;

pub use config::SiteConfig;
pub use logic::{
    build_target_url, classify, resolve_season_id, target_path, CookieStore, CssVariables,
    FileSeasonMapService, JsonFileStore, KvStore, MemoryStore, Navigator, PersistenceSink,
    PushOptions, RecordingNavigator, RouteKind, SeasonMapResolver, SeasonMapService,
    SeasonMapState, SelectionStateMachine, ThemeSink, STAGE_KEY, TOURNAMENT_KEY,
};
pub use models::{
    Location, RouteQuery, SeasonDisplay, SeasonMap, SeasonMapEntry, Selection, SelectionError,
    SelectionView, Stage, StageSeasonIds, ThemeColors, TournamentCatalog, TournamentDescriptor,
    TournamentKind,
};
