//! Data structures for the selection synchronizer: catalog, season map, selection, URL.

mod season_map;
mod selection;
mod tournament;

pub use season_map::{parse_season_map, SeasonMap, SeasonMapEntry};
pub use selection::{
    Location, RouteQuery, SeasonDisplay, Selection, SelectionView, ROUND_PARAM, SEASON_PARAM,
    STAGE_PARAM, TOURNAMENT_PARAM,
};
pub use tournament::{
    SelectionError, Stage, StageSeasonIds, ThemeColors, TournamentCatalog, TournamentDescriptor,
    TournamentKind,
};
