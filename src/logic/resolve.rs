//! Season resolution: the only way `effective_season_id` is ever computed.

use crate::models::{SeasonMap, Stage, TournamentDescriptor};

/// Resolve the season id for a tournament and stage.
///
/// Remote entry first (stage-keyed for the group-stage tournament, then flat), then the
/// descriptor's static fallbacks. Pure: the URL `season` parameter never participates.
pub fn resolve_season_id(
    tournament: &TournamentDescriptor,
    stage: Option<Stage>,
    season_map: Option<&SeasonMap>,
) -> u32 {
    let entry = season_map.and_then(|map| map.get(&tournament.id));
    if let Some(entry) = entry {
        if tournament.is_group_stage() {
            let staged = stage.and_then(|s| entry.stage_season_ids.and_then(|ids| ids.get(s)));
            if let Some(id) = staged {
                return id;
            }
        }
        if let Some(id) = entry.season_id {
            return id;
        }
    }
    stage
        .filter(|_| tournament.is_group_stage())
        .and_then(|s| tournament.stage_fallbacks.and_then(|ids| ids.get(s)))
        .unwrap_or(tournament.fallback_season_id)
}

