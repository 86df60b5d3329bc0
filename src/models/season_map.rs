//! Remote season map: authoritative season ids per tournament.

use crate::models::tournament::{SelectionError, StageSeasonIds};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Season map entry for one tournament.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeasonMapEntry {
    #[serde(default)]
    pub season_id: Option<u32>,
    /// Per-stage season ids (group-stage tournament only).
    #[serde(default)]
    pub stage_season_ids: Option<StageSeasonIds>,
    #[serde(default)]
    pub has_table: bool,
    #[serde(default)]
    pub has_bracket: bool,
    #[serde(default)]
    pub sort_order: i32,
}

/// Snapshot keyed by tournament id.
pub type SeasonMap = HashMap<String, SeasonMapEntry>;

/// Parse a season map from its JSON wire form (`{"<tournament>": {...}, ...}`).
pub fn parse_season_map(raw: &str) -> Result<SeasonMap, SelectionError> {
    serde_json::from_str(raw).map_err(|e| SelectionError::SeasonMap(e.to_string()))
}
