//! Tournament catalog: descriptors, stages, and the crate error type.

use crate::models::season_map::SeasonMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur while loading configuration or handling a selection change.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SelectionError {
    /// Tournament id is not in the catalog.
    UnknownTournament(String),
    /// Stage value is not one of `a`, `b`, `final`.
    UnknownStage(String),
    /// Catalog could not be loaded (bad CSV, duplicate ids, empty table).
    Catalog(String),
    /// Season map could not be fetched or parsed.
    SeasonMap(String),
    /// A persistence backend could not be read or written.
    Storage(String),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::UnknownTournament(id) => write!(f, "Unknown tournament: {}", id),
            SelectionError::UnknownStage(raw) => write!(f, "Unknown stage: {}", raw),
            SelectionError::Catalog(msg) => write!(f, "Invalid tournament catalog: {}", msg),
            SelectionError::SeasonMap(msg) => write!(f, "Season map unavailable: {}", msg),
            SelectionError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for SelectionError {}

/// Competition format of a tournament.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentKind {
    /// Round-based league with a table.
    League,
    /// Knockout cup with a bracket.
    Cup,
    /// Two groups, then a final stage.
    GroupStage,
}

/// Sub-phase of the group-stage tournament.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    A,
    B,
    Final,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::A, Stage::B, Stage::Final];

    /// Query/storage form: `a`, `b`, `final`.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::A => "a",
            Stage::B => "b",
            Stage::Final => "final",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::A => "Group A",
            Stage::B => "Group B",
            Stage::Final => "Final stage",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Stage::A),
            "b" => Ok(Stage::B),
            "final" => Ok(Stage::Final),
            _ => Err(SelectionError::UnknownStage(s.to_string())),
        }
    }
}

/// Season id per stage. Used both for static fallbacks and for season map entries.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StageSeasonIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<u32>,
    #[serde(rename = "final", default, skip_serializing_if = "Option::is_none")]
    pub final_stage: Option<u32>,
}

impl StageSeasonIds {
    pub fn get(&self, stage: Stage) -> Option<u32> {
        match stage {
            Stage::A => self.a,
            Stage::B => self.b,
            Stage::Final => self.final_stage,
        }
    }

    fn is_empty(&self) -> bool {
        self.a.is_none() && self.b.is_none() && self.final_stage.is_none()
    }
}

/// Brand colors written to the theme when a tournament becomes active.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub primary: String,
    pub accent: String,
}

/// Static description of one tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TournamentDescriptor {
    pub id: String,
    pub name: String,
    pub kind: TournamentKind,
    /// Season used while the season map is absent or has no entry.
    pub fallback_season_id: u32,
    /// Round shown by default (round-based tournaments only).
    pub current_round: Option<u32>,
    pub has_table: bool,
    pub has_bracket: bool,
    pub colors: ThemeColors,
    /// Stage-keyed fallbacks (group-stage tournament only).
    pub stage_fallbacks: Option<StageSeasonIds>,
}

impl TournamentDescriptor {
    pub fn is_group_stage(&self) -> bool {
        self.kind == TournamentKind::GroupStage
    }

    pub fn is_round_based(&self) -> bool {
        self.kind == TournamentKind::League
    }
}

/// One CSV row of the catalog file.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: String,
    name: String,
    kind: TournamentKind,
    fallback_season_id: u32,
    current_round: Option<u32>,
    has_table: bool,
    has_bracket: bool,
    primary_color: String,
    accent_color: String,
    stage_a_season_id: Option<u32>,
    stage_b_season_id: Option<u32>,
    stage_final_season_id: Option<u32>,
}

impl From<CatalogRow> for TournamentDescriptor {
    fn from(row: CatalogRow) -> Self {
        let stages = StageSeasonIds {
            a: row.stage_a_season_id,
            b: row.stage_b_season_id,
            final_stage: row.stage_final_season_id,
        };
        Self {
            id: row.id.trim().to_string(),
            name: row.name,
            kind: row.kind,
            fallback_season_id: row.fallback_season_id,
            current_round: row.current_round,
            has_table: row.has_table,
            has_bracket: row.has_bracket,
            colors: ThemeColors {
                primary: row.primary_color,
                accent: row.accent_color,
            },
            stage_fallbacks: (!stages.is_empty()).then_some(stages),
        }
    }
}

const BUILTIN_CATALOG: &str = include_str!("../../data/tournaments.csv");

/// Fixed table of tournaments, in display order. The first entry is the default selection.
#[derive(Clone, Debug)]
pub struct TournamentCatalog {
    tournaments: Vec<TournamentDescriptor>,
}

impl TournamentCatalog {
    /// Validate and wrap descriptors: non-empty, unique ids, at most one group-stage tournament.
    pub fn new(tournaments: Vec<TournamentDescriptor>) -> Result<Self, SelectionError> {
        if tournaments.is_empty() {
            return Err(SelectionError::Catalog("no tournaments".to_string()));
        }
        for (i, t) in tournaments.iter().enumerate() {
            if t.id.is_empty() {
                return Err(SelectionError::Catalog(format!("row {} has an empty id", i + 1)));
            }
            if tournaments[..i].iter().any(|other| other.id == t.id) {
                return Err(SelectionError::Catalog(format!("duplicate id {}", t.id)));
            }
        }
        let group_stages = tournaments.iter().filter(|t| t.is_group_stage()).count();
        if group_stages > 1 {
            return Err(SelectionError::Catalog(format!(
                "{} group-stage tournaments, at most one is supported",
                group_stages
            )));
        }
        Ok(Self { tournaments })
    }

    /// Parse a catalog from CSV (header row required).
    pub fn from_csv<R: std::io::Read>(reader: R) -> Result<Self, SelectionError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut tournaments = Vec::new();
        for row in rdr.deserialize::<CatalogRow>() {
            let row = row.map_err(|e| SelectionError::Catalog(e.to_string()))?;
            tournaments.push(TournamentDescriptor::from(row));
        }
        Self::new(tournaments)
    }

    /// The catalog shipped with the site (`data/tournaments.csv`).
    pub fn builtin() -> Result<Self, SelectionError> {
        Self::from_csv(BUILTIN_CATALOG.as_bytes())
    }

    pub fn get(&self, id: &str) -> Option<&TournamentDescriptor> {
        self.tournaments.iter().find(|t| t.id == id)
    }

    pub fn default_tournament(&self) -> &TournamentDescriptor {
        &self.tournaments[0]
    }

    pub fn group_stage(&self) -> Option<&TournamentDescriptor> {
        self.tournaments.iter().find(|t| t.is_group_stage())
    }

    pub fn iter(&self) -> impl Iterator<Item = &TournamentDescriptor> {
        self.tournaments.iter()
    }

    /// Display order: the season map's `sort_order` when a map is given, catalog order
    /// otherwise and for tournaments the map does not list.
    pub fn ordered(&self, season_map: Option<&SeasonMap>) -> Vec<&TournamentDescriptor> {
        let mut list: Vec<&TournamentDescriptor> = self.tournaments.iter().collect();
        if let Some(map) = season_map {
            list.sort_by_key(|t| map.get(&t.id).map_or(i32::MAX, |e| e.sort_order));
        }
        list
    }

    pub fn len(&self) -> usize {
        self.tournaments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tournaments.is_empty()
    }
}
