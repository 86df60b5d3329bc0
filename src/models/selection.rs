//! Selection state and the URL it is mirrored into.

use crate::models::tournament::{Stage, TournamentDescriptor};
use actix_web::web::Query;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TOURNAMENT_PARAM: &str = "tournament";
pub const SEASON_PARAM: &str = "season";
pub const ROUND_PARAM: &str = "round";
pub const STAGE_PARAM: &str = "stage";

/// The in-memory `(tournament, stage)` pair. `stage` is only set for the group-stage tournament.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub tournament_id: String,
    pub stage: Option<Stage>,
}

impl Selection {
    pub fn new(tournament_id: impl Into<String>, stage: Option<Stage>) -> Self {
        Self {
            tournament_id: tournament_id.into(),
            stage,
        }
    }
}

/// One query parameter: decoded key and value, plus the segment as it was written.
#[derive(Clone, Debug, Eq, PartialEq)]
struct QueryParam {
    key: String,
    value: String,
    raw: String,
}

impl QueryParam {
    fn new(key: &str, value: String) -> Self {
        Self {
            raw: format!("{}={}", key, value),
            key: key.to_string(),
            value,
        }
    }

    /// Decode one `k=v` segment (percent escapes, `+` as space). Undecodable segments are
    /// kept verbatim.
    fn parse(segment: &str) -> Self {
        let (key, value) = match Query::<Vec<(String, String)>>::from_query(segment) {
            Ok(Query(mut pairs)) if pairs.len() == 1 => pairs.remove(0),
            _ => match segment.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (segment.to_string(), String::new()),
            },
        };
        Self {
            key,
            value,
            raw: segment.to_string(),
        }
    }
}

/// Query string as an ordered list of parameters. Reads see decoded values; parameters the
/// synchronizer does not touch are written back exactly as received.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RouteQuery {
    params: Vec<QueryParam>,
}

impl RouteQuery {
    /// Parse `a=1&b=2` (a leading `?` is accepted). Empty segments are skipped.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let params = raw
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(QueryParam::parse)
            .collect();
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    /// Replace the first occurrence in place (dropping duplicates) or append.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let param = QueryParam::new(key, value.to_string());
        match self.params.iter().position(|p| p.key == key) {
            Some(idx) => {
                self.params[idx] = param;
                let mut seen = false;
                self.params.retain(|p| {
                    if p.key != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.params.push(param),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.params.retain(|p| p.key != key);
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn tournament(&self) -> Option<&str> {
        self.get(TOURNAMENT_PARAM).filter(|v| !v.is_empty())
    }

    /// Parsed `stage`; invalid values read as absent.
    pub fn stage(&self) -> Option<Stage> {
        self.get(STAGE_PARAM).and_then(|v| v.parse().ok())
    }

    pub fn season(&self) -> Option<u32> {
        self.get(SEASON_PARAM).and_then(|v| v.parse().ok())
    }

    pub fn round(&self) -> Option<u32> {
        self.get(ROUND_PARAM).and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for RouteQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            f.write_str(&param.raw)?;
        }
        Ok(())
    }
}

/// Pathname plus query: what the navigator reports and what a push targets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Location {
    pub pathname: String,
    pub query: RouteQuery,
}

impl Location {
    pub fn new(pathname: impl Into<String>, query: RouteQuery) -> Self {
        let pathname = pathname.into();
        Self {
            pathname: if pathname.is_empty() {
                "/".to_string()
            } else {
                pathname
            },
            query,
        }
    }

    /// Parse `/path?query` (no scheme or host).
    pub fn parse(url: &str) -> Self {
        match url.split_once('?') {
            Some((path, query)) => Self::new(path, RouteQuery::parse(query)),
            None => Self::new(url, RouteQuery::default()),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pathname)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// Display record for the active season.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SeasonDisplay {
    pub tournament_id: String,
    pub tournament_name: String,
    pub season_id: u32,
    pub stage: Option<Stage>,
    pub label: String,
}

/// Everything consumers read from the synchronizer, as one serializable record.
#[derive(Clone, Debug, Serialize)]
pub struct SelectionView {
    pub tournament: TournamentDescriptor,
    pub season: SeasonDisplay,
    pub effective_season_id: u32,
    pub current_round: Option<u32>,
    pub selected_round: Option<u32>,
    pub second_league_stage: Option<Stage>,
    pub is_league: bool,
    pub is_cup: bool,
    pub show_table: bool,
    pub show_bracket: bool,
}
