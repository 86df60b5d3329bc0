//! Route classification: whether a tournament switch rewrites the query in place or
//! redirects to the tournament home.

use crate::models::{Location, RouteQuery};
use serde::Serialize;

/// Entity-detail pages: `/<entity>/<id>`. Their ids belong to one tournament's entity graph.
const DETAIL_ENTITIES: [&str; 4] = ["player", "team", "teams", "matches"];

/// Path the user lands on when a detail page cannot survive a tournament switch.
pub const TOURNAMENT_HOME: &str = "/";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Query-only update, path kept.
    List,
    /// Redirect to the tournament home.
    Detail,
}

fn is_locale_segment(segment: &str) -> bool {
    segment.len() == 2 && segment.bytes().all(|b| b.is_ascii_lowercase())
}

/// Classify a pathname. An optional two-letter locale prefix and a trailing slash are ignored.
pub fn classify(pathname: &str) -> RouteKind {
    let trimmed = pathname.strip_suffix('/').unwrap_or(pathname);
    let mut segments: Vec<&str> = trimmed.split('/').skip(1).collect();
    if segments.first().is_some_and(|s| is_locale_segment(s)) {
        segments.remove(0);
    }
    match segments.as_slice() {
        [entity, id] if DETAIL_ENTITIES.contains(entity) && !id.is_empty() => RouteKind::Detail,
        _ => RouteKind::List,
    }
}

/// Path a tournament switch should land on, given the current pathname.
pub fn target_path(pathname: &str) -> String {
    match classify(pathname) {
        RouteKind::List => pathname.to_string(),
        RouteKind::Detail => TOURNAMENT_HOME.to_string(),
    }
}

/// Full target URL for a tournament switch: target path plus the freshly built query.
pub fn build_target_url(pathname: &str, query: &RouteQuery) -> String {
    Location::new(target_path(pathname), query.clone()).to_string()
}
