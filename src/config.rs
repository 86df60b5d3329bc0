//! Server configuration from environment variables.

use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct SiteConfig {
    pub host: String,
    pub port: u16,
    /// JSON season map read once at startup.
    pub season_map_path: PathBuf,
    /// Directory of per-browser selection files.
    pub data_dir: PathBuf,
    /// Selection files untouched for this many hours are deleted by the sweep task.
    pub selection_ttl_hours: i64,
    /// Session cookie signing key (at least 64 bytes). Generated per process when unset.
    pub session_key: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_season_map_path() -> PathBuf {
    PathBuf::from("data/season_map.json")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("var/selections")
}

/// Ten years.
const MAX_SELECTION_TTL_HOURS: i64 = 10 * 365 * 24;

fn default_selection_ttl_hours() -> i64 {
    30 * 24
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            season_map_path: default_season_map_path(),
            data_dir: default_data_dir(),
            selection_ttl_hours: default_selection_ttl_hours(),
            session_key: None,
        }
    }
}

impl SiteConfig {
    /// Read `HOST`, `PORT`, `SEASON_MAP_PATH`, `SELECTION_DATA_DIR`, `SELECTION_TTL_HOURS`,
    /// `SESSION_KEY`; unset or invalid values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            host: non_empty("HOST").unwrap_or_else(default_host),
            port: non_empty("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or_else(default_port),
            season_map_path: non_empty("SEASON_MAP_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_season_map_path),
            data_dir: non_empty("SELECTION_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            selection_ttl_hours: non_empty("SELECTION_TTL_HOURS")
                .and_then(|h| h.parse().ok())
                .filter(|h: &i64| (1..=MAX_SELECTION_TTL_HOURS).contains(h))
                .unwrap_or_else(default_selection_ttl_hours),
            session_key: non_empty("SESSION_KEY"),
        }
    }
}
