//! Navigation port and theme port consumed by the selection state machine.

use crate::models::{Location, ThemeColors};
use serde::Serialize;
use std::collections::BTreeMap;

/// Options passed with every push.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PushOptions {
    pub scroll: bool,
}

impl PushOptions {
    /// Tournament switches never move the viewport.
    pub const NO_SCROLL: PushOptions = PushOptions { scroll: false };
}

/// Client-side router.
pub trait Navigator {
    /// Location the router currently reports. May lag behind the last push.
    fn location(&self) -> Location;
    fn push(&mut self, url: &str, options: PushOptions);
}

/// Navigator that records pushes. With `follow_pushes` off the reported location stays put
/// until [`RecordingNavigator::set_location`] is called, like a router that updates
/// asynchronously (or a server request whose URL is fixed).
#[derive(Clone, Debug)]
pub struct RecordingNavigator {
    location: Location,
    pushes: Vec<(String, PushOptions)>,
    follow_pushes: bool,
}

impl RecordingNavigator {
    pub fn new(url: &str) -> Self {
        Self {
            location: Location::parse(url),
            pushes: Vec::new(),
            follow_pushes: false,
        }
    }

    pub fn following(url: &str) -> Self {
        Self {
            follow_pushes: true,
            ..Self::new(url)
        }
    }

    /// Simulate the router reporting a new URL (round-trip, back/forward, deep link).
    pub fn set_location(&mut self, url: &str) {
        self.location = Location::parse(url);
    }

    pub fn pushes(&self) -> &[(String, PushOptions)] {
        &self.pushes
    }

    pub fn pushed_urls(&self) -> Vec<&str> {
        self.pushes.iter().map(|(url, _)| url.as_str()).collect()
    }

    pub fn last_push(&self) -> Option<&str> {
        self.pushes.last().map(|(url, _)| url.as_str())
    }
}

impl Navigator for RecordingNavigator {
    fn location(&self) -> Location {
        self.location.clone()
    }

    fn push(&mut self, url: &str, options: PushOptions) {
        self.pushes.push((url.to_string(), options));
        if self.follow_pushes {
            self.location = Location::parse(url);
        }
    }
}

pub const PRIMARY_COLOR_VAR: &str = "--brand-primary";
pub const ACCENT_COLOR_VAR: &str = "--brand-accent";

/// Receives the active tournament's brand colors. Each apply fully overwrites the last.
pub trait ThemeSink {
    fn apply(&mut self, colors: &ThemeColors);
}

/// Theme sink holding CSS custom properties.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct CssVariables {
    values: BTreeMap<String, String>,
}

impl CssVariables {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// `:root { --brand-accent: ...; --brand-primary: ...; }`
    pub fn to_style(&self) -> String {
        let decls: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{}: {};", k, v))
            .collect();
        format!(":root {{ {} }}", decls.join(" "))
    }
}

impl ThemeSink for CssVariables {
    fn apply(&mut self, colors: &ThemeColors) {
        self.values
            .insert(PRIMARY_COLOR_VAR.to_string(), colors.primary.clone());
        self.values
            .insert(ACCENT_COLOR_VAR.to_string(), colors.accent.clone());
    }
}
