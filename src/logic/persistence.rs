//! Persistence of the last explicit selection across reloads: two backends behind one sink.

use crate::models::{Selection, Stage};
use log::{debug, info};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub const TOURNAMENT_KEY: &str = "selected_tournament";
pub const STAGE_KEY: &str = "second_league_stage";

const KEYS: [&str; 2] = [TOURNAMENT_KEY, STAGE_KEY];

/// Key/value backend. Implementations fail open: write errors are logged, reads that fail
/// return `None`.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    /// Remove the key entirely (not just blank it).
    fn clear(&mut self, key: &str);
}

/// In-memory backend. Clones share the same map, so a caller can keep a handle to a store it
/// has moved into a [`PersistenceSink`].
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        store
            .values
            .borrow_mut()
            .extend(values.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        store
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.values.borrow().clone()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn clear(&mut self, key: &str) {
        self.values.borrow_mut().remove(key);
    }
}

/// Durable store + cookie, written together. Callers never talk to either backend directly.
pub struct PersistenceSink {
    durable: Box<dyn KvStore>,
    cookie: Box<dyn KvStore>,
}

impl PersistenceSink {
    pub fn new(durable: impl KvStore + 'static, cookie: impl KvStore + 'static) -> Self {
        Self {
            durable: Box::new(durable),
            cookie: Box::new(cookie),
        }
    }

    /// Startup pass: copy a value present in only one backend into the other. When both hold
    /// different values the durable store wins.
    pub fn reconcile(&mut self) {
        for key in KEYS {
            match (self.durable.get(key), self.cookie.get(key)) {
                (Some(durable), cookie) if cookie.as_deref() != Some(durable.as_str()) => {
                    info!("persistence: copying {}={} from durable store to cookie", key, durable);
                    self.cookie.set(key, &durable);
                }
                (None, Some(cookie)) => {
                    info!("persistence: copying {}={} from cookie to durable store", key, cookie);
                    self.durable.set(key, &cookie);
                }
                _ => {}
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        self.durable
            .get(key)
            .or_else(|| self.cookie.get(key))
            .filter(|v| !v.trim().is_empty())
    }

    /// Last persisted tournament id (not validated against the catalog).
    pub fn tournament(&self) -> Option<String> {
        self.read(TOURNAMENT_KEY)
    }

    /// Last persisted stage; unparseable values read as absent.
    pub fn stage(&self) -> Option<Stage> {
        let raw = self.read(STAGE_KEY)?;
        match raw.parse() {
            Ok(stage) => Some(stage),
            Err(e) => {
                debug!("persistence: ignoring stored stage: {}", e);
                None
            }
        }
    }

    /// Write the selection to both backends. No stage erases the stored stage in both.
    pub fn save(&mut self, selection: &Selection) {
        self.durable.set(TOURNAMENT_KEY, &selection.tournament_id);
        self.cookie.set(TOURNAMENT_KEY, &selection.tournament_id);
        match selection.stage {
            Some(stage) => {
                self.durable.set(STAGE_KEY, stage.as_str());
                self.cookie.set(STAGE_KEY, stage.as_str());
            }
            None => self.clear_stage(),
        }
    }

    pub fn clear_stage(&mut self) {
        self.durable.clear(STAGE_KEY);
        self.cookie.clear(STAGE_KEY);
    }
}
