//! Concrete persistence backends: a durable JSON file per browser and the cookie jar.

use crate::logic::persistence::KvStore;
use crate::models::SelectionError;
use actix_web::cookie::{Cookie, CookieJar};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

/// Durable per-browser backend: one JSON document, rewritten atomically on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    file: StoreFile,
}

impl JsonFileStore {
    /// Open (or start) the document at `path`. Missing or unreadable files start empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("store {}: unreadable, starting empty: {}", path.display(), e);
                StoreFile::default()
            }),
            Err(_) => {
                debug!("store {}: not found, starting empty", path.display());
                StoreFile::default()
            }
        };
        Self { path, file }
    }

    /// Store for one browser under `dir` (`<dir>/<browser_id>.json`).
    pub fn for_browser(dir: &Path, browser_id: Uuid) -> Self {
        Self::open(dir.join(format!("{}.json", browser_id)))
    }

    /// Delete store files under `dir` last changed more than `max_age` before `now`. Files
    /// without a readable `updated_at` are aged by their modification time. Returns the number
    /// of files removed.
    pub fn sweep_stale(dir: &Path, max_age: Duration, now: DateTime<Utc>) -> usize {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("sweep {}: {}", dir.display(), e);
                return 0;
            }
        };
        let mut removed = 0;
        for path in entries.filter_map(|e| e.ok()).map(|e| e.path()) {
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(changed) = last_changed(&path) else {
                continue;
            };
            if now - changed < max_age {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("sweep {}: {}", path.display(), e),
            }
        }
        removed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time of the last successful change, if any.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.file.updated_at
    }

    fn flush(&self) -> Result<(), SelectionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SelectionError::Storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&self.file)
            .map_err(|e| SelectionError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| SelectionError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| SelectionError::Storage(e.to_string()))?;
        Ok(())
    }

    fn changed(&mut self) {
        self.file.updated_at = Some(Utc::now());
        if let Err(e) = self.flush() {
            warn!("store {}: {}", self.path.display(), e);
        }
    }
}

fn last_changed(path: &Path) -> Option<DateTime<Utc>> {
    let stamped = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<StoreFile>(&raw).ok())
        .and_then(|file| file.updated_at);
    stamped.or_else(|| {
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from)
    })
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.file.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        if self.file.values.get(key).map(String::as_str) == Some(value) {
            return;
        }
        self.file.values.insert(key.to_string(), value.to_string());
        self.changed();
    }

    fn clear(&mut self, key: &str) {
        if self.file.values.remove(key).is_some() {
            self.changed();
        }
    }
}

/// Cookie backend over a jar. Cookies the browser sent are loaded with [`CookieStore::load`];
/// changes accumulate in the jar delta for the response. Clones share the jar.
#[derive(Clone, Debug, Default)]
pub struct CookieStore {
    jar: Rc<RefCell<CookieJar>>,
}

impl CookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cookie the browser already holds.
    pub fn load(&self, name: &str, value: &str) {
        self.jar
            .borrow_mut()
            .add_original(Cookie::new(name.to_string(), value.to_string()));
    }

    /// Cookies to send back: new values with `path=/`, and removal cookies for cleared keys.
    pub fn delta(&self) -> Vec<Cookie<'static>> {
        self.jar.borrow().delta().cloned().collect()
    }
}

impl KvStore for CookieStore {
    fn get(&self, key: &str) -> Option<String> {
        self.jar.borrow().get(key).map(|c| c.value().to_string())
    }

    fn set(&mut self, key: &str, value: &str) {
        if self.get(key).as_deref() == Some(value) {
            return;
        }
        self.jar.borrow_mut().add(
            Cookie::build(key.to_string(), value.to_string())
                .path("/")
                .finish(),
        );
    }

    fn clear(&mut self, key: &str) {
        if self.get(key).is_none() {
            return;
        }
        self.jar
            .borrow_mut()
            .remove(Cookie::build(key.to_string(), "").path("/").finish());
    }
}
