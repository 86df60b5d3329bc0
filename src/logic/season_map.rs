//! One-shot season map fetch, owned by a scope.

use crate::models::{parse_season_map, SeasonMap, SelectionError};
use log::{debug, info, warn};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub type SeasonMapFuture = Pin<Box<dyn Future<Output = Result<SeasonMap, SelectionError>> + Send>>;

/// Source of the remote season map.
pub trait SeasonMapService: Send + Sync {
    fn fetch(&self) -> SeasonMapFuture;
}

/// Season map read from a JSON file.
#[derive(Clone, Debug)]
pub struct FileSeasonMapService {
    path: PathBuf,
}

impl FileSeasonMapService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SeasonMapService for FileSeasonMapService {
    fn fetch(&self) -> SeasonMapFuture {
        let path = self.path.clone();
        Box::pin(async move {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| SelectionError::SeasonMap(format!("{}: {}", path.display(), e)))?;
            parse_season_map(&raw)
        })
    }
}

/// Where the fetch stands. `Unavailable` is final: there is no retry.
#[derive(Clone, Debug)]
pub enum SeasonMapState {
    Pending,
    Loaded(Arc<SeasonMap>),
    Unavailable,
}

/// Runs the fetch once and holds the outcome for the lifetime of its owner. Dropping the
/// resolver before the fetch settles discards the result.
#[derive(Debug)]
pub struct SeasonMapResolver {
    state: SeasonMapState,
    rx: Option<oneshot::Receiver<Option<SeasonMap>>>,
    /// Resolves to whether the outcome reached this resolver.
    task: JoinHandle<bool>,
}

impl SeasonMapResolver {
    /// Start the fetch. Must be called from inside a tokio runtime.
    pub fn spawn(service: &dyn SeasonMapService) -> Self {
        let (tx, rx) = oneshot::channel();
        let fetch = service.fetch();
        let task = tokio::spawn(async move {
            let outcome = match fetch.await {
                Ok(map) => {
                    info!("season map: loaded {} entries", map.len());
                    Some(map)
                }
                Err(e) => {
                    warn!("{}; fallback seasons stay in effect", e);
                    None
                }
            };
            let delivered = tx.send(outcome).is_ok();
            if !delivered {
                debug!("season map: owner dropped before the fetch settled, result discarded");
            }
            delivered
        });
        Self {
            state: SeasonMapState::Pending,
            rx: Some(rx),
            task,
        }
    }

    /// Give up the outcome without waiting for it. The fetch still runs to completion; the
    /// returned handle resolves to whether its result was delivered, which is `false` unless
    /// it had already settled.
    pub fn detach(self) -> JoinHandle<bool> {
        self.task
    }

    pub fn state(&self) -> &SeasonMapState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<Arc<SeasonMap>> {
        match &self.state {
            SeasonMapState::Loaded(map) => Some(Arc::clone(map)),
            _ => None,
        }
    }

    /// Non-blocking. Returns the settled state the first time settlement is observed.
    pub fn try_settle(&mut self) -> Option<&SeasonMapState> {
        let rx = self.rx.as_mut()?;
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => None,
        };
        self.settle(outcome);
        Some(&self.state)
    }

    /// Wait for the fetch to settle (returns immediately once settled).
    pub async fn settled(&mut self) -> &SeasonMapState {
        if let Some(rx) = self.rx.as_mut() {
            let outcome = rx.await.unwrap_or(None);
            self.settle(outcome);
        }
        &self.state
    }

    fn settle(&mut self, outcome: Option<SeasonMap>) {
        self.rx = None;
        self.state = match outcome {
            Some(map) => SeasonMapState::Loaded(Arc::new(map)),
            None => SeasonMapState::Unavailable,
        };
    }
}
