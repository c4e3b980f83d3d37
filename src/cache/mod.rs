//! Bounded, load-deduplicating tile cache.
//!
//! One LRU store per base level maps tile keys to shared futures of the
//! tile's [`TileIndex`]. A miss spawns a Tokio task that runs the loader and
//! builds the index; the shared handle to that task is stored before the call
//! returns, so every concurrent request for the same key awaits the same
//! load. Load failures resolve to an empty index and are never retried while
//! the entry is cached.
//!
//! The bookkeeping sits behind a single `parking_lot` mutex that is never held
//! across an await point.

mod state;
mod stats;

pub use state::SharedIndex;
pub use stats::CacheStats;

use crate::error::TileCacheError;
use crate::events::{TileLoadedEvent, TileLoadedNotifier};
use crate::index::{TileIndex, TileStatus};
use crate::loader::{Loader, TileRequest};
use crate::types::{FeatureRef, Headers, TileCoord, TileKey};
use futures::FutureExt;
use futures::future::join_all;
use parking_lot::Mutex;
use state::{CacheEntry, CacheState};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub struct TileCache {
    state: Arc<Mutex<CacheState>>,
    loader: Arc<dyn Loader>,
    notifier: TileLoadedNotifier,
}

impl TileCache {
    pub fn new(
        loader: Arc<dyn Loader>,
        base_levels: &[u32],
        capacity: usize,
        track_features: bool,
        notifier: TileLoadedNotifier,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new(
                base_levels,
                capacity,
                track_features,
            ))),
            loader,
            notifier,
        }
    }

    /// Returns the index future for a base tile, starting a load on a miss.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn get_or_load(&self, coord: TileCoord, headers: &Headers) -> SharedIndex {
        let key = coord.key();
        let mut state = self.state.lock();

        if let Some(future) = state.lookup(coord.level, &key) {
            state.stats.cache_hits += 1;
            return future;
        }

        let generation = state.next_generation();
        state.stats.loads_started += 1;
        log::debug!("Loading tile {}", key);

        let task = tokio::spawn(resolve_tile(
            Arc::clone(&self.state),
            Arc::clone(&self.loader),
            self.notifier.clone(),
            TileRequest {
                coord,
                headers: headers.clone(),
            },
            key.clone(),
            generation,
        ));

        let task_key = key.clone();
        let future = async move {
            match task.await {
                Ok(index) => index,
                Err(err) => {
                    let err = TileCacheError::LoaderTask {
                        tile: task_key.clone(),
                        reason: err.to_string(),
                    };
                    log::warn!("{}", err);
                    Arc::new(TileIndex::failed(task_key, err.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        let evicted = state.insert(
            coord.level,
            key,
            CacheEntry {
                generation,
                future: future.clone(),
            },
        );
        drop(state);

        if !evicted.is_empty() {
            log::debug!("Evicted {} tiles after inserting {}", evicted.len(), coord);
        }
        future
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity()
    }

    /// Changes the per-level bound and waits for the evicted entries' loads
    /// to settle.
    pub async fn set_capacity(&self, capacity: usize) {
        let evicted = self.state.lock().set_capacity(capacity);
        if !evicted.is_empty() {
            log::debug!("Capacity change evicted {} tiles", evicted.len());
        }
        join_all(evicted.into_iter().map(|entry| entry.future)).await;
    }

    /// Waits for every outstanding load, then empties all stores.
    pub async fn clear(&self) {
        let pending = self.state.lock().futures();
        join_all(pending).await;
        self.state.lock().clear();
    }

    /// Calls `callback` for every feature of every resolved cached tile.
    /// Tiles still loading are skipped. Features spanning several tiles are
    /// visited once per tile.
    pub async fn for_each_feature(&self, mut callback: impl FnMut(&FeatureRef)) {
        let indexes = self.state.lock().live_indexes();
        for index in indexes {
            index.features().for_each(&mut callback);
        }
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.state.lock().contains(coord.level, &coord.key())
    }

    /// Status of a cached tile, `None` while pending or when not cached.
    pub fn status(&self, coord: TileCoord) -> Option<TileStatus> {
        self.state
            .lock()
            .live_index(&coord.key())
            .map(|index| index.status().clone())
    }

    pub fn tiles_for_feature(&self, feature_id: &str) -> Vec<TileKey> {
        self.state.lock().membership().tiles_for(feature_id)
    }

    pub fn keys(&self) -> Vec<TileKey> {
        self.state.lock().keys()
    }

    pub fn level_len(&self, level: u32) -> usize {
        self.state.lock().level_len(level)
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().snapshot()
    }

    pub fn notifier(&self) -> &TileLoadedNotifier {
        &self.notifier
    }
}

async fn resolve_tile(
    state: Arc<Mutex<CacheState>>,
    loader: Arc<dyn Loader>,
    notifier: TileLoadedNotifier,
    request: TileRequest,
    key: TileKey,
    generation: u64,
) -> Arc<TileIndex> {
    let level = request.coord.level;
    let outcome = AssertUnwindSafe(async move { loader.load(request).await })
        .catch_unwind()
        .await;

    let index = match outcome {
        Ok(Ok(features)) => TileIndex::build(key.clone(), features),
        Ok(Err(source)) => {
            let err = TileCacheError::Load {
                tile: key.clone(),
                source,
            };
            log::warn!("{}", err);
            TileIndex::failed(key.clone(), err.to_string())
        }
        Err(_) => {
            let err = TileCacheError::LoaderTask {
                tile: key.clone(),
                reason: "loader panicked".to_string(),
            };
            log::warn!("{}", err);
            TileIndex::failed(key.clone(), err.to_string())
        }
    };
    let index = Arc::new(index);

    let registered = {
        let mut state = state.lock();
        let registered = state.register(level, &key, generation, &index);
        if registered && index.is_failed() {
            state.stats.loads_failed += 1;
        }
        registered
    };

    if registered {
        notifier.notify(TileLoadedEvent {
            tile_id: key,
            index: Arc::clone(&index),
        });
    } else {
        log::debug!("Discarding result for tile {} evicted while loading", key);
    }
    index
}
