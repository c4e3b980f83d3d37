//! Tile-loaded notifications.
//!
//! Subscribers get a [`broadcast::Receiver`]; a slow subscriber that falls more
//! than the channel capacity behind sees `RecvError::Lagged` and skips ahead.
//! Events are sent right after the cache state has been updated, so a
//! subscriber reacting to an event already sees the tile as cached.

use crate::index::TileIndex;
use crate::types::TileKey;
use std::sync::Arc;
use tokio::sync::broadcast;

/// A tile's index became available, either loaded or as an empty fallback.
#[derive(Debug, Clone)]
pub struct TileLoadedEvent {
    pub tile_id: TileKey,
    pub index: Arc<TileIndex>,
}

#[derive(Debug, Clone)]
pub struct TileLoadedNotifier {
    sender: broadcast::Sender<TileLoadedEvent>,
}

impl TileLoadedNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TileLoadedEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn notify(&self, event: TileLoadedEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}
