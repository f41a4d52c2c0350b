//! Local Gift Store
//!
//! The client's copy of every gift it is currently viewing, plus the fan-out
//! that keeps subscribed views current. Writes publish a [`StoreEvent`]
//! synchronously, so an optimistic prediction reaches every subscriber before
//! the engine ever awaits the network.

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

use giftwell_models::GiftRecord;

/// Capacity of the view fan-out channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notification delivered to subscribed views.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// A gift's local copy changed (predicted or authoritative).
    Updated(GiftRecord),
    /// A gift was removed locally.
    Removed(String),
}

/// Concurrent local cache of gift records with view fan-out.
pub struct GiftStore {
    records: DashMap<String, GiftRecord>,
    events: broadcast::Sender<StoreEvent>,
    /// Set while the propagation channel is down; local copies may be stale.
    stale: AtomicBool,
}

impl GiftStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            records: DashMap::new(),
            events,
            stale: AtomicBool::new(false),
        }
    }

    /// Subscribe to change notifications. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Get a gift by ID.
    pub fn get(&self, gift_id: &str) -> Option<GiftRecord> {
        self.records.get(gift_id).map(|r| r.clone())
    }

    /// IDs of all tracked gifts.
    pub fn ids(&self) -> Vec<String> {
        self.records.iter().map(|r| r.key().clone()).collect()
    }

    /// Number of tracked gifts.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store tracks no gifts.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or replace a record and notify subscribers synchronously.
    pub fn insert(&self, gift: GiftRecord) {
        self.records.insert(gift.id.clone(), gift.clone());
        // Send fails only when no view is subscribed, which is fine.
        let _ = self.events.send(StoreEvent::Updated(gift));
    }

    /// Remove a record and notify subscribers.
    pub fn remove(&self, gift_id: &str) -> Option<GiftRecord> {
        let removed = self.records.remove(gift_id).map(|(_, gift)| gift);
        if removed.is_some() {
            let _ = self.events.send(StoreEvent::Removed(gift_id.to_string()));
        }
        removed
    }

    /// Mark local copies as potentially stale (propagation channel down).
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }

    /// Clear the staleness flag after a successful resync.
    pub fn mark_fresh(&self) {
        self.stale.store(false, Ordering::SeqCst);
    }

    /// Whether local copies may be stale.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst)
    }
}

impl Default for GiftStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gift(id: &str) -> GiftRecord {
        let mut g = GiftRecord::new("wl-1", "owner-1", "Gift");
        g.id = id.to_string();
        g
    }

    #[test]
    fn test_insert_publishes_synchronously() {
        let store = GiftStore::new();
        let mut rx = store.subscribe();

        store.insert(gift("g-1"));

        // The event must already be queued, with no await in between.
        match rx.try_recv().unwrap() {
            StoreEvent::Updated(g) => assert_eq!(g.id, "g-1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_remove_publishes_removal_once() {
        let store = GiftStore::new();
        store.insert(gift("g-1"));
        let mut rx = store.subscribe();

        assert!(store.remove("g-1").is_some());
        assert!(store.remove("g-1").is_none());

        match rx.try_recv().unwrap() {
            StoreEvent::Removed(id) => assert_eq!(id, "g-1"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_staleness_flag() {
        let store = GiftStore::new();
        assert!(!store.is_stale());
        store.mark_stale();
        assert!(store.is_stale());
        store.mark_fresh();
        assert!(!store.is_stale());
    }

    #[test]
    fn test_replace_is_idempotent_for_duplicates() {
        let store = GiftStore::new();
        let g = gift("g-1");
        store.insert(g.clone());
        store.insert(g.clone());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("g-1").unwrap(), g);
    }
}
