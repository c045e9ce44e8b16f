//! Shared hub state: the event cache and the observer fan-out.
//!
//! [`HubState`] owns the canonical [`EventWindow`] and the broadcast
//! channel every `WebSocket` observer subscribes to. It is the
//! [`BatchSink`] of the scheduler, so each adapter batch is merged into
//! the cache and then broadcast as received.
//!
//! Merge-then-broadcast and snapshot-then-subscribe both run under the
//! cache lock. A new observer therefore sees every batch exactly once:
//! either inside its snapshot or as a later `events:new` message.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};
use worldpulse_core::adapter::{AdapterHealth, BatchSink, now_millis};
use worldpulse_core::window::EventWindow;
use worldpulse_types::{DisabledNotice, Event, EventsPayload, HubMessage, StatusRecord};

/// Capacity of the broadcast channel for hub messages.
///
/// An observer that falls behind by more than this many messages gets a
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest one.
const BROADCAST_CAPACITY: usize = 256;

/// The cache, the fan-out channel, and the adapter health registry.
///
/// Constructed once at startup and shared as `Arc<HubState>`.
pub struct HubState {
    cache: Mutex<EventWindow>,
    tx: broadcast::Sender<HubMessage>,
    sources: RwLock<Vec<Arc<AdapterHealth>>>,
    started_at: Instant,
}

impl HubState {
    /// Create a hub with an empty cache of `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            cache: Mutex::new(EventWindow::new(capacity)),
            tx,
            sources: RwLock::new(Vec::new()),
            started_at: Instant::now(),
        }
    }

    fn cache(&self) -> MutexGuard<'_, EventWindow> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merge a batch into the cache, then broadcast it unchanged.
    ///
    /// Returns the number of observers the batch was queued for.
    pub fn ingest(&self, source: &str, events: Vec<Event>) -> usize {
        if events.is_empty() {
            return 0;
        }
        let count = events.len();
        let mut cache = self.cache();
        cache.merge(&events);
        let cached = cache.len();
        let message = HubMessage::New(EventsPayload {
            events,
            timestamp: now_millis(),
        });
        // send fails only when no observer is connected
        let observers = self.tx.send(message).unwrap_or(0);
        drop(cache);

        info!(source, events = count, cached, observers, "Batch ingested");
        observers
    }

    /// Tell every observer that an adapter was disabled.
    pub fn notify_disabled(&self, notice: DisabledNotice) -> usize {
        warn!(source = %notice.name, reason = ?notice.reason, "Source disabled");
        self.tx
            .send(HubMessage::CollectorDisabled(notice))
            .unwrap_or(0)
    }

    /// Take a cache snapshot and subscribe to later messages atomically.
    pub fn subscribe_with_snapshot(&self) -> (Vec<Event>, broadcast::Receiver<HubMessage>) {
        let cache = self.cache();
        let rx = self.tx.subscribe();
        (cache.snapshot(), rx)
    }

    /// Subscribe to hub messages without a snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<HubMessage> {
        self.tx.subscribe()
    }

    /// Current cache contents.
    pub fn snapshot(&self) -> Vec<Event> {
        self.cache().snapshot()
    }

    /// Number of cached events.
    pub fn event_count(&self) -> usize {
        self.cache().len()
    }

    /// Number of connected observers.
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Time since the hub was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Register the adapters whose health the status surface reports.
    pub async fn register_sources(&self, health: Vec<Arc<AdapterHealth>>) {
        debug!(sources = health.len(), "Registering source health");
        self.sources.write().await.extend(health);
    }

    /// Status records of every registered adapter.
    pub async fn statuses(&self) -> Vec<StatusRecord> {
        self.sources
            .read()
            .await
            .iter()
            .map(|h| h.status())
            .collect()
    }
}

impl Default for HubState {
    fn default() -> Self {
        Self::new(worldpulse_core::window::DEFAULT_CAPACITY)
    }
}

impl BatchSink for HubState {
    fn on_batch(&self, source: &str, events: Vec<Event>) {
        self.ingest(source, events);
    }

    fn on_disabled(&self, notice: DisabledNotice) {
        self.notify_disabled(notice);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use worldpulse_types::{Category, DisabledReason};

    use super::*;

    fn quake(id: &str) -> Event {
        Event::new(id, 0, Category::Earthquake)
    }

    #[tokio::test]
    async fn ingest_merges_then_broadcasts_batch_as_given() {
        let hub = HubState::default();
        hub.ingest("quakes", vec![quake("a"), quake("b")]);

        let (snapshot, mut rx) = hub.subscribe_with_snapshot();
        assert_eq!(snapshot.len(), 2);

        let observers = hub.ingest("quakes", vec![quake("b"), quake("c")]);
        assert_eq!(observers, 1);

        let HubMessage::New(payload) = rx.recv().await.unwrap() else {
            panic!("expected events:new");
        };
        let ids: Vec<&str> = payload.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);

        let cached: Vec<String> = hub
            .snapshot()
            .iter()
            .map(|e| e.id.as_str().to_owned())
            .collect();
        assert_eq!(cached, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn empty_batch_is_not_broadcast() {
        let hub = HubState::default();
        let mut rx = hub.subscribe();
        assert_eq!(hub.ingest("quakes", Vec::new()), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn ingest_without_observers_still_caches() {
        let hub = HubState::new(3);
        assert_eq!(hub.ingest("quakes", vec![quake("a"), quake("b")]), 0);
        hub.ingest("quakes", vec![quake("c"), quake("d")]);
        assert_eq!(hub.event_count(), 3);
    }

    #[tokio::test]
    async fn disabled_notice_is_proxied() {
        let hub = HubState::default();
        let mut rx = hub.subscribe();
        let notice = DisabledNotice {
            name: String::from("ISS Tracker"),
            reason: Some(DisabledReason::MaxErrors),
            timestamp: 1,
        };
        hub.on_disabled(notice.clone());
        assert_eq!(
            rx.recv().await.unwrap(),
            HubMessage::CollectorDisabled(notice)
        );
    }

    #[tokio::test]
    async fn observer_count_tracks_receivers() {
        let hub = HubState::default();
        assert_eq!(hub.observer_count(), 0);
        let rx = hub.subscribe();
        assert_eq!(hub.observer_count(), 1);
        drop(rx);
        assert_eq!(hub.observer_count(), 0);
    }
}
