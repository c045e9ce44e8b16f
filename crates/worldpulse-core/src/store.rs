//! Observer-side reconciliation store.
//!
//! Each observer keeps its own [`ObserverStore`]: a private
//! [`EventWindow`] that mirrors the hub cache, plus the featured event
//! pointer. Applying the hub's snapshot and then every broadcast batch in
//! order reproduces the hub's cache exactly.

use std::collections::BTreeSet;

use worldpulse_types::{DisabledNotice, Event, HubMessage};

use crate::window::{DEFAULT_CAPACITY, EventWindow};

/// Local mirror of the hub cache with a featured event.
#[derive(Debug, Clone)]
pub struct ObserverStore {
    window: EventWindow,
    featured: Option<Event>,
    initialized: bool,
    disabled_sources: BTreeSet<String>,
}

impl ObserverStore {
    /// Create an empty store holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            window: EventWindow::new(capacity),
            featured: None,
            initialized: false,
            disabled_sources: BTreeSet::new(),
        }
    }

    /// Replace local contents with a hub snapshot.
    ///
    /// Features the first event if nothing is featured yet.
    pub fn apply_snapshot(&mut self, events: Vec<Event>) {
        self.window.replace(events);
        self.initialized = true;
        if self.featured.is_none() {
            self.featured = self.window.as_slice().first().cloned();
        }
    }

    /// Merge one broadcast batch.
    ///
    /// The first prominent event in the batch becomes featured. Returns
    /// whether the featured event changed.
    pub fn apply_batch(&mut self, batch: &[Event]) -> bool {
        self.window.merge(batch);
        match batch.iter().find(|e| e.is_prominent()) {
            Some(prominent) => {
                let changed = self.featured.as_ref() != Some(prominent);
                self.featured = Some(prominent.clone());
                changed
            }
            None => false,
        }
    }

    /// Set or clear the featured event manually.
    pub fn select_featured(&mut self, event: Option<Event>) {
        self.featured = event;
    }

    /// Record that a source was disabled on the hub.
    pub fn apply_disabled(&mut self, notice: &DisabledNotice) {
        self.disabled_sources.insert(notice.name.clone());
    }

    /// Apply any hub message. Returns whether the featured event changed.
    pub fn apply_message(&mut self, message: HubMessage) -> bool {
        match message {
            HubMessage::Initial(payload) => {
                let before = self.featured.clone();
                self.apply_snapshot(payload.events);
                before != self.featured
            }
            HubMessage::New(payload) => self.apply_batch(&payload.events),
            HubMessage::CollectorDisabled(notice) => {
                self.apply_disabled(&notice);
                false
            }
        }
    }

    /// Current events, newest merge first.
    pub fn events(&self) -> &[Event] {
        self.window.as_slice()
    }

    /// The featured event, if any.
    pub const fn featured(&self) -> Option<&Event> {
        self.featured.as_ref()
    }

    /// True once the first snapshot has been applied.
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Names of sources reported disabled.
    pub const fn disabled_sources(&self) -> &BTreeSet<String> {
        &self.disabled_sources
    }
}

impl Default for ObserverStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
