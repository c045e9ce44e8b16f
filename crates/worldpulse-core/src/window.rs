//! Bounded, deduplicating, recency-ordered event window.
//!
//! [`EventWindow`] is the single merge algorithm shared by the hub cache
//! and every observer store. A merge places the incoming batch at the
//! front in its own order, drops any retained event whose id appears in
//! the batch, and truncates to capacity.

use std::collections::HashSet;

use worldpulse_types::{Event, EventId};

/// Default number of events retained by a window.
pub const DEFAULT_CAPACITY: usize = 100;

/// The most recent events, unique by id, newest merge first.
#[derive(Debug, Clone, PartialEq)]
pub struct EventWindow {
    events: Vec<Event>,
    capacity: usize,
}

impl EventWindow {
    /// Create an empty window holding at most `capacity` events.
    ///
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Merge a batch into the window and return the new contents.
    ///
    /// Events in `batch` replace any retained event with the same id and
    /// move to the front, keeping the batch order. The batch is trusted
    /// to be free of internal duplicates.
    pub fn merge(&mut self, batch: &[Event]) -> &[Event] {
        if batch.is_empty() {
            return &self.events;
        }

        let incoming: HashSet<&EventId> = batch.iter().map(|e| &e.id).collect();

        let mut merged: Vec<Event> = Vec::with_capacity(self.capacity);
        merged.extend(batch.iter().take(self.capacity).cloned());

        let room = self.capacity.saturating_sub(merged.len());
        merged.extend(
            self.events
                .drain(..)
                .filter(|e| !incoming.contains(&e.id))
                .take(room),
        );

        self.events = merged;
        &self.events
    }

    /// Replace the contents with `events`, truncated to capacity.
    pub fn replace(&mut self, mut events: Vec<Event>) {
        events.truncate(self.capacity);
        self.events = events;
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> Vec<Event> {
        self.events.clone()
    }

    /// The current contents.
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Look up an event by id.
    pub fn get(&self, id: &EventId) -> Option<&Event> {
        self.events.iter().find(|e| &e.id == id)
    }

    /// Number of events held.
    pub const fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the window holds no events.
    pub const fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Maximum number of events held.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
