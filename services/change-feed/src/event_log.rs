//! Bounded per-entity event log
//!
//! Holds the most recent events of one entity in a ring buffer, oldest
//! evicted first. The retained events always form a contiguous version run
//! `[oldest ..= newest]`; once more events than the capacity have been
//! appended, older versions are gone for good and a reconnecting client must
//! resync from a full snapshot.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::events::{ChangeEvent, Version};

/// Default number of events retained per entity.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Ring buffer of recent events for one entity.
#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<Arc<ChangeEvent>>,
    capacity: usize,
}

impl EventLog {
    /// Create a log retaining at most `capacity` events (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, evicting the oldest one when at capacity.
    ///
    /// Returns the evicted event, if any. The caller must append versions in
    /// gapless ascending order.
    pub fn append(&mut self, event: Arc<ChangeEvent>) -> Option<Arc<ChangeEvent>> {
        debug_assert!(
            self.newest_version().map_or(true, |v| event.version == v + 1),
            "event log versions must be contiguous"
        );

        let evicted = if self.events.len() >= self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Version of the oldest retained event.
    pub fn oldest_version(&self) -> Option<Version> {
        self.events.front().map(|e| e.version)
    }

    /// Version of the newest retained event.
    pub fn newest_version(&self) -> Option<Version> {
        self.events.back().map(|e| e.version)
    }

    /// Retained events with `version > since`, oldest first.
    pub fn after(&self, since: Version) -> Vec<Arc<ChangeEvent>> {
        // Versions are contiguous, so the start index is computable directly.
        let skip = match self.oldest_version() {
            Some(oldest) if since >= oldest => (since - oldest + 1) as usize,
            _ => 0,
        };
        self.events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ChangeEvent>> {
        self.events.iter()
    }
}
