//! Observability counters for the change feed
//!
//! Lock-free counters updated on the publish and session paths. A
//! serializable snapshot is exposed over HTTP for scraping.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Core metrics for the change feed.
#[derive(Debug, Default)]
pub struct FeedMetrics {
    // Publishing
    pub events_published: AtomicU64,
    pub deliveries: AtomicU64,

    // Backpressure
    pub mailbox_evictions: AtomicU64,
    pub mailbox_drops: AtomicU64,

    // Sessions
    pub active_sessions: AtomicU64,
    pub sessions_opened: AtomicU64,
    pub heartbeats_sent: AtomicU64,
    pub resyncs_signalled: AtomicU64,
    pub backlog_events_replayed: AtomicU64,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a published event and how many mailboxes accepted it.
    pub fn record_publish(&self, delivered: u64) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered, Ordering::Relaxed);
    }

    /// Record an event shed from a full mailbox.
    pub fn record_eviction(&self) {
        self.mailbox_evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an event that could not be queued for a subscriber.
    pub fn record_drop(&self) {
        self.mailbox_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        // Saturate rather than wrap if a close is ever unpaired
        let _ = self
            .active_sessions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn record_heartbeat(&self) {
        self.heartbeats_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resync(&self) {
        self.resyncs_signalled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backlog(&self, events: u64) {
        self.backlog_events_replayed.fetch_add(events, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_published: self.events_published.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            mailbox_evictions: self.mailbox_evictions.load(Ordering::Relaxed),
            mailbox_drops: self.mailbox_drops.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            heartbeats_sent: self.heartbeats_sent.load(Ordering::Relaxed),
            resyncs_signalled: self.resyncs_signalled.load(Ordering::Relaxed),
            backlog_events_replayed: self.backlog_events_replayed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_published: u64,
    pub deliveries: u64,
    pub mailbox_evictions: u64,
    pub mailbox_drops: u64,
    pub active_sessions: u64,
    pub sessions_opened: u64,
    pub heartbeats_sent: u64,
    pub resyncs_signalled: u64,
    pub backlog_events_replayed: u64,
}
