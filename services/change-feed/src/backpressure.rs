//! Bounded subscriber mailboxes with drop-oldest overflow
//!
//! Every streaming session drains exactly one mailbox; only the publisher
//! writes into it. Publishing must never wait on a slow reader, so a full
//! mailbox sheds its oldest queued event to make room for the new one. A
//! reader that falls this far behind will see a version gap and is expected
//! to resync from a full snapshot rather than rely on replay.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::events::{ChangeEvent, Version};

/// Default number of undelivered events a subscriber may hold.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 200;

/// Unique subscriber identifier.
pub type SubscriberId = u64;

/// What happened to an offered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued without loss.
    Queued,
    /// Queued after evicting the oldest pending event.
    EvictedOldest { evicted_version: Version },
    /// Not queued; the mailbox has no room at all.
    Dropped,
}

/// Single-reader, publisher-written event queue.
#[derive(Debug)]
pub struct Mailbox {
    queue: Mutex<VecDeque<Arc<ChangeEvent>>>,
    capacity: usize,
    ready: Notify,
    evicted: AtomicU64,
    dropped: AtomicU64,
    /// Set on the first loss, cleared once an offer fits again.
    lagging: AtomicBool,
}

impl Mailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            ready: Notify::new(),
            evicted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            lagging: AtomicBool::new(false),
        }
    }

    /// Enqueue without blocking, shedding the oldest event when full.
    pub fn offer(&self, event: Arc<ChangeEvent>) -> Delivery {
        let delivery = {
            let mut queue = self.queue.lock();

            let mut delivery = Delivery::Queued;
            if queue.len() >= self.capacity {
                if let Some(oldest) = queue.pop_front() {
                    self.evicted.fetch_add(1, Ordering::Relaxed);
                    delivery = Delivery::EvictedOldest {
                        evicted_version: oldest.version,
                    };
                }
            }

            if queue.len() < self.capacity {
                queue.push_back(event);
                if delivery == Delivery::Queued {
                    self.lagging.store(false, Ordering::Relaxed);
                }
                delivery
            } else {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Delivery::Dropped
            }
        };

        if delivery != Delivery::Dropped {
            self.ready.notify_one();
        }
        delivery
    }

    /// Take the next event if one is queued.
    pub fn try_recv(&self) -> Option<Arc<ChangeEvent>> {
        self.queue.lock().pop_front()
    }

    /// Wait for the next event.
    ///
    /// Cancel safe: an event is only removed from the queue once this future
    /// completes.
    pub async fn recv(&self) -> Arc<ChangeEvent> {
        loop {
            if let Some(event) = self.try_recv() {
                return event;
            }
            self.ready.notified().await;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events shed to make room for newer ones.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Events that could not be queued at all.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Mark the mailbox as losing events. Returns true only on the transition
    /// into lagging, so callers can report a stall once.
    pub fn start_lagging(&self) -> bool {
        !self.lagging.swap(true, Ordering::Relaxed)
    }

    pub fn is_lagging(&self) -> bool {
        self.lagging.load(Ordering::Relaxed)
    }

    /// Snapshot of the queued versions, oldest first.
    pub fn queued_versions(&self) -> Vec<Version> {
        self.queue.lock().iter().map(|e| e.version).collect()
    }
}
