//! Change publisher and subscription registry
//!
//! Each entity owns one `EntityFeed`: its version counter, event log and
//! subscriber set live together behind a single mutex. That mutex is the
//! entity's ordering point. Publishing increments the version, appends to the
//! log and fans out to every mailbox while holding it, so no reader can
//! observe a version without its log entry, and every subscriber sees each
//! event either fully or not at all relative to its registration.
//!
//! Entities are independent: they live in a sharded map and never share a
//! lock.
//!
//! ```text
//!  publish ──► EntityFeed (mutex) ──► version += 1
//!                                 ├─► EventLog::append
//!                                 └─► Mailbox::offer (each subscriber)
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::backpressure::{Delivery, Mailbox, SubscriberId};
use crate::catchup::{self, ChangeSet};
use crate::config::FeedConfig;
use crate::event_log::EventLog;
use crate::events::{ChangeEvent, Payload, Version};
use crate::metrics::FeedMetrics;

/// Mutable state of one entity, guarded by `EntityFeed::state`.
#[derive(Debug)]
struct EntityState {
    version: Version,
    log: EventLog,
    subscribers: BTreeMap<SubscriberId, Arc<Mailbox>>,
}

/// Version counter, event log and subscriber set of one entity.
#[derive(Debug)]
pub struct EntityFeed {
    entity_id: String,
    mailbox_capacity: usize,
    state: Mutex<EntityState>,
    metrics: Arc<FeedMetrics>,
}

impl EntityFeed {
    fn new(entity_id: String, config: &FeedConfig, metrics: Arc<FeedMetrics>) -> Self {
        Self {
            entity_id,
            mailbox_capacity: config.mailbox_capacity,
            state: Mutex::new(EntityState {
                version: 0,
                log: EventLog::new(config.log_capacity),
                subscribers: BTreeMap::new(),
            }),
            metrics,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn current_version(&self) -> Version {
        self.state.lock().version
    }

    fn publish(&self, event_type: String, payload: Payload) -> Arc<ChangeEvent> {
        let mut state = self.state.lock();

        state.version += 1;
        let event = Arc::new(ChangeEvent {
            event_type,
            entity_id: self.entity_id.clone(),
            version: state.version,
            ts: chrono::Utc::now().timestamp(),
            payload,
        });
        state.log.append(Arc::clone(&event));

        let mut delivered = 0;
        for (&subscriber_id, mailbox) in &state.subscribers {
            match mailbox.offer(Arc::clone(&event)) {
                Delivery::Queued => delivered += 1,
                Delivery::EvictedOldest { evicted_version } => {
                    delivered += 1;
                    self.metrics.record_eviction();
                    if mailbox.start_lagging() {
                        warn!(
                            entity_id = %self.entity_id,
                            subscriber_id,
                            evicted_version,
                            version = event.version,
                            "Subscriber lagging: mailbox full, evicting oldest events"
                        );
                    } else {
                        debug!(
                            entity_id = %self.entity_id,
                            subscriber_id,
                            evicted_version,
                            "Evicted oldest event"
                        );
                    }
                }
                Delivery::Dropped => {
                    self.metrics.record_drop();
                    if mailbox.start_lagging() {
                        warn!(
                            entity_id = %self.entity_id,
                            subscriber_id,
                            version = event.version,
                            "Subscriber lagging: mailbox has no room, dropping events"
                        );
                    } else {
                        debug!(
                            entity_id = %self.entity_id,
                            subscriber_id,
                            version = event.version,
                            "Dropped event"
                        );
                    }
                }
            }
        }
        self.metrics.record_publish(delivered);

        debug!(
            entity_id = %self.entity_id,
            version = event.version,
            event_type = %event.event_type,
            subscribers = state.subscribers.len(),
            "Event published"
        );

        event
    }

    fn changes_since(&self, since: Version) -> ChangeSet {
        let state = self.state.lock();
        catchup::resolve(&state.log, since, state.version)
    }

    fn add_subscriber(&self, id: SubscriberId, since: Option<Version>) -> (Arc<Mailbox>, Option<ChangeSet>) {
        let mailbox = Arc::new(Mailbox::new(self.mailbox_capacity));

        let mut state = self.state.lock();
        state.subscribers.insert(id, Arc::clone(&mailbox));
        let changes = since.map(|since| catchup::resolve(&state.log, since, state.version));

        debug!(
            entity_id = %self.entity_id,
            subscriber_id = id,
            subscribers = state.subscribers.len(),
            "Subscriber registered"
        );
        (mailbox, changes)
    }

    fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let mut state = self.state.lock();
        let removed = state.subscribers.remove(&id).is_some();
        if state.subscribers.is_empty() {
            // Release the set's storage; version and log stay
            state.subscribers = BTreeMap::new();
        }

        if removed {
            debug!(
                entity_id = %self.entity_id,
                subscriber_id = id,
                subscribers = state.subscribers.len(),
                "Subscriber unregistered"
            );
        }
        removed
    }

    fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

/// A registered mailbox. Dropping it unregisters the subscriber.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    mailbox: Arc<Mailbox>,
    entity: Arc<EntityFeed>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn entity_id(&self) -> &str {
        self.entity.entity_id()
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Live version counter of the subscribed entity.
    pub fn current_version(&self) -> Version {
        self.entity.current_version()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.entity.remove_subscriber(self.id);
    }
}

/// Change feed across all entities.
pub struct ChangeFeed {
    entities: DashMap<String, Arc<EntityFeed>>,
    config: FeedConfig,
    metrics: Arc<FeedMetrics>,
    next_subscriber: AtomicU64,
}

impl ChangeFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            entities: DashMap::new(),
            config,
            metrics: Arc::new(FeedMetrics::new()),
            next_subscriber: AtomicU64::new(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FeedConfig::default())
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<FeedMetrics> {
        &self.metrics
    }

    fn entity(&self, entity_id: &str) -> Option<Arc<EntityFeed>> {
        self.entities.get(entity_id).map(|e| Arc::clone(e.value()))
    }

    fn entity_or_create(&self, entity_id: &str) -> Arc<EntityFeed> {
        if let Some(entity) = self.entity(entity_id) {
            return entity;
        }
        // The map guard is released before the entity mutex is ever taken
        let entry = self.entities.entry(entity_id.to_string()).or_insert_with(|| {
            Arc::new(EntityFeed::new(
                entity_id.to_string(),
                &self.config,
                Arc::clone(&self.metrics),
            ))
        });
        Arc::clone(entry.value())
    }

    /// Record a change and broadcast it to the entity's live subscribers.
    ///
    /// Never fails and never waits on a subscriber.
    pub fn publish(
        &self,
        entity_id: &str,
        event_type: impl Into<String>,
        payload: Payload,
    ) -> Arc<ChangeEvent> {
        self.entity_or_create(entity_id)
            .publish(event_type.into(), payload)
    }

    /// Events after `since` for catch-up, or a resync signal.
    pub fn changes_since(&self, entity_id: &str, since: Version) -> ChangeSet {
        match self.entity(entity_id) {
            Some(entity) => entity.changes_since(since),
            None => ChangeSet::empty(0),
        }
    }

    pub fn current_version(&self, entity_id: &str) -> Version {
        self.entity(entity_id)
            .map(|e| e.current_version())
            .unwrap_or(0)
    }

    /// Register a new mailbox for live events of `entity_id`.
    pub fn register(&self, entity_id: &str) -> Subscription {
        let (subscription, _) = self.attach(entity_id, None);
        subscription
    }

    /// Register a mailbox and resolve catch-up under the same lock.
    ///
    /// Every event is then in exactly one of the returned change set or the
    /// mailbox.
    pub fn subscribe_from(&self, entity_id: &str, since: Version) -> (Subscription, ChangeSet) {
        let (subscription, changes) = self.attach(entity_id, Some(since));
        let changes = changes.unwrap_or_else(|| ChangeSet::empty(subscription.current_version()));
        (subscription, changes)
    }

    fn attach(&self, entity_id: &str, since: Option<Version>) -> (Subscription, Option<ChangeSet>) {
        let entity = self.entity_or_create(entity_id);
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let (mailbox, changes) = entity.add_subscriber(id, since);
        (Subscription { id, mailbox, entity }, changes)
    }

    /// Remove a subscriber by id. Returns whether it was registered.
    ///
    /// Dropping the `Subscription` has the same effect.
    pub fn unregister(&self, entity_id: &str, subscriber_id: SubscriberId) -> bool {
        self.entity(entity_id)
            .map(|e| e.remove_subscriber(subscriber_id))
            .unwrap_or(false)
    }

    pub fn subscriber_count(&self, entity_id: &str) -> usize {
        self.entity(entity_id)
            .map(|e| e.subscriber_count())
            .unwrap_or(0)
    }

    /// Number of entities with any feed state.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    use crate::events::payload_from;

    fn small_feed(log_capacity: usize, mailbox_capacity: usize) -> ChangeFeed {
        ChangeFeed::new(FeedConfig {
            log_capacity,
            mailbox_capacity,
            heartbeat_interval: Duration::from_secs(25),
        })
    }

    fn light_payload(on: bool) -> Payload {
        payload_from(json!({"lights": [{"id": "light-a", "state": {"on": on}}]}))
    }

    #[test]
    fn test_publish_assigns_versions() {
        let feed = ChangeFeed::with_defaults();
        let e1 = feed.publish("home-1", "lights_changed", light_payload(true));
        let e2 = feed.publish("home-1", "lights_changed", light_payload(false));

        assert_eq!(e1.version, 1);
        assert_eq!(e2.version, 2);
        assert_eq!(e1.entity_id, "home-1");
        assert_eq!(feed.current_version("home-1"), 2);
    }

    #[test]
    fn test_entities_are_independent() {
        let feed = ChangeFeed::with_defaults();
        feed.publish("home-1", "lights_changed", Payload::new());
        feed.publish("home-1", "lights_changed", Payload::new());
        let other = feed.publish("home-2", "lights_changed", Payload::new());

        assert_eq!(other.version, 1);
        assert_eq!(feed.current_version("home-1"), 2);
        assert_eq!(feed.entity_count(), 2);
    }

    #[test]
    fn test_unknown_entity_reads_are_empty() {
        let feed = ChangeFeed::with_defaults();
        assert_eq!(feed.changes_since("nope", 0), ChangeSet::empty(0));
        assert_eq!(feed.current_version("nope"), 0);
        // Reads do not allocate feed state
        assert_eq!(feed.entity_count(), 0);
    }

    #[test]
    fn test_n_publishes_fill_log() {
        let feed = small_feed(50, 10);
        for _ in 0..120 {
            feed.publish("home-1", "lights_changed", Payload::new());
        }

        assert_eq!(feed.current_version("home-1"), 120);
        // since = oldest - 1 replays the whole window
        let set = feed.changes_since("home-1", 70);
        assert!(!set.resync_required);
        let versions: Vec<Version> = set.events.iter().map(|e| e.version).collect();
        assert_eq!(versions, (71..=120).collect::<Vec<_>>());
    }

    #[test]
    fn test_fresh_register_at_current_version() {
        let feed = ChangeFeed::with_defaults();
        feed.publish("home-1", "lights_changed", Payload::new());
        let _sub = feed.register("home-1");

        let current = feed.current_version("home-1");
        let set = feed.changes_since("home-1", current);
        assert!(set.events.is_empty());
        assert!(!set.resync_required);
        assert_eq!(set.current_version, current);
    }

    #[test]
    fn test_capacity_plus_five_resyncs() {
        let feed = ChangeFeed::with_defaults();
        for _ in 0..1005 {
            feed.publish("home-1", "lights_changed", Payload::new());
        }

        let set = feed.changes_since("home-1", 0);
        assert!(set.resync_required);
        assert_eq!(set.current_version, 1005);

        let set = feed.changes_since("home-1", 5);
        assert!(!set.resync_required);
        assert_eq!(set.events.len(), 1000);
        assert_eq!(set.events.first().unwrap().version, 6);
    }

    #[test]
    fn test_fan_out_to_all_subscribers() {
        let feed = ChangeFeed::with_defaults();
        let a = feed.register("home-1");
        let b = feed.register("home-1");
        let other = feed.register("home-2");

        feed.publish("home-1", "lights_changed", light_payload(true));

        assert_eq!(a.mailbox().try_recv().unwrap().version, 1);
        assert_eq!(b.mailbox().try_recv().unwrap().version, 1);
        assert!(other.mailbox().is_empty());
        assert_eq!(feed.metrics().snapshot().deliveries, 2);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let feed = ChangeFeed::with_defaults();
        feed.publish("home-1", "lights_changed", Payload::new());
        let sub = feed.register("home-1");
        feed.publish("home-1", "lights_changed", Payload::new());

        assert_eq!(sub.mailbox().queued_versions(), vec![2]);
    }

    #[test]
    fn test_slow_subscriber_keeps_most_recent() {
        let feed = small_feed(1000, 200);
        let sub = feed.register("home-1");

        for _ in 0..350 {
            feed.publish("home-1", "lights_changed", Payload::new());
        }

        assert_eq!(sub.mailbox().len(), 200);
        assert_eq!(sub.mailbox().queued_versions(), (151..=350).collect::<Vec<_>>());
        assert_eq!(feed.metrics().snapshot().mailbox_evictions, 150);
        // Every eviction is counted but the stall is flagged once
        assert!(sub.mailbox().is_lagging());
        assert!(!sub.mailbox().start_lagging());
    }

    #[test]
    fn test_drop_unregisters() {
        let feed = ChangeFeed::with_defaults();
        let sub = feed.register("home-1");
        assert_eq!(feed.subscriber_count("home-1"), 1);

        drop(sub);
        assert_eq!(feed.subscriber_count("home-1"), 0);

        // Version and log outlive the subscriber set
        feed.publish("home-1", "lights_changed", Payload::new());
        assert_eq!(feed.changes_since("home-1", 0).events.len(), 1);
    }

    #[test]
    fn test_explicit_unregister_is_idempotent() {
        let feed = ChangeFeed::with_defaults();
        let sub = feed.register("home-1");

        assert!(feed.unregister("home-1", sub.id()));
        assert!(!feed.unregister("home-1", sub.id()));
        assert!(!feed.unregister("unknown", sub.id()));

        // The drop afterwards is a no-op
        drop(sub);
        assert_eq!(feed.subscriber_count("home-1"), 0);
    }

    #[test]
    fn test_unregistered_mailbox_gets_nothing() {
        let feed = ChangeFeed::with_defaults();
        let sub = feed.register("home-1");
        feed.unregister("home-1", sub.id());

        feed.publish("home-1", "lights_changed", Payload::new());
        assert!(sub.mailbox().is_empty());
    }

    #[test]
    fn test_subscribe_from_splits_backlog_and_live() {
        let feed = ChangeFeed::with_defaults();
        feed.publish("home-1", "lights_changed", Payload::new());
        feed.publish("home-1", "lights_changed", Payload::new());

        let (sub, set) = feed.subscribe_from("home-1", 0);
        feed.publish("home-1", "lights_changed", Payload::new());

        let backlog: Vec<Version> = set.events.iter().map(|e| e.version).collect();
        assert_eq!(backlog, vec![1, 2]);
        assert_eq!(set.current_version, 2);
        assert_eq!(sub.mailbox().queued_versions(), vec![3]);
    }

    #[test]
    fn test_concurrent_publishers_stay_gapless() {
        let feed = Arc::new(small_feed(10_000, 10_000));
        let sub = feed.register("home-1");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let feed = Arc::clone(&feed);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        feed.publish("home-1", "lights_changed", Payload::new());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(feed.current_version("home-1"), 2000);
        // Fan-out order matches version order for every subscriber
        assert_eq!(sub.mailbox().queued_versions(), (1..=2000).collect::<Vec<_>>());
    }
}
