//! Streaming sessions
//!
//! One `StreamSession` per open stream turns a subscription plus its catch-up
//! result into an ordered sequence of wire frames:
//!
//! ```text
//! Starting ──► CaughtUp ──► Streaming ──► Closed
//!   hello +      startup      live events
//!   backlog or   frames sent  and pings
//!   resync
//! ```
//!
//! Any state moves to `Closed` on disconnect.
//!
//! Every frame carries a version as its reconnect id: `hello` carries the
//! entity's version at open, replayed and live events their own version, and
//! `ping` the last version forwarded (its body reports the live version). A client that reconnects with the last id it saw resumes with no
//! gap and no duplicate, except across a signalled resync.
//!
//! Dropping a session (the transport went away) closes it; the subscription
//! is released exactly once either way.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::catchup::ChangeSet;
use crate::events::{ChangeEvent, Version};
use crate::feed::{ChangeFeed, Subscription};
use crate::metrics::FeedMetrics;

/// Control frame names.
pub mod frame {
    pub const HELLO: &str = "hello";
    pub const RESYNC_REQUIRED: &str = "resync_required";
    pub const PING: &str = "ping";
}

/// Reason reported in `resync_required` frames.
pub const RESYNC_REASON_GAP: &str = "event_buffer_gap";

/// Lifecycle of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Subscribed; catch-up being computed and queued.
    Starting,
    /// `hello` and the backlog (or resync signal) are queued for sending.
    CaughtUp,
    /// Forwarding live events and heartbeats.
    Streaming,
    /// Terminal. The subscription has been released.
    Closed,
}

/// Inputs that drive session state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// Backlog queued for replay.
    BacklogQueued,
    /// Retained history cannot close the gap; resync signalled instead.
    ResyncQueued,
    /// All startup frames sent; waiting on live events.
    StartupFlushed,
    /// Transport gone or session closed explicitly.
    Disconnected,
}

impl SessionState {
    /// Transition table. Signals that do not apply leave the state unchanged.
    pub fn on(self, signal: SessionSignal) -> SessionState {
        use SessionSignal::*;
        use SessionState::*;

        match (self, signal) {
            (Closed, _) => Closed,
            (_, Disconnected) => Closed,
            (Starting, BacklogQueued) | (Starting, ResyncQueued) => CaughtUp,
            (CaughtUp, StartupFlushed) => Streaming,
            (state, _) => state,
        }
    }
}

/// Body of a wire frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FrameData {
    Change(Arc<ChangeEvent>),
    Control(Value),
}

/// One named, versioned frame on the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct WireFrame {
    /// Reconnect id.
    pub id: Version,
    /// Event name: a control name or the change's event type.
    pub name: String,
    pub data: FrameData,
}

impl WireFrame {
    fn change(event: Arc<ChangeEvent>) -> Self {
        Self {
            id: event.version,
            name: event.event_type.clone(),
            data: FrameData::Change(event),
        }
    }

    fn control(name: &str, id: Version, data: Value) -> Self {
        Self {
            id,
            name: name.to_string(),
            data: FrameData::Control(data),
        }
    }
}

/// Pick the checkpoint a stream resumes from.
///
/// A numeric resume token (the `Last-Event-ID` the client saw last) wins over
/// the query parameter; malformed tokens are ignored.
pub fn resolve_since(query_since: Option<Version>, resume_token: Option<&str>) -> Version {
    resume_token
        .and_then(|token| token.trim().parse::<Version>().ok())
        .or(query_since)
        .unwrap_or(0)
}

/// Per-connection stream state machine.
pub struct StreamSession {
    entity_id: String,
    state: SessionState,
    subscription: Option<Subscription>,
    startup: VecDeque<WireFrame>,
    last_event_version: Version,
    heartbeat: Duration,
    metrics: Arc<FeedMetrics>,
}

impl StreamSession {
    /// Subscribe to `entity_id` and queue the startup frames.
    pub fn open(feed: &ChangeFeed, entity_id: &str, since: Version) -> Self {
        let metrics = Arc::clone(feed.metrics());
        let heartbeat = feed.config().heartbeat_interval;
        let (subscription, changes) = feed.subscribe_from(entity_id, since);
        metrics.session_opened();

        let mut session = Self {
            entity_id: entity_id.to_string(),
            state: SessionState::Starting,
            subscription: Some(subscription),
            startup: VecDeque::new(),
            last_event_version: 0,
            heartbeat,
            metrics,
        };
        session.queue_startup(since, changes);
        session
    }

    fn queue_startup(&mut self, since: Version, changes: ChangeSet) {
        let ChangeSet {
            events,
            resync_required,
            current_version,
        } = changes;
        let backlog = events.len();
        // The mailbox only ever holds versions above the catch-up point
        self.last_event_version = current_version;

        self.startup.push_back(WireFrame::control(
            frame::HELLO,
            current_version,
            json!({
                "home_id": self.entity_id,
                "version": current_version,
            }),
        ));

        let signal = if resync_required {
            self.metrics.record_resync();
            self.startup.push_back(WireFrame::control(
                frame::RESYNC_REQUIRED,
                current_version,
                json!({
                    "home_id": self.entity_id,
                    "current_version": current_version,
                    "reason": RESYNC_REASON_GAP,
                }),
            ));
            SessionSignal::ResyncQueued
        } else {
            self.metrics.record_backlog(backlog as u64);
            self.startup.extend(events.into_iter().map(WireFrame::change));
            SessionSignal::BacklogQueued
        };

        info!(
            home_id = %self.entity_id,
            since,
            current_version,
            resync_required,
            backlog,
            "Stream session opened"
        );
        self.transition(signal);
    }

    fn transition(&mut self, signal: SessionSignal) {
        let next = self.state.on(signal);
        if next != self.state {
            debug!(home_id = %self.entity_id, from = ?self.state, to = ?next, "Session transition");
            self.state = next;
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Produce the next frame, waiting for a live event or the heartbeat.
    ///
    /// Returns `None` once the session is closed.
    pub async fn next_frame(&mut self) -> Option<WireFrame> {
        if self.state == SessionState::Closed {
            return None;
        }

        if let Some(frame) = self.startup.pop_front() {
            return Some(frame);
        }
        self.transition(SessionSignal::StartupFlushed);

        let subscription = self.subscription.as_ref()?;
        loop {
            match tokio::time::timeout(self.heartbeat, subscription.mailbox().recv()).await {
                Ok(event) => {
                    // Anything at or below the last sent version was in the backlog
                    if event.version <= self.last_event_version {
                        continue;
                    }
                    self.last_event_version = event.version;
                    return Some(WireFrame::change(event));
                }
                Err(_) => {
                    // A publish may land after the timeout; the reconnect id
                    // must not pass events still queued in the mailbox
                    let version = subscription.current_version();
                    self.metrics.record_heartbeat();
                    return Some(WireFrame::control(
                        frame::PING,
                        self.last_event_version,
                        json!({
                            "home_id": self.entity_id,
                            "version": version,
                            "ts": chrono::Utc::now().timestamp(),
                        }),
                    ));
                }
            }
        }
    }

    /// Close the session and release its subscription. Idempotent.
    pub fn close(&mut self) {
        self.transition(SessionSignal::Disconnected);
        if let Some(subscription) = self.subscription.take() {
            let subscriber_id = subscription.id();
            drop(subscription);
            self.metrics.session_closed();
            info!(home_id = %self.entity_id, subscriber_id, "Stream session closed");
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}
