//! Catch-up resolution against the event log
//!
//! Answers "what changed since version V" for a reconnecting client and
//! decides when replay can no longer close the gap.
//!
//! Boundary: a client at `oldest - 1` is exactly caught up to the start of
//! the retained window and replays everything. Only a strictly older
//! checkpoint requires a resync.

use std::sync::Arc;

use serde::Serialize;

use crate::event_log::EventLog;
use crate::events::{ChangeEvent, Version};

/// Outcome of a catch-up query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSet {
    /// Events after the requested version, ascending. Empty on resync.
    pub events: Vec<Arc<ChangeEvent>>,
    /// The requested checkpoint predates the retained history.
    pub resync_required: bool,
    /// Live version counter at query time.
    pub current_version: Version,
}

impl ChangeSet {
    /// Result for an entity that has never published anything.
    pub fn empty(current_version: Version) -> Self {
        Self {
            events: Vec::new(),
            resync_required: false,
            current_version,
        }
    }
}

/// Resolve the events a client at `since` has missed.
pub fn resolve(log: &EventLog, since: Version, current_version: Version) -> ChangeSet {
    let Some(oldest) = log.oldest_version() else {
        return ChangeSet::empty(current_version);
    };

    if since.saturating_add(1) < oldest {
        return ChangeSet {
            events: Vec::new(),
            resync_required: true,
            current_version,
        };
    }

    ChangeSet {
        events: log.after(since),
        resync_required: false,
        current_version,
    }
}
