//! Change event definitions
//!
//! A `ChangeEvent` records one observable mutation of a home. Events are
//! immutable once published and shared by `Arc` between the event log and
//! every subscriber mailbox that receives them.
//!
//! Wire shape (flattened, as clients expect):
//!
//! ```json
//! {"type": "lights_changed", "home_id": "h1", "version": 7, "ts": 1708123456,
//!  "lights": [...]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-entity sequence number. 0 means "no events yet".
pub type Version = u64;

/// Structured event body. Its top-level keys sit beside the envelope fields.
pub type Payload = Map<String, Value>;

/// Event types published by the model-mutation layer.
pub mod kind {
    pub const LIGHTS_CHANGED: &str = "lights_changed";
    pub const BACKGROUND_CHANGED: &str = "background_changed";
    pub const HOME_UPDATED: &str = "home_updated";
}

/// A single versioned change to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Event type tag, also used as the SSE event name
    #[serde(rename = "type")]
    pub event_type: String,
    /// Entity this event belongs to
    #[serde(rename = "home_id")]
    pub entity_id: String,
    /// Version assigned by the publisher
    pub version: Version,
    /// Unix seconds at publish time
    pub ts: i64,
    #[serde(flatten)]
    pub payload: Payload,
}

/// Events of one entity order by version.
impl Ord for ChangeEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version.cmp(&other.version)
    }
}

impl PartialOrd for ChangeEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Build a payload from a JSON value.
///
/// Objects are used as-is; any other value is nested under `"value"` so the
/// flattened wire shape stays an object.
pub fn payload_from(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
