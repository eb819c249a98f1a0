//! Identifier types for building entities
//!
//! Identifiers are opaque strings on the wire so that saved homes created by
//! other tools round-trip untouched. Freshly created entities get a UUID v7
//! string, which keeps newly added elements in creation order.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a home.
///
/// A home is the unit the change feed versions: every home owns an
/// independent version counter, event log and subscriber set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HomeId(String);

impl HomeId {
    /// Generate a new unique HomeId
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the id string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for HomeId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for HomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HomeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for HomeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of a light fixture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LightId(String);

impl LightId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LightId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for LightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LightId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of any other building element (floor, wall, window, cube).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::generate()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
