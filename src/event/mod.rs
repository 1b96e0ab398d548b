//! Event data model.
//!
//! This module defines [`Event`], the immutable record that flows through
//! the network, its opaque identity [`EventId`], its dynamic property
//! mapping ([`value::PropertyValue`]), and [`EventTemplate`], the prototype
//! rules and pattern compositions instantiate derived events from.
//!
//! # Sub-modules
//!
//! - [`value`]: the `PropertyValue` tagged union and `PropertyMap` alias.

pub mod value;

pub use value::{PropertyMap, PropertyValue};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, globally-unique event identity.
///
/// Backed by a random (v4) 128-bit UUID per spec.md §6 ("Implementations
/// SHOULD use 128-bit random ids to avoid collisions across restarts").
/// Deliberately has no ordering relationship to insertion time or to any
/// other `EventId` — relation algebra and revision counters are the only
/// sanctioned way to reason about an event's position in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Mint a fresh, unique id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct from a raw UUID. Exposed for deterministic test fixtures
    /// and for callers that persist/replay ids across process boundaries.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable, timestamped observation or derivation.
///
/// Constructed exactly once — by ingest (for leaf/observed events) or by
/// materialization (for derived events) — and never mutated afterward. The
/// network stores `Event` by value; all traversal operations hand back
/// clones or shared references, never a mutable view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: String,
    pub event_domain: String,
    pub properties: PropertyMap,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Build a new event without an id (the network assigns one on
    /// [`crate::network::EventNetwork::add_event`]) from an already-known
    /// `timestamp` — derived events always have one (the earliest
    /// contributor timestamp, spec.md §7). An observed event with no
    /// timestamp yet should go through [`ObservedEvent`] and
    /// [`crate::network::EventNetwork::add_observed_event`] instead, which
    /// resolves "unset" to wall-clock `now` at the network boundary.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        event_domain: impl Into<String>,
        properties: PropertyMap,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(),
            event_type: event_type.into(),
            event_domain: event_domain.into(),
            properties,
            timestamp,
        }
    }
}

/// An observed event with no timestamp yet assigned — the caller doesn't
/// have one in hand (a live sensor feed, a webhook with no event-time
/// field). [`crate::network::EventNetwork::add_observed_event`] resolves it
/// to wall-clock `now` at ingestion, per spec.md §4.1's `AddEvent`: "if
/// timestamp is unset, default to now."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedEvent {
    pub event_type: String,
    pub event_domain: String,
    pub properties: PropertyMap,
}

impl ObservedEvent {
    #[must_use]
    pub fn new(event_type: impl Into<String>, event_domain: impl Into<String>, properties: PropertyMap) -> Self {
        Self { event_type: event_type.into(), event_domain: event_domain.into(), properties }
    }
}

/// A prototype for a materialized derived event: the type/domain a rule or
/// pattern composition produces, plus a property prototype copied verbatim
/// into the derived event (materialization does not interpolate or
/// template-substitute property values — it is a direct copy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub event_type: String,
    pub event_domain: String,
    pub properties: PropertyMap,
}

impl EventTemplate {
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        event_domain: impl Into<String>,
        properties: PropertyMap,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            event_domain: event_domain.into(),
            properties,
        }
    }

    /// Instantiate an event from this template at the given timestamp (the
    /// earliest-contributor timestamp per spec.md §7). The id is assigned
    /// later, by the network, on insertion.
    #[must_use]
    pub fn instantiate(&self, timestamp: DateTime<Utc>) -> Event {
        Event::new(
            self.event_type.clone(),
            self.event_domain.clone(),
            self.properties.clone(),
            timestamp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn template_instantiates_with_given_timestamp() {
        let template = EventTemplate::new("cpu_critical", "infra", PropertyMap::new());
        let ts = Utc::now();
        let event = template.instantiate(ts);
        assert_eq!(event.event_type, "cpu_critical");
        assert_eq!(event.event_domain, "infra");
        assert_eq!(event.timestamp, ts);
    }
}
