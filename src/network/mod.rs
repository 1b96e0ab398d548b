//! The event network: an append-only, immutable event DAG.
//!
//! [`EventNetwork`] owns every event ever ingested plus the contributor→
//! derived edges materialization draws between them. Structurally edges
//! point from contributor to derived event; semantically "meaning" flows
//! the other way, from derived events back down to what produced them.
//! Every edge also carries a relation tag — which rule (or pattern
//! composition) produced it — so a consumer can tell an ordinary
//! rule-derivation edge apart from a `pattern_composition` one.
//! [`relations`] builds the full relation algebra (children, parents,
//! ancestors, descendants, siblings, peers, cousins) on top of this single
//! adjacency representation.
//!
//! All mutation goes through a single [`std::sync::RwLock`]-guarded inner
//! struct; reads take a shared lock and may run fully in parallel with each
//! other, matching the single-writer/many-reader model in spec.md §5.
//!
//! Revision counters are tracked per event id (`InRev`/`OutRev`) and per
//! event type (`TypeRev`), alongside one monotonic `GlobalRev`, so that
//! [`crate::memory::cache::RelationCache`] can invalidate a cached relation
//! answer precisely when something that answer actually depends on changes —
//! not on every write anywhere in the network.

pub mod relations;

use crate::error::{Result, SynapseError};
use crate::event::{Event, EventId, ObservedEvent};
use crate::memory::cache::{CacheKey, RelationCache};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::{instrument, trace};

/// The revision values a single cached relation answer depends on: the
/// anchor's own `InRev`/`OutRev`, the `TypeRev` of whichever type the
/// relation's filter cares about, and the network-wide `GlobalRev`. Two
/// snapshots compare equal iff nothing relevant to that cached answer
/// changed between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevisionSnapshot {
    pub in_rev: u64,
    pub out_rev: u64,
    pub type_rev: u64,
    pub global_rev: u64,
}

#[derive(Debug, Default)]
struct Inner {
    events: HashMap<EventId, Event>,
    by_type: BTreeMap<String, BTreeSet<EventId>>,
    /// derived event -> its contributors (in-edges).
    in_edges: HashMap<EventId, BTreeSet<EventId>>,
    /// contributor event -> events derived from it (out-edges).
    out_edges: HashMap<EventId, BTreeSet<EventId>>,
    /// relation tag recorded the first time a given (contributor, derived)
    /// edge is added — e.g. the rule id that drew it, or `"pattern_composition"`.
    edge_relations: HashMap<(EventId, EventId), String>,
    /// `InRev[id]`: bumped whenever an edge lands on `id` as its derived side.
    in_rev: HashMap<EventId, u64>,
    /// `OutRev[id]`: bumped whenever an edge leaves `id` as its contributor side.
    out_rev: HashMap<EventId, u64>,
    /// `TypeRev[event_type]`: bumped whenever an event of that type is added,
    /// or an edge touches a contributor of that type.
    type_rev: HashMap<String, u64>,
}

/// The append-only event DAG.
///
/// Events are never removed or mutated once added. Edges are additive only;
/// duplicate edges between the same (contributor, derived) pair are
/// tolerated as a no-op rather than an error, per spec.md §9.
#[derive(Debug, Default)]
pub struct EventNetwork {
    inner: RwLock<Inner>,
    global_rev: AtomicU64,
    relation_cache: RelationCache,
}

impl EventNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed event (its id is assigned by
    /// [`crate::event::Event::new`] / [`crate::event::EventTemplate::instantiate`]
    /// before this call). Returns the event's id.
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub fn add_event(&self, event: Event) -> Result<EventId> {
        let id = event.id;
        let mut inner = self
            .inner
            .write()
            .map_err(|_| SynapseError::Internal { reason: "network write lock poisoned".into() })?;
        if inner.events.contains_key(&id) {
            return Err(SynapseError::Internal {
                reason: format!("event id collision on insert: {id}"),
            });
        }
        inner
            .by_type
            .entry(event.event_type.clone())
            .or_default()
            .insert(id);
        *inner.type_rev.entry(event.event_type.clone()).or_insert(0) += 1;
        inner.events.insert(id, event);
        drop(inner);
        self.global_rev.fetch_add(1, Ordering::SeqCst);
        trace!(%id, "event added");
        Ok(id)
    }

    /// Like `add_event`, but for an event with no explicit timestamp — the
    /// network defaults it to wall-clock `now` here, at the point of
    /// ingestion, rather than pushing that "what time is it" decision onto
    /// every caller that doesn't have one in hand (spec.md's `AddEvent`:
    /// "if timestamp is unset, default to now"). Returns the instantiated
    /// event so the caller can thread its id/timestamp onward without a
    /// second lookup.
    pub fn add_observed_event(&self, observed: ObservedEvent) -> Result<Event> {
        let event = Event::new(observed.event_type, observed.event_domain, observed.properties, chrono::Utc::now());
        self.add_event(event.clone())?;
        Ok(event)
    }

    /// Record that `derived` was materialized (in part) from `contributor`,
    /// tagged with `relation` (a rule id, or `"pattern_composition"` for
    /// composition-derived edges). Both ids must already exist in the
    /// network. The tag is fixed at first insertion; re-adding the same
    /// edge with a different tag does not overwrite it.
    #[instrument(skip(self, relation))]
    pub fn add_edge(&self, contributor: EventId, derived: EventId, relation: impl Into<String>) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| SynapseError::Internal { reason: "network write lock poisoned".into() })?;
        if !inner.events.contains_key(&contributor) {
            return Err(SynapseError::NotFound { id: contributor });
        }
        if !inner.events.contains_key(&derived) {
            return Err(SynapseError::NotFound { id: derived });
        }
        let contributor_type = inner.events[&contributor].event_type.clone();
        let added_out = inner.out_edges.entry(contributor).or_default().insert(derived);
        let added_in = inner.in_edges.entry(derived).or_default().insert(contributor);
        if added_out || added_in {
            inner.edge_relations.entry((contributor, derived)).or_insert_with(|| relation.into());
        }
        if added_in {
            *inner.in_rev.entry(derived).or_insert(0) += 1;
        }
        if added_out {
            *inner.out_rev.entry(contributor).or_insert(0) += 1;
            *inner.type_rev.entry(contributor_type).or_insert(0) += 1;
        }
        drop(inner);
        if added_in || added_out {
            self.global_rev.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    /// The relation tag recorded for the edge `(contributor, derived)`, if
    /// that edge exists.
    pub fn edge_relation(&self, contributor: EventId, derived: EventId) -> Result<Option<String>> {
        let inner = self.read_lock()?;
        Ok(inner.edge_relations.get(&(contributor, derived)).cloned())
    }

    pub fn get_by_id(&self, id: EventId) -> Result<Event> {
        let inner = self.read_lock()?;
        inner.events.get(&id).cloned().ok_or(SynapseError::NotFound { id })
    }

    pub fn get_by_ids(&self, ids: &[EventId]) -> Result<Vec<Event>> {
        let inner = self.read_lock()?;
        ids.iter()
            .map(|id| inner.events.get(id).cloned().ok_or(SynapseError::NotFound { id: *id }))
            .collect()
    }

    pub fn get_by_type(&self, event_type: &str) -> Result<Vec<Event>> {
        let inner = self.read_lock()?;
        Ok(inner
            .by_type
            .get(event_type)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.events.get(id).cloned())
            .collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().map(|i| i.events.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The revision values a relation query anchored on `anchor`, filtered
    /// by `filter_type` (or, if unset, `anchor`'s own type), currently
    /// depends on.
    pub fn revisions_for(&self, anchor: EventId, filter_type: Option<&str>) -> Result<RevisionSnapshot> {
        let inner = self.read_lock()?;
        let anchor_type = inner
            .events
            .get(&anchor)
            .map(|e| e.event_type.clone())
            .ok_or(SynapseError::NotFound { id: anchor })?;
        let type_key = filter_type.map(str::to_string).unwrap_or(anchor_type);
        Ok(RevisionSnapshot {
            in_rev: inner.in_rev.get(&anchor).copied().unwrap_or(0),
            out_rev: inner.out_rev.get(&anchor).copied().unwrap_or(0),
            type_rev: inner.type_rev.get(&type_key).copied().unwrap_or(0),
            global_rev: self.global_rev.load(Ordering::SeqCst),
        })
    }

    /// Look up `key` in the relation cache, computing and storing it via
    /// `compute` on a miss.
    pub fn cached_relation<F>(&self, key: CacheKey, compute: F) -> Result<BTreeSet<EventId>>
    where
        F: FnOnce() -> Result<BTreeSet<EventId>>,
    {
        self.relation_cache.get_or_compute(key, compute)
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| SynapseError::Internal { reason: "network read lock poisoned".into() })
    }

    /// Contributors of `id` (in-edges) — the "Children" relation.
    pub(crate) fn children_of(&self, id: EventId) -> Result<BTreeSet<EventId>> {
        let inner = self.read_lock()?;
        if !inner.events.contains_key(&id) {
            return Err(SynapseError::NotFound { id });
        }
        Ok(inner.in_edges.get(&id).cloned().unwrap_or_default())
    }

    /// Events derived from `id` (out-edges) — the "Parents" relation.
    pub(crate) fn parents_of(&self, id: EventId) -> Result<BTreeSet<EventId>> {
        let inner = self.read_lock()?;
        if !inner.events.contains_key(&id) {
            return Err(SynapseError::NotFound { id });
        }
        Ok(inner.out_edges.get(&id).cloned().unwrap_or_default())
    }

    pub(crate) fn type_domain_of(&self, id: EventId) -> Result<(String, String)> {
        let inner = self.read_lock()?;
        inner
            .events
            .get(&id)
            .map(|e| (e.event_type.clone(), e.event_domain.clone()))
            .ok_or(SynapseError::NotFound { id })
    }

    /// Every event with the given type+domain that currently has no parents
    /// (out-edges) — the frontier candidates for the "Peers" relation.
    pub(crate) fn frontier_of_type_domain(
        &self,
        event_type: &str,
        event_domain: &str,
    ) -> BTreeSet<EventId> {
        let inner = match self.inner.read() {
            Ok(inner) => inner,
            Err(_) => return BTreeSet::new(),
        };
        inner
            .by_type
            .get(event_type)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| {
                inner
                    .events
                    .get(id)
                    .is_some_and(|e| e.event_domain == event_domain)
                    && inner.out_edges.get(id).map_or(true, BTreeSet::is_empty)
            })
            .collect()
    }

    pub(crate) fn contains(&self, id: EventId) -> bool {
        self.inner.read().map(|i| i.events.contains_key(&id)).unwrap_or(false)
    }
}
