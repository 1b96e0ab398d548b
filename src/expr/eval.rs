//! Evaluating a compiled [`Expression`] against a concrete anchor.
//!
//! `Has*` terms resolve their relation via [`crate::network::relations`],
//! then narrow the matched set by the term's own `of_event_type` filter and
//! its own qualifiers (`property_values`/`time_window`/`counter`) before
//! checking it against the counter (default: "at least one"). The raw
//! relation walk for each term is memoized in [`crate::memory::cache::RelationCache`],
//! keyed on the anchor's current revisions, so repeated evaluation of the
//! same term against an unchanged neighborhood doesn't re-walk the graph.

use crate::error::Result;
use crate::event::value::PropertyMap;
use crate::event::{Event, EventId};
use crate::expr::condition::{RelationQualifiers, RelationTerm};
use crate::expr::Expression;
use crate::memory::cache::{CacheKey, RelationKind};
use crate::network::relations::{self, DEFAULT_MAX_DEPTH};
use crate::network::EventNetwork;
use chrono::Duration;
use std::collections::BTreeSet;

/// Evaluate `expr` for `anchor`.
pub fn evaluate(expr: &Expression, anchor: EventId, network: &EventNetwork) -> Result<bool> {
    match expr {
        Expression::Term(term) => evaluate_term(term, anchor, network),
        Expression::And(lhs, rhs) => Ok(evaluate(lhs, anchor, network)? && evaluate(rhs, anchor, network)?),
        Expression::Or(lhs, rhs) => Ok(evaluate(lhs, anchor, network)? || evaluate(rhs, anchor, network)?),
    }
}

fn evaluate_term(term: &RelationTerm, anchor: EventId, network: &EventNetwork) -> Result<bool> {
    match term {
        RelationTerm::IsTypeOf(event_type) => Ok(network.get_by_id(anchor)?.event_type == *event_type),
        RelationTerm::InDomain(event_domain) => Ok(network.get_by_id(anchor)?.event_domain == *event_domain),
        RelationTerm::HasChild { of_event_type, qualifiers } => {
            let filter = relaxed_type_filter(of_event_type.as_deref(), anchor, network)?;
            let candidates =
                cached_relation(network, RelationKind::Children, anchor, 0, filter, || relations::children(network, anchor))?;
            evaluate_relation_set(candidates, filter, anchor, qualifiers, network, false)
        }
        RelationTerm::HasDescendants { of_event_type, qualifiers } => {
            let max_depth = effective_max_depth(qualifiers);
            let filter = relaxed_type_filter(of_event_type.as_deref(), anchor, network)?;
            let candidates = cached_relation(network, RelationKind::Descendants, anchor, max_depth, filter, || {
                relations::descendants(network, anchor, max_depth)
            })?;
            evaluate_relation_set(candidates, filter, anchor, qualifiers, network, false)
        }
        RelationTerm::HasSiblings { of_event_type, qualifiers } => {
            let filter = of_event_type.as_deref();
            let candidates = cached_relation(network, RelationKind::Siblings, anchor, 0, filter, || {
                relations::siblings(network, anchor)
            })?;
            evaluate_relation_set(candidates, filter, anchor, qualifiers, network, true)
        }
        RelationTerm::HasPeers { of_event_type, qualifiers } => {
            let (candidates, strict_type) = peer_candidates(of_event_type.as_deref(), anchor, network)?;
            evaluate_relation_set(candidates, strict_type, anchor, qualifiers, network, true)
        }
        RelationTerm::HasCousin { of_event_type, qualifiers } => {
            let max_depth = effective_max_depth(qualifiers);
            let filter = relaxed_type_filter(of_event_type.as_deref(), anchor, network)?;
            let candidates = cached_relation(network, RelationKind::Cousins, anchor, max_depth, filter, || {
                relations::cousins(network, anchor, max_depth)
            })?;
            evaluate_relation_set(candidates, filter, anchor, qualifiers, network, false)
        }
    }
}

/// Look up the raw (pre-filter) relation set in [`crate::memory::cache::RelationCache`],
/// keyed on `anchor`'s current revisions scoped to `filter_type` (or the
/// anchor's own type, if unset), computing it via `compute` on a miss.
fn cached_relation(
    network: &EventNetwork,
    kind: RelationKind,
    anchor: EventId,
    max_depth: u32,
    filter_type: Option<&str>,
    compute: impl FnOnce() -> Result<BTreeSet<EventId>>,
) -> Result<BTreeSet<EventId>> {
    let revisions = network.revisions_for(anchor, filter_type)?;
    let key = CacheKey {
        kind,
        anchor,
        max_depth,
        filter_type: filter_type.map(str::to_string),
        cond_hash: 0,
        revisions,
    };
    network.cached_relation(key, compute)
}

/// `max_depth` of 0 is treated as 1 for relations that require traversal — a
/// depth-0 request for a relation that is inherently at least one hop away
/// would otherwise always come back empty.
fn effective_max_depth(qualifiers: &RelationQualifiers) -> u32 {
    match qualifiers.max_depth {
        Some(0) => 1,
        Some(d) => d,
        None => DEFAULT_MAX_DEPTH,
    }
}

/// For `HasChild`/`HasDescendants`/`HasCousin`: a requested type equal to the
/// anchor's own type relaxes the strict filter (the relation walk already
/// only reaches the contributor/derivation side, so requiring that side to
/// literally share the anchor's type would be vacuous for most rules).
fn relaxed_type_filter<'a>(
    of_event_type: Option<&'a str>,
    anchor: EventId,
    network: &EventNetwork,
) -> Result<Option<&'a str>> {
    match of_event_type {
        Some(t) if network.get_by_id(anchor)?.event_type == t => Ok(None),
        other => Ok(other),
    }
}

/// `HasPeers`: when the requested type matches the anchor's own type (or is
/// unset), the relation is literally `peers(anchor)`. When it names a
/// different type, the candidate set is every parentless event of that
/// type, anchor excluded — peers never relax their type filter.
fn peer_candidates<'a>(
    of_event_type: Option<&'a str>,
    anchor: EventId,
    network: &EventNetwork,
) -> Result<(BTreeSet<EventId>, Option<&'a str>)> {
    let anchor_event = network.get_by_id(anchor)?;
    match of_event_type {
        Some(t) if t != anchor_event.event_type => {
            let candidates = cached_relation(network, RelationKind::Peers, anchor, 0, Some(t), || {
                let mut candidates = BTreeSet::new();
                for event in network.get_by_type(t)? {
                    if event.id != anchor && relations::parents(network, event.id)?.is_empty() {
                        candidates.insert(event.id);
                    }
                }
                Ok(candidates)
            })?;
            Ok((candidates, Some(t)))
        }
        _ => {
            let candidates =
                cached_relation(network, RelationKind::Peers, anchor, 0, None, || relations::peers(network, anchor))?;
            Ok((candidates, None))
        }
    }
}

fn evaluate_relation_set(
    candidates: BTreeSet<EventId>,
    of_event_type: Option<&str>,
    anchor: EventId,
    qualifiers: &RelationQualifiers,
    network: &EventNetwork,
    asymmetric_window: bool,
) -> Result<bool> {
    let count = count_matches(candidates, of_event_type, anchor, qualifiers, network, asymmetric_window)?;
    Ok(match qualifiers.counter {
        Some(counter) => counter.satisfied_by(count),
        None => count > 0,
    })
}

/// `asymmetric_window`: for siblings/peers the spec's time window is
/// `[anchor.timestamp - within, anchor.timestamp]` (the related event must
/// not be newer than the anchor); every other relation uses a symmetric
/// `±within` band around the anchor.
fn count_matches(
    candidates: BTreeSet<EventId>,
    of_event_type: Option<&str>,
    anchor: EventId,
    qualifiers: &RelationQualifiers,
    network: &EventNetwork,
    asymmetric_window: bool,
) -> Result<u64> {
    let anchor_event = network.get_by_id(anchor)?;
    let mut count: u64 = 0;
    for id in candidates {
        let event = network.get_by_id(id)?;
        if let Some(event_type) = of_event_type {
            if event.event_type != event_type {
                continue;
            }
        }
        if let Some(expected) = &qualifiers.property_values {
            if !properties_match(&event.properties, expected) {
                continue;
            }
        }
        if let Some(window) = &qualifiers.time_window {
            let in_window = if asymmetric_window {
                within_trailing_window(&anchor_event, &event, window.duration())
            } else {
                within_window(&anchor_event, &event, window.duration())
            };
            if !in_window {
                continue;
            }
        }
        count += 1;
    }
    Ok(count)
}

/// Collect every event that contributed to `expr`'s verdict for `anchor`:
/// the anchor itself plus every event matched (after filtering) by any
/// `Has*` term in the tree, regardless of which side of an `And`/`Or` it
/// sits on. Used to build the contributor edges of a rule's derived event —
/// a rule fires because of the anchor *and* whatever related events made
/// its relation terms true.
pub fn matched_contributors(expr: &Expression, anchor: EventId, network: &EventNetwork) -> Result<BTreeSet<EventId>> {
    let mut contributors = BTreeSet::from([anchor]);
    collect_term_matches(expr, anchor, network, &mut contributors)?;
    Ok(contributors)
}

fn collect_term_matches(
    expr: &Expression,
    anchor: EventId,
    network: &EventNetwork,
    out: &mut BTreeSet<EventId>,
) -> Result<()> {
    match expr {
        Expression::Term(term) => {
            out.extend(matched_set_for_term(term, anchor, network)?);
            Ok(())
        }
        Expression::And(lhs, rhs) | Expression::Or(lhs, rhs) => {
            collect_term_matches(lhs, anchor, network, out)?;
            collect_term_matches(rhs, anchor, network, out)
        }
    }
}

fn matched_set_for_term(term: &RelationTerm, anchor: EventId, network: &EventNetwork) -> Result<BTreeSet<EventId>> {
    let (candidates, of_event_type, qualifiers, asymmetric_window) = match term {
        RelationTerm::IsTypeOf(_) | RelationTerm::InDomain(_) => return Ok(BTreeSet::new()),
        RelationTerm::HasChild { of_event_type, qualifiers } => {
            let filter = relaxed_type_filter(of_event_type.as_deref(), anchor, network)?;
            let candidates =
                cached_relation(network, RelationKind::Children, anchor, 0, filter, || relations::children(network, anchor))?;
            (candidates, filter, qualifiers, false)
        }
        RelationTerm::HasDescendants { of_event_type, qualifiers } => {
            let max_depth = effective_max_depth(qualifiers);
            let filter = relaxed_type_filter(of_event_type.as_deref(), anchor, network)?;
            let candidates = cached_relation(network, RelationKind::Descendants, anchor, max_depth, filter, || {
                relations::descendants(network, anchor, max_depth)
            })?;
            (candidates, filter, qualifiers, false)
        }
        RelationTerm::HasSiblings { of_event_type, qualifiers } => {
            let filter = of_event_type.as_deref();
            let candidates = cached_relation(network, RelationKind::Siblings, anchor, 0, filter, || {
                relations::siblings(network, anchor)
            })?;
            (candidates, filter, qualifiers, true)
        }
        RelationTerm::HasPeers { of_event_type, qualifiers } => {
            let (candidates, strict_type) = peer_candidates(of_event_type.as_deref(), anchor, network)?;
            (candidates, strict_type, qualifiers, true)
        }
        RelationTerm::HasCousin { of_event_type, qualifiers } => {
            let max_depth = effective_max_depth(qualifiers);
            let filter = relaxed_type_filter(of_event_type.as_deref(), anchor, network)?;
            let candidates = cached_relation(network, RelationKind::Cousins, anchor, max_depth, filter, || {
                relations::cousins(network, anchor, max_depth)
            })?;
            (candidates, filter, qualifiers, false)
        }
    };

    let anchor_event = network.get_by_id(anchor)?;
    let mut matched = BTreeSet::new();
    for id in candidates {
        let event = network.get_by_id(id)?;
        if let Some(event_type) = of_event_type {
            if event.event_type != event_type {
                continue;
            }
        }
        if let Some(expected) = &qualifiers.property_values {
            if !properties_match(&event.properties, expected) {
                continue;
            }
        }
        if let Some(window) = &qualifiers.time_window {
            let in_window = if asymmetric_window {
                within_trailing_window(&anchor_event, &event, window.duration())
            } else {
                within_window(&anchor_event, &event, window.duration())
            };
            if !in_window {
                continue;
            }
        }
        matched.insert(id);
    }
    Ok(matched)
}

fn properties_match(actual: &PropertyMap, expected: &PropertyMap) -> bool {
    expected.iter().all(|(key, value)| actual.get(key) == Some(value))
}

fn within_window(anchor: &Event, other: &Event, duration: Duration) -> bool {
    let diff = other.timestamp - anchor.timestamp;
    let magnitude = if diff < Duration::zero() { -diff } else { diff };
    magnitude <= duration
}

/// `[anchor.timestamp - duration, anchor.timestamp]`: used for siblings and
/// peers, where the spec's window looks backward from the anchor rather than
/// symmetrically around it.
fn within_trailing_window(anchor: &Event, other: &Event, duration: Duration) -> bool {
    other.timestamp <= anchor.timestamp && anchor.timestamp - other.timestamp <= duration
}
