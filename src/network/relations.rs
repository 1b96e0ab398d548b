//! The relation algebra: the seven ways a [`crate::network::EventNetwork`]
//! lets a caller look outward from an anchor event.
//!
//! Structurally, edges point contributor → derived. "Children" follows
//! edges backward (toward contributors); "Parents" follows them forward
//! (toward derived events) — inverted from the usual tree vocabulary, kept
//! intentionally per spec.md §9's reimplementation note rather than
//! renamed, so readers already familiar with the source model recognize
//! the relation names.
//!
//! Traversals ([`ancestors`], [`descendants`], [`cousins`]) are iterative
//! breadth-first walks with an explicit `visited` set and an explicit
//! `max_depth` bound — never recursive — so a pathological or cyclic input
//! cannot blow the stack. (The network is append-only and acyclic by
//! construction, but the traversal code does not rely on that to stay
//! safe.)
//!
//! [`ancestors`] walks repeated Parents hops (toward derived events) and
//! [`descendants`] walks repeated Children hops (toward contributors) —
//! both names are inverted from the usual family-tree sense, preserved
//! deliberately per spec.md §9.

use crate::error::Result;
use crate::event::EventId;
use crate::network::EventNetwork;
use std::collections::{BTreeSet, VecDeque};

/// Default bound used wherever a caller does not supply one, generous
/// enough to cover realistic networks without expanding unbounded.
pub const DEFAULT_MAX_DEPTH: u32 = 32;

/// Contributors of `anchor` — events whose materialization fed into it.
pub fn children(network: &EventNetwork, anchor: EventId) -> Result<BTreeSet<EventId>> {
    network.children_of(anchor)
}

/// Events derived (at least in part) from `anchor`.
pub fn parents(network: &EventNetwork, anchor: EventId) -> Result<BTreeSet<EventId>> {
    network.parents_of(anchor)
}

enum Direction {
    /// Follow Children edges (toward contributors / the past).
    TowardContributors,
    /// Follow Parents edges (toward derived events / the future).
    TowardDerived,
}

fn step(network: &EventNetwork, id: EventId, direction: &Direction) -> Result<BTreeSet<EventId>> {
    match direction {
        Direction::TowardContributors => network.children_of(id),
        Direction::TowardDerived => network.parents_of(id),
    }
}

/// Breadth-first walk, cumulative: every node reachable from `anchor` within
/// `max_depth` hops in `direction`, excluding `anchor` itself.
fn bfs_cumulative(
    network: &EventNetwork,
    anchor: EventId,
    max_depth: u32,
    direction: &Direction,
) -> Result<BTreeSet<EventId>> {
    let mut visited: BTreeSet<EventId> = BTreeSet::new();
    let mut frontier: VecDeque<(EventId, u32)> = VecDeque::new();
    frontier.push_back((anchor, 0));
    let mut seen_queue: BTreeSet<EventId> = BTreeSet::from([anchor]);

    while let Some((current, depth)) = frontier.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for next in step(network, current, direction)? {
            visited.insert(next);
            if seen_queue.insert(next) {
                frontier.push_back((next, depth + 1));
            }
        }
    }
    Ok(visited)
}

/// Breadth-first walk, exact-depth layer: nodes reachable from `anchor` in
/// *exactly* `depth` hops in `direction` (empty if `depth` is 0, unless
/// `anchor` itself is returned for depth 0 by the caller's convention — here
/// we return the empty set, matching "zero steps reaches nothing new").
fn bfs_layer(
    network: &EventNetwork,
    anchor: EventId,
    depth: u32,
    direction: &Direction,
) -> Result<BTreeSet<EventId>> {
    let mut frontier: BTreeSet<EventId> = BTreeSet::from([anchor]);
    for _ in 0..depth {
        let mut next_frontier = BTreeSet::new();
        for id in &frontier {
            next_frontier.extend(step(network, *id, direction)?);
        }
        frontier = next_frontier;
        if frontier.is_empty() {
            break;
        }
    }
    if depth == 0 {
        Ok(BTreeSet::new())
    } else {
        Ok(frontier)
    }
}

/// Every event reachable from `anchor`, transitively, up to `max_depth`
/// hops through the Parents relation.
///
/// Naming note: this walks toward derived events, not toward contributors
/// — inverted from the usual family-tree sense of "ancestor", but kept per
/// spec.md §9's reimplementation note (design note #2/#3: the naming
/// inversion is part of the source model's contract, not a bug).
pub fn ancestors(network: &EventNetwork, anchor: EventId, max_depth: u32) -> Result<BTreeSet<EventId>> {
    bfs_cumulative(network, anchor, max_depth, &Direction::TowardDerived)
}

/// Every event reachable from `anchor`, transitively, up to `max_depth`
/// hops through the Children relation — i.e. toward contributors, despite
/// the name "descendants". Preserved inverted per spec.md §9/design note #3.
pub fn descendants(network: &EventNetwork, anchor: EventId, max_depth: u32) -> Result<BTreeSet<EventId>> {
    bfs_cumulative(network, anchor, max_depth, &Direction::TowardContributors)
}

/// Events sharing at least one parent (one hop through the Parents
/// relation) with `anchor`, excluding `anchor` itself. Symmetric: if `b` is
/// a sibling of `a`, `a` is a sibling of `b`.
pub fn siblings(network: &EventNetwork, anchor: EventId) -> Result<BTreeSet<EventId>> {
    let mut result = BTreeSet::new();
    for parent in network.parents_of(anchor)? {
        for child in network.children_of(parent)? {
            if child != anchor {
                result.insert(child);
            }
        }
    }
    Ok(result)
}

/// Events of the same type and domain as `anchor` that currently have no
/// parents themselves — the top-of-frontier events of that type+domain,
/// excluding `anchor`.
pub fn peers(network: &EventNetwork, anchor: EventId) -> Result<BTreeSet<EventId>> {
    let (event_type, event_domain) = network.type_domain_of(anchor)?;
    let mut frontier = network.frontier_of_type_domain(&event_type, &event_domain);
    frontier.remove(&anchor);
    Ok(frontier)
}

/// For level `depth`, walk up `depth` hops via the Ancestors relation
/// (toward derived events) and then back down exactly `depth` hops via the
/// Children relation (toward contributors) — events reached this way share
/// derivational history with `anchor` at that symmetric distance without
/// being a direct ancestor or descendant of it. `anchor`, its direct
/// ancestors, and its direct descendants within `depth` hops are excluded.
pub fn cousins(network: &EventNetwork, anchor: EventId, depth: u32) -> Result<BTreeSet<EventId>> {
    if depth == 0 {
        return Ok(BTreeSet::new());
    }
    let shared_ancestors = bfs_layer(network, anchor, depth, &Direction::TowardDerived)?;
    let mut candidates = BTreeSet::new();
    for ancestor in &shared_ancestors {
        candidates.extend(bfs_layer(network, *ancestor, depth, &Direction::TowardContributors)?);
    }
    let direct_line = ancestors(network, anchor, depth)?
        .union(&descendants(network, anchor, depth)?)
        .copied()
        .collect::<BTreeSet<_>>();
    candidates.remove(&anchor);
    for id in &direct_line {
        candidates.remove(id);
    }
    Ok(candidates)
}
