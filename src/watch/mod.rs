//! Pattern watchers: observers of recurring lineage shapes.
//!
//! A [`PatternWatcher`] names a k-hop depth, a minimum occurrence count,
//! and an optional type/domain restriction on which materialized events it
//! even considers. [`crate::runtime::SynapseRuntime`] calls
//! [`PatternWatcher::try_match`] once per materialized event; once the
//! matching lineage shape's occurrence count reaches `min_count`, the
//! watcher reports a match on *every* subsequent occurrence, not just the
//! first crossing — this is deliberate (spec.md §4.8): a recurring pattern
//! stays interesting every time it recurs.
//!
//! # Sub-modules
//!
//! - [`composition`]: combining named pattern matches into higher-order
//!   derived events.

pub mod composition;

use crate::error::Result;
use crate::event::{Event, EventId};
use crate::memory::{LineageKey, StructuralMemory};
use crate::network::EventNetwork;
use crate::rule::RuleId;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Restricts which materialized events a [`PatternWatcher`] even considers.
/// `None` in either field means "no restriction on this dimension"; `Some`
/// holds a set of admissible values rather than a single one, per spec.md
/// §4.8's "a SET of derived types and/or domains."
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchSpec {
    pub event_types: Option<BTreeSet<String>>,
    pub event_domains: Option<BTreeSet<String>>,
}

impl WatchSpec {
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn of_type(event_type: impl Into<String>) -> Self {
        Self { event_types: Some(BTreeSet::from([event_type.into()])), event_domains: None }
    }

    #[must_use]
    pub fn of_types(event_types: impl IntoIterator<Item = String>) -> Self {
        Self { event_types: Some(event_types.into_iter().collect()), event_domains: None }
    }

    #[must_use]
    pub fn of_domains(event_domains: impl IntoIterator<Item = String>) -> Self {
        Self { event_types: None, event_domains: Some(event_domains.into_iter().collect()) }
    }

    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        let type_ok = match &self.event_types {
            Some(expected) => expected.contains(&event.event_type),
            None => true,
        };
        let domain_ok = match &self.event_domains {
            Some(expected) => expected.contains(&event.event_domain),
            None => true,
        };
        type_ok && domain_ok
    }
}

/// A single observed occurrence of a watched pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub watcher_id: String,
    pub lineage_key: LineageKey,
    pub event: EventId,
    pub count_at_match: u64,
    pub rule_id: RuleId,
    pub contributor_ids: BTreeSet<EventId>,
    pub matched_at: DateTime<Utc>,
}

/// Notified of pattern matches and, if composition watchers are wired in,
/// of composed pattern firings. Both methods default to a no-op so a
/// listener only needs to implement the one it cares about.
pub trait PatternListener: Send + Sync {
    fn on_pattern_match(&self, _pattern_match: &PatternMatch) {}
    fn on_composition_fired(&self, _fired: &composition::CompositionFired) {}
}

/// Watches for a recurring k-hop lineage shape among materialized events.
#[derive(Debug, Clone)]
pub struct PatternWatcher {
    pub id: String,
    pub depth: u32,
    pub min_count: u64,
    pub watch_spec: WatchSpec,
}

impl PatternWatcher {
    #[must_use]
    pub fn new(id: impl Into<String>, depth: u32, min_count: u64, watch_spec: WatchSpec) -> Self {
        Self { id: id.into(), depth, min_count, watch_spec }
    }

    /// Check whether `derived` (just materialized by `rule_id` from
    /// `contributors`, at `matched_at`) makes this watcher's pattern match.
    /// Returns `Ok(None)` when the event is out of scope for `watch_spec`,
    /// `depth` exceeds the configured signature depth so nothing was
    /// recorded for it, or the occurrence count hasn't reached `min_count`.
    pub fn try_match(
        &self,
        memory: &StructuralMemory,
        network: &EventNetwork,
        derived: EventId,
        rule_id: &RuleId,
        contributors: &BTreeSet<EventId>,
        matched_at: DateTime<Utc>,
    ) -> Result<Option<PatternMatch>> {
        let event = network.get_by_id(derived)?;
        if !self.watch_spec.matches(&event) {
            return Ok(None);
        }
        if self.depth > memory.max_signature_depth() {
            return Ok(None);
        }
        let Some(signature) = memory.signature_of(derived, self.depth) else {
            return Ok(None);
        };
        let key = LineageKey { depth: self.depth, signature };
        let Some(stats) = memory.lineage_stats(key) else {
            return Ok(None);
        };
        if stats.count < self.min_count {
            return Ok(None);
        }
        Ok(Some(PatternMatch {
            watcher_id: self.id.clone(),
            lineage_key: key,
            event: derived,
            count_at_match: stats.count,
            rule_id: rule_id.clone(),
            contributor_ids: contributors.clone(),
            matched_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynapseConfig;
    use crate::event::value::PropertyMap;
    use chrono::Utc;

    fn leaf(network: &EventNetwork, memory: &StructuralMemory, event_type: &str, domain: &str) -> EventId {
        let event = Event::new(event_type, domain, PropertyMap::new(), Utc::now());
        memory.on_event_added(&event).unwrap();
        network.add_event(event).unwrap()
    }

    #[test]
    fn watch_spec_restricts_by_type_and_domain() {
        let event = Event::new("cpu_spike", "infra", PropertyMap::new(), Utc::now());
        assert!(WatchSpec::any().matches(&event));
        assert!(WatchSpec::of_type("cpu_spike").matches(&event));
        assert!(!WatchSpec::of_type("mem_spike").matches(&event));
    }

    #[test]
    fn fires_once_min_count_reached_and_keeps_firing() {
        let network = EventNetwork::new();
        let memory = StructuralMemory::new(SynapseConfig::for_tests());
        let watcher = PatternWatcher::new("repeated-spike", 1, 2, WatchSpec::any());
        let rule_id = "rule-a".to_string();

        let contributor = leaf(&network, &memory, "cpu_spike", "infra");
        let derived1 = leaf(&network, &memory, "alert", "infra");
        network.add_edge(contributor, derived1, rule_id.clone()).unwrap();
        let contributors1 = BTreeSet::from([contributor]);
        memory
            .on_materialized(&rule_id, &network.get_by_id(derived1).unwrap(), &contributors1, &network)
            .unwrap();
        let now = Utc::now();
        assert!(watcher
            .try_match(&memory, &network, derived1, &rule_id, &contributors1, now)
            .unwrap()
            .is_none());

        let contributor2 = leaf(&network, &memory, "cpu_spike", "infra");
        let derived2 = leaf(&network, &memory, "alert", "infra");
        network.add_edge(contributor2, derived2, rule_id.clone()).unwrap();
        let contributors2 = BTreeSet::from([contributor2]);
        memory
            .on_materialized(&rule_id, &network.get_by_id(derived2).unwrap(), &contributors2, &network)
            .unwrap();
        let matched = watcher
            .try_match(&memory, &network, derived2, &rule_id, &contributors2, now)
            .unwrap();
        assert!(matched.is_some());
        let matched = matched.unwrap();
        assert_eq!(matched.rule_id, rule_id);
        assert_eq!(matched.contributor_ids, contributors2);
        assert_eq!(matched.matched_at, now);
    }
}
