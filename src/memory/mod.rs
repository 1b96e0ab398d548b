//! Structural memory: the runtime's record of *shapes* it has seen, as
//! opposed to the network's record of the events themselves.
//!
//! Two complementary views are tracked:
//!
//! - [`MotifStats`]: one-hop derivation shapes — "this rule, firing on
//!   contributors with this sorted multiset of event types, produced this
//!   derived type+domain, and it has happened N times."
//! - [`LineageStats`]: rule-agnostic k-hop provenance shapes, keyed purely
//!   by [`hash::hash_lineage`]'s `Sig_k` — "this k-hop shape has occurred N
//!   times," independent of which rule(s) produced any instance of it.
//!
//! Both are invalidation-free: they only ever grow, same as the network
//! itself, and are bounded by sampling rather than by eviction (see
//! [`crate::config::SynapseConfig`]).

pub mod cache;
pub mod hash;

use crate::config::SynapseConfig;
use crate::error::Result;
use crate::event::{Event, EventId};
use crate::network::EventNetwork;
use crate::rule::RuleId;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::RwLock;
use tracing::trace;

/// Identifies a one-hop derivation shape: a specific rule firing on
/// contributors with a specific (sorted, so order-independent) multiset of
/// event types, producing a specific derived type+domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MotifKey {
    pub rule_id: RuleId,
    pub derived_type: String,
    pub derived_domain: String,
    pub contributor_types: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MotifStats {
    pub count: u64,
    pub samples: VecDeque<EventId>,
}

/// Identifies a rule-agnostic k-hop lineage shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineageKey {
    pub depth: u32,
    pub signature: u64,
}

#[derive(Debug, Clone, Default)]
pub struct LineageStats {
    pub count: u64,
    /// Occurrences of this shape broken down by the rule that produced
    /// each instance — rule-agnostic overall, but still attributable.
    pub rule_counts: HashMap<RuleId, u64>,
    pub samples: VecDeque<EventId>,
}

#[derive(Debug, Default)]
struct Inner {
    /// `Sig_k` for every event this memory has observed, indexed `0..=max_signature_depth`.
    signatures: HashMap<EventId, Vec<u64>>,
    motifs: HashMap<MotifKey, MotifStats>,
    lineages: HashMap<LineageKey, LineageStats>,
}

/// Tracks motif and lineage shape statistics as events are added and
/// materialized. Driven by [`crate::runtime::SynapseRuntime`] via
/// [`StructuralMemory::on_event_added`] and [`StructuralMemory::on_materialized`].
#[derive(Debug)]
pub struct StructuralMemory {
    config: SynapseConfig,
    inner: RwLock<Inner>,
}

impl StructuralMemory {
    #[must_use]
    pub fn new(config: SynapseConfig) -> Self {
        Self { config, inner: RwLock::new(Inner::default()) }
    }

    /// Record an event's base signature (`Sig_0`) as soon as it enters the
    /// network, before any rule has had a chance to derive from it.
    pub fn on_event_added(&self, event: &Event) -> Result<()> {
        let base = hash::hash_base(&event.event_type, &event.event_domain);
        let mut inner = self.write_lock()?;
        inner.signatures.insert(event.id, vec![base]);
        Ok(())
    }

    /// Record a materialization: update the motif stats for this
    /// (rule, contributor-type-multiset, derived-type+domain) combination,
    /// then compute and record `Sig_k` for `1..=max_signature_depth` and
    /// update the corresponding lineage stats at each depth.
    pub fn on_materialized(
        &self,
        rule_id: &RuleId,
        derived: &Event,
        contributors: &BTreeSet<EventId>,
        network: &EventNetwork,
    ) -> Result<()> {
        let mut inner = self.write_lock()?;

        let mut contributor_types: Vec<String> =
            contributors.iter().map(|id| Ok(network.get_by_id(*id)?.event_type)).collect::<Result<_>>()?;
        contributor_types.sort();

        let motif_key = MotifKey {
            rule_id: rule_id.clone(),
            derived_type: derived.event_type.clone(),
            derived_domain: derived.event_domain.clone(),
            contributor_types,
        };
        Self::record_motif(&mut inner.motifs, motif_key, derived.id, self.config.motif_sample_cap);

        let base_sig = hash::hash_base(&derived.event_type, &derived.event_domain);
        let mut sigs = vec![base_sig];
        for depth in 1..=self.config.max_signature_depth {
            let prev_sigs: Vec<u64> = contributors
                .iter()
                .map(|id| Self::sig_at(&inner.signatures, *id, depth - 1))
                .collect();
            let sig = hash::hash_lineage(depth, base_sig, rule_id, &prev_sigs);
            sigs.push(sig);

            let lineage_key = LineageKey { depth, signature: sig };
            Self::record_lineage(
                &mut inner.lineages,
                lineage_key,
                rule_id,
                derived.id,
                self.config.lineage_sample_cap,
            );
        }
        inner.signatures.insert(derived.id, sigs);

        trace!(rule = %rule_id, derived = %derived.id, "structural memory updated");
        Ok(())
    }

    #[must_use]
    pub fn lineage_stats(&self, key: LineageKey) -> Option<LineageStats> {
        self.inner.read().ok()?.lineages.get(&key).cloned()
    }

    #[must_use]
    pub fn motif_stats(&self, key: &MotifKey) -> Option<MotifStats> {
        self.inner.read().ok()?.motifs.get(key).cloned()
    }

    /// `Sig_depth` recorded for `id`, if this memory has observed it at
    /// that depth (or deeper — `on_event_added`/`on_materialized` always
    /// record at least `Sig_0`).
    #[must_use]
    pub fn signature_of(&self, id: EventId, depth: u32) -> Option<u64> {
        let inner = self.inner.read().ok()?;
        inner.signatures.get(&id).and_then(|sigs| sigs.get(depth as usize).copied())
    }

    /// The `n` motifs with the highest occurrence count, descending. Ties
    /// break by `MotifKey`'s derived type then domain for a stable order.
    #[must_use]
    pub fn top_motifs(&self, n: usize) -> Vec<(MotifKey, MotifStats)> {
        let Ok(inner) = self.inner.read() else { return Vec::new() };
        let mut all: Vec<(MotifKey, MotifStats)> =
            inner.motifs.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        all.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then_with(|| a.0.derived_type.cmp(&b.0.derived_type))
                .then_with(|| a.0.derived_domain.cmp(&b.0.derived_domain))
        });
        all.truncate(n);
        all
    }

    /// The signature depths this memory was configured to track.
    #[must_use]
    pub fn max_signature_depth(&self) -> u32 {
        self.config.max_signature_depth
    }

    fn sig_at(signatures: &HashMap<EventId, Vec<u64>>, id: EventId, depth: u32) -> u64 {
        signatures
            .get(&id)
            .and_then(|sigs| sigs.get(depth as usize).copied().or_else(|| sigs.first().copied()))
            .unwrap_or(0)
    }

    fn record_motif(motifs: &mut HashMap<MotifKey, MotifStats>, key: MotifKey, sample: EventId, cap: usize) {
        let stats = motifs.entry(key).or_default();
        stats.count += 1;
        stats.samples.push_back(sample);
        while stats.samples.len() > cap {
            stats.samples.pop_front();
        }
    }

    fn record_lineage(
        lineages: &mut HashMap<LineageKey, LineageStats>,
        key: LineageKey,
        rule_id: &RuleId,
        sample: EventId,
        cap: usize,
    ) {
        let stats = lineages.entry(key).or_default();
        stats.count += 1;
        *stats.rule_counts.entry(rule_id.clone()).or_default() += 1;
        stats.samples.push_back(sample);
        while stats.samples.len() > cap {
            stats.samples.pop_front();
        }
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| crate::error::SynapseError::Internal { reason: "structural memory lock poisoned".into() })
    }
}
