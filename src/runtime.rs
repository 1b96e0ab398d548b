//! The runtime: the queue-driven fixed-point pipeline that ties the
//! network, rule engine, structural memory, and pattern watchers together.
//!
//! [`SynapseRuntime::ingest`] is the crate's single external entry point
//! for adding an event. It adds the event, evaluates every rule bound to
//! its type, materializes whatever derives from it, dispatches pattern
//! watchers and compositions over each materialization, and repeats for
//! every derived event — draining a queue until nothing further derives
//! (a fixed point). A derived event's timestamp is the earliest timestamp
//! among its contributors (spec.md §7), never wall-clock "now": derivation
//! reflects when the underlying facts occurred, not when the engine got
//! around to noticing them.

use crate::config::SynapseConfig;
use crate::error::{Result, SynapseError};
use crate::event::{Event, EventId, ObservedEvent};
use crate::memory::StructuralMemory;
use crate::network::EventNetwork;
use crate::rule::{DeriveEventRule, RuleId};
use crate::watch::composition::{CompositionFired, PatternCompositionSpec, PatternCompositionWatcher};
use crate::watch::{PatternListener, PatternWatcher};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, instrument};

/// The semantic derivation engine: an append-only network plus the rule
/// engine, structural memory, and pattern machinery that derive new events
/// from it.
pub struct SynapseRuntime {
    network: EventNetwork,
    memory: StructuralMemory,
    rules: RwLock<Vec<DeriveEventRule>>,
    rules_by_type: RwLock<HashMap<String, Vec<usize>>>,
    pattern_watchers: RwLock<Vec<(PatternWatcher, Arc<dyn PatternListener>)>>,
    compositions: RwLock<Vec<(Arc<PatternCompositionWatcher>, Arc<dyn PatternListener>)>>,
    /// Serializes fixed-point runs: the single-writer half of spec.md §5's
    /// concurrency model. Reads of the network/memory may still run
    /// concurrently with an in-flight ingest.
    ingest_lock: Mutex<()>,
    config: SynapseConfig,
}

impl SynapseRuntime {
    #[must_use]
    pub fn new(config: SynapseConfig) -> Self {
        Self {
            network: EventNetwork::new(),
            memory: StructuralMemory::new(config.clone()),
            rules: RwLock::new(Vec::new()),
            rules_by_type: RwLock::new(HashMap::new()),
            pattern_watchers: RwLock::new(Vec::new()),
            compositions: RwLock::new(Vec::new()),
            ingest_lock: Mutex::new(()),
            config,
        }
    }

    #[must_use]
    pub fn network(&self) -> &EventNetwork {
        &self.network
    }

    #[must_use]
    pub fn memory(&self) -> &StructuralMemory {
        &self.memory
    }

    /// Register a rule for the anchor types it already names.
    pub fn register_rule(&self, rule: DeriveEventRule) -> Result<()> {
        let mut rules = self.rules.write().map_err(lock_poisoned)?;
        let mut by_type = self.rules_by_type.write().map_err(lock_poisoned)?;
        let index = rules.len();
        for event_type in &rule.anchor_types {
            by_type.entry(event_type.clone()).or_default().push(index);
        }
        rules.push(rule);
        Ok(())
    }

    /// Register `rule` after widening its anchor types with `additional_types` —
    /// a convenience for binding one predicate/template pair to several
    /// event types without repeating the builder chain.
    pub fn register_rule_for_types(
        &self,
        mut rule: DeriveEventRule,
        additional_types: impl IntoIterator<Item = String>,
    ) -> Result<()> {
        rule.anchor_types.extend(additional_types);
        self.register_rule(rule)
    }

    /// Register a pattern watcher with the listener to notify on each match.
    pub fn register_pattern_watcher(
        &self,
        watcher: PatternWatcher,
        listener: Arc<dyn PatternListener>,
    ) -> Result<()> {
        self.pattern_watchers.write().map_err(lock_poisoned)?.push((watcher, listener));
        Ok(())
    }

    /// Register a pattern composition, returning the watcher handle so a
    /// caller can feed it matches directly in tests if desired (the
    /// runtime itself feeds it automatically once registered).
    pub fn register_composition(
        &self,
        spec: PatternCompositionSpec,
        listener: Arc<dyn PatternListener>,
    ) -> Result<Arc<PatternCompositionWatcher>> {
        let watcher = Arc::new(PatternCompositionWatcher::new(spec, self.config.composition_cleanup_interval));
        self.compositions.write().map_err(lock_poisoned)?.push((Arc::clone(&watcher), listener));
        Ok(watcher)
    }

    /// The `n` most frequently occurring one-hop derivation shapes
    /// observed so far.
    #[must_use]
    pub fn hot_motifs(&self, n: usize) -> Vec<(crate::memory::MotifKey, crate::memory::MotifStats)> {
        self.memory.top_motifs(n)
    }

    /// Ingest `event`: add it to the network, then evaluate and materialize
    /// rules to a fixed point. Returns the ingested event's assigned id.
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub fn ingest(&self, event: Event) -> Result<EventId> {
        let _guard = self.ingest_lock.lock().map_err(|_| SynapseError::Internal {
            reason: "ingest lock poisoned".into(),
        })?;
        let root_id = self.network.add_event(event.clone())?;
        self.memory.on_event_added(&event)?;
        self.drain_fixed_point(root_id)?;
        Ok(root_id)
    }

    /// Ingest an observed event with no explicit timestamp — the network
    /// defaults it to wall-clock `now` at the point of ingestion. Otherwise
    /// identical to [`Self::ingest`].
    pub fn ingest_observed(&self, observed: ObservedEvent) -> Result<EventId> {
        let _guard = self.ingest_lock.lock().map_err(|_| SynapseError::Internal {
            reason: "ingest lock poisoned".into(),
        })?;
        let event = self.network.add_observed_event(observed)?;
        let root_id = event.id;
        self.memory.on_event_added(&event)?;
        self.drain_fixed_point(root_id)?;
        Ok(root_id)
    }

    /// Evaluate and materialize rules starting from `root_id`, chaining
    /// through every further derivation until nothing more fires.
    fn drain_fixed_point(&self, root_id: EventId) -> Result<()> {
        let mut queue: VecDeque<EventId> = VecDeque::from([root_id]);
        while let Some(current) = queue.pop_front() {
            self.evaluate_and_materialize(current, &mut queue)?;
        }
        Ok(())
    }

    fn evaluate_and_materialize(&self, anchor: EventId, queue: &mut VecDeque<EventId>) -> Result<()> {
        let anchor_event = self.network.get_by_id(anchor)?;
        let rule_indices = {
            let by_type = self.rules_by_type.read().map_err(lock_poisoned)?;
            by_type.get(&anchor_event.event_type).cloned().unwrap_or_default()
        };
        if rule_indices.is_empty() {
            return Ok(());
        }

        let rules = self.rules.read().map_err(lock_poisoned)?;
        for index in rule_indices {
            let Some(rule) = rules.get(index) else { continue };
            match rule.process(anchor, &self.network) {
                Ok(contributors) => {
                    let rule_id = rule.id.clone();
                    let template = rule.template.clone();
                    self.materialize(&rule_id, &template, &contributors, queue)?;
                }
                Err(err) if err.is_not_satisfied() => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn materialize(
        &self,
        rule_id: &RuleId,
        template: &crate::event::EventTemplate,
        contributors: &std::collections::BTreeSet<EventId>,
        queue: &mut VecDeque<EventId>,
    ) -> Result<()> {
        let timestamp = self.earliest_contributor_timestamp(contributors)?;
        let derived_event = template.instantiate(timestamp);
        let derived_id = self.network.add_event(derived_event.clone())?;

        for contributor in contributors {
            self.network.add_edge(*contributor, derived_id, rule_id.clone())?;
        }
        self.memory.on_materialized(rule_id, &derived_event, contributors, &self.network)?;
        debug!(rule = %rule_id, derived = %derived_id, "materialized derived event");

        self.dispatch_patterns(derived_id, rule_id, contributors, timestamp, queue)?;
        queue.push_back(derived_id);
        Ok(())
    }

    fn dispatch_patterns(
        &self,
        derived_id: EventId,
        rule_id: &RuleId,
        contributors: &std::collections::BTreeSet<EventId>,
        at: DateTime<Utc>,
        queue: &mut VecDeque<EventId>,
    ) -> Result<()> {
        let watchers = self.pattern_watchers.read().map_err(lock_poisoned)?;
        for (watcher, listener) in watchers.iter() {
            let Some(pattern_match) =
                watcher.try_match(&self.memory, &self.network, derived_id, rule_id, contributors, at)?
            else {
                continue;
            };
            listener.on_pattern_match(&pattern_match);
            self.dispatch_compositions(&pattern_match.watcher_id, pattern_match.event, at, queue)?;
        }
        Ok(())
    }

    fn dispatch_compositions(
        &self,
        watcher_id: &str,
        matched_event: EventId,
        at: DateTime<Utc>,
        queue: &mut VecDeque<EventId>,
    ) -> Result<()> {
        let compositions = self.compositions.read().map_err(lock_poisoned)?;
        for (composition, listener) in compositions.iter() {
            if let Some(fired) = composition.record_match(watcher_id, matched_event, at) {
                listener.on_composition_fired(&fired);
                self.materialize_composition(fired, queue)?;
            }
        }
        Ok(())
    }

    fn materialize_composition(&self, fired: CompositionFired, queue: &mut VecDeque<EventId>) -> Result<()> {
        let timestamp = self.earliest_contributor_timestamp(&fired.contributors)?;
        let derived_event = fired.template.instantiate(timestamp);
        let derived_id = self.network.add_event(derived_event.clone())?;
        for contributor in &fired.contributors {
            self.network.add_edge(*contributor, derived_id, "pattern_composition")?;
        }
        self.memory.on_materialized(&fired.composition_id, &derived_event, &fired.contributors, &self.network)?;
        debug!(composition = %fired.composition_id, derived = %derived_id, "pattern composition fired");

        self.dispatch_patterns(derived_id, &fired.composition_id, &fired.contributors, timestamp, queue)?;
        queue.push_back(derived_id);
        Ok(())
    }

    fn earliest_contributor_timestamp(
        &self,
        contributors: &std::collections::BTreeSet<EventId>,
    ) -> Result<DateTime<Utc>> {
        let mut earliest: Option<DateTime<Utc>> = None;
        for id in contributors {
            let event = self.network.get_by_id(*id)?;
            earliest = Some(match earliest {
                Some(current) if current <= event.timestamp => current,
                _ => event.timestamp,
            });
        }
        earliest.ok_or_else(|| SynapseError::Internal { reason: "materialization with no contributors".into() })
    }
}

fn lock_poisoned<T>(_: T) -> SynapseError {
    SynapseError::Internal { reason: "runtime lock poisoned".into() }
}
