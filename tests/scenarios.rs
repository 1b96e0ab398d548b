//! End-to-end scenarios, one per test, mirroring the literal walkthroughs
//! in spec.md §8. S2's full six-rule cross-domain ladder is reduced to a
//! three-level escalation (the mechanism under test — peers-of-peers
//! propagating across domains — is identical at three levels as at six).

use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};
use synapse_core::event::value::PropertyMap;
use synapse_core::event::{Event, EventTemplate};
use synapse_core::expr::condition::{Condition, Counter};
use synapse_core::rule::DeriveEventRule;
use synapse_core::time::{TimeUnit, TimeWindow};
use synapse_core::watch::{PatternListener, PatternMatch, PatternWatcher, WatchSpec};
use synapse_core::watch::composition::{CompositionFired, PatternCompositionSpec};
use synapse_core::{SynapseConfig, SynapseRuntime};

fn event_at(event_type: &str, domain: &str, at: chrono::DateTime<Utc>) -> Event {
    Event::new(event_type, domain, PropertyMap::new(), at)
}

/// S1 — siblings via shared derivation.
#[test]
fn s1_siblings_via_shared_derivation() {
    let runtime = SynapseRuntime::new(SynapseConfig::for_tests());
    runtime
        .register_rule(DeriveEventRule::new(
            "cpu-cluster",
            ["cpu_status_changed".to_string()],
            Condition::new()
                .has_peers(None)
                .with_counter(Counter::at_least(2))
                .within(TimeWindow::new(24, TimeUnit::Hour)),
            EventTemplate::new("cpu_critical", "infra", PropertyMap::new()),
        ))
        .unwrap();

    let now = Utc::now();
    let a = runtime.ingest(event_at("cpu_status_changed", "infra", now)).unwrap();
    let b = runtime.ingest(event_at("cpu_status_changed", "infra", now + Duration::minutes(1))).unwrap();
    let c = runtime.ingest(event_at("cpu_status_changed", "infra", now + Duration::minutes(2))).unwrap();

    let criticals = runtime.network().get_by_type("cpu_critical").unwrap();
    assert_eq!(criticals.len(), 1);
    let critical_id = criticals[0].id;

    let children = synapse_core::network::relations::children(runtime.network(), critical_id).unwrap();
    assert_eq!(children, std::collections::BTreeSet::from([a, b, c]));

    let siblings_of_a = synapse_core::network::relations::siblings(runtime.network(), a).unwrap();
    assert_eq!(siblings_of_a, std::collections::BTreeSet::from([b, c]));
}

/// S5 — time-window exclusion: peers more than the window apart never derive.
#[test]
fn s5_time_window_exclusion() {
    let runtime = SynapseRuntime::new(SynapseConfig::for_tests());
    runtime
        .register_rule(DeriveEventRule::new(
            "risk-cluster",
            ["high_risk".to_string()],
            Condition::new().has_peers(None).within(TimeWindow::new(2, TimeUnit::Hour)),
            EventTemplate::new("risk_cluster", "infra", PropertyMap::new()),
        ))
        .unwrap();

    let now = Utc::now();
    runtime.ingest(event_at("high_risk", "infra", now)).unwrap();
    runtime.ingest(event_at("high_risk", "infra", now + Duration::hours(3))).unwrap();

    assert!(runtime.network().get_by_type("risk_cluster").unwrap().is_empty());
}

/// S6 — property filter: only the matching subset derives.
#[test]
fn s6_property_filter() {
    let runtime = SynapseRuntime::new(SynapseConfig::for_tests());
    let mut required = PropertyMap::new();
    required.insert("level".into(), "critical".into());
    runtime
        .register_rule(DeriveEventRule::new(
            "critical-only",
            ["reading".to_string()],
            Condition::new().is_type_of("reading").with_properties(required),
            EventTemplate::new("critical_alert", "infra", PropertyMap::new()),
        ))
        .unwrap();

    let mut critical_props = PropertyMap::new();
    critical_props.insert("level".into(), "critical".into());
    runtime.ingest(Event::new("reading", "infra", critical_props, Utc::now())).unwrap();

    let mut warning_props = PropertyMap::new();
    warning_props.insert("level".into(), "warning".into());
    runtime.ingest(Event::new("reading", "infra", warning_props, Utc::now())).unwrap();

    assert_eq!(runtime.network().get_by_type("critical_alert").unwrap().len(), 1);
}

/// Reduced S2 — cross-domain escalation propagated through two levels of
/// "peers of the previous level" rules.
#[test]
fn s2_reduced_cross_domain_escalation() {
    let runtime = SynapseRuntime::new(SynapseConfig::for_tests());
    runtime
        .register_rule(DeriveEventRule::new(
            "l1-intent-cluster",
            ["intent_flag".to_string()],
            Condition::new().has_peers(None).within(TimeWindow::new(6, TimeUnit::Hour)),
            EventTemplate::new("intent_cluster", "model", PropertyMap::new()),
        ))
        .unwrap();
    runtime
        .register_rule(DeriveEventRule::new(
            "l2-cross-domain-misuse",
            ["intent_cluster".to_string()],
            Condition::new().has_peers(None).within(TimeWindow::new(6, TimeUnit::Hour)),
            EventTemplate::new("cross_domain_misuse", "trust_and_safety", PropertyMap::new()),
        ))
        .unwrap();

    let now = Utc::now();
    for offset in 0..2 {
        runtime.ingest(event_at("intent_flag", "model", now + Duration::minutes(offset))).unwrap();
    }
    // A second independent pair, an hour later, to get two L1 clusters and
    // therefore two L2 escalations (peers of each other).
    for offset in 0..2 {
        runtime
            .ingest(event_at("intent_flag", "model", now + Duration::hours(1) + Duration::minutes(offset)))
            .unwrap();
    }

    assert!(runtime.network().get_by_type("intent_cluster").unwrap().len() >= 2);
    assert!(runtime.network().get_by_type("cross_domain_misuse").unwrap().len() >= 2);
}

#[derive(Default)]
struct Recorder {
    matches: Mutex<Vec<PatternMatch>>,
    compositions: Mutex<Vec<CompositionFired>>,
}

impl PatternListener for Recorder {
    fn on_pattern_match(&self, pattern_match: &PatternMatch) {
        self.matches.lock().unwrap().push(pattern_match.clone());
    }

    fn on_composition_fired(&self, fired: &CompositionFired) {
        self.compositions.lock().unwrap().push(fired.clone());
    }
}

/// S3 — pattern recurrence fires once the lineage signature hits `min_count`,
/// then on every subsequent occurrence.
#[test]
fn s3_pattern_recurrence_fires_from_min_count_onward() {
    let runtime = SynapseRuntime::new(SynapseConfig::for_tests());
    runtime
        .register_rule(DeriveEventRule::new(
            "spike-to-alert",
            ["cpu_spike".to_string()],
            Condition::new().is_type_of("cpu_spike"),
            EventTemplate::new("alert", "infra", PropertyMap::new()),
        ))
        .unwrap();

    let recorder = Arc::new(Recorder::default());
    runtime
        .register_pattern_watcher(
            PatternWatcher::new("repeated-alert", 1, 3, WatchSpec::of_type("alert")),
            recorder.clone(),
        )
        .unwrap();

    for _ in 0..5 {
        runtime.ingest(event_at("cpu_spike", "infra", Utc::now())).unwrap();
    }

    // Fires on occurrences 3, 4, 5 — three matches total.
    assert_eq!(recorder.matches.lock().unwrap().len(), 3);
}

/// S4 — pattern composition: zero composed events until both watched
/// patterns have each fired, then at least one composed event with edges
/// from each contributing pattern match.
#[test]
fn s4_pattern_composition_fires_once_both_patterns_recur() {
    let runtime = SynapseRuntime::new(SynapseConfig::for_tests());
    runtime
        .register_rule(DeriveEventRule::new(
            "governance-rule",
            ["governance_signal".to_string()],
            Condition::new().is_type_of("governance_signal"),
            EventTemplate::new("governance_action_required", "policy", PropertyMap::new()),
        ))
        .unwrap();
    runtime
        .register_rule(DeriveEventRule::new(
            "capability-rule",
            ["capability_signal".to_string()],
            Condition::new().is_type_of("capability_signal"),
            EventTemplate::new("emergent_capability_indicator", "model", PropertyMap::new()),
        ))
        .unwrap();

    let recorder = Arc::new(Recorder::default());
    runtime
        .register_pattern_watcher(
            PatternWatcher::new(
                "governance-watcher",
                1,
                3,
                WatchSpec::of_type("governance_action_required"),
            ),
            recorder.clone(),
        )
        .unwrap();
    runtime
        .register_pattern_watcher(
            PatternWatcher::new(
                "capability-watcher",
                1,
                3,
                WatchSpec::of_type("emergent_capability_indicator"),
            ),
            recorder.clone(),
        )
        .unwrap();

    runtime
        .register_composition(
            PatternCompositionSpec::new(
                "escalation-composition",
                [("governance-watcher".to_string(), 1), ("capability-watcher".to_string(), 1)],
                EventTemplate::new("composed_escalation", "policy", PropertyMap::new()),
            )
            .within(TimeWindow::new(30, TimeUnit::Day)),
            recorder.clone(),
        )
        .unwrap();

    for _ in 0..2 {
        runtime.ingest(event_at("governance_signal", "policy", Utc::now())).unwrap();
    }
    assert!(runtime.network().get_by_type("composed_escalation").unwrap().is_empty());

    for _ in 0..3 {
        runtime.ingest(event_at("capability_signal", "model", Utc::now())).unwrap();
    }
    // Governance watcher still hasn't reached min_count=3 yet.
    assert!(runtime.network().get_by_type("composed_escalation").unwrap().is_empty());

    runtime.ingest(event_at("governance_signal", "policy", Utc::now())).unwrap();

    let composed = runtime.network().get_by_type("composed_escalation").unwrap();
    assert_eq!(composed.len(), 1);
    let contributors = synapse_core::network::relations::children(runtime.network(), composed[0].id).unwrap();
    assert!(!contributors.is_empty());
}
