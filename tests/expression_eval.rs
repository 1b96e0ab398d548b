//! Expression-level integration tests beyond the inline unit tests in
//! `src/expr/eval.rs`: boolean composition with parentheses, property
//! filters, and symmetric vs. asymmetric time windows.

use chrono::{Duration, Utc};
use synapse_core::event::value::PropertyMap;
use synapse_core::event::Event;
use synapse_core::expr::compiler::compile;
use synapse_core::expr::condition::Condition;
use synapse_core::expr::eval::evaluate;
use synapse_core::time::{TimeUnit, TimeWindow};
use synapse_core::EventNetwork;

fn leaf(network: &EventNetwork, event_type: &str, domain: &str) -> synapse_core::EventId {
    network.add_event(Event::new(event_type, domain, PropertyMap::new(), Utc::now())).unwrap()
}

fn leaf_at(
    network: &EventNetwork,
    event_type: &str,
    domain: &str,
    at: chrono::DateTime<Utc>,
) -> synapse_core::EventId {
    network.add_event(Event::new(event_type, domain, PropertyMap::new(), at)).unwrap()
}

#[test]
fn parenthesized_or_changes_grouping() {
    let net = EventNetwork::new();
    let anchor = leaf(&net, "cpu_spike", "infra");

    // (type=mem OR domain=infra) AND type=cpu_spike — without the
    // parentheses, AND would bind to domain=infra first and still pass,
    // so this isn't discriminating; use a case where grouping flips the
    // verdict: type=mem_spike OR (domain=other AND type=cpu_spike).
    let cond = Condition::new()
        .is_type_of("mem_spike")
        .or()
        .open()
        .in_domain("other")
        .and()
        .is_type_of("cpu_spike")
        .close();
    let expr = compile(&cond, anchor, &net).unwrap();
    assert!(!evaluate(&expr, anchor, &net).unwrap());

    let cond2 = Condition::new().is_type_of("mem_spike").or().in_domain("infra").and().is_type_of("cpu_spike");
    let expr2 = compile(&cond2, anchor, &net).unwrap();
    assert!(evaluate(&expr2, anchor, &net).unwrap());
}

#[test]
fn property_filter_requires_exact_value_match() {
    let net = EventNetwork::new();
    let mut critical_props = PropertyMap::new();
    critical_props.insert("level".into(), "critical".into());
    let anchor = net.add_event(Event::new("alert", "infra", PropertyMap::new(), Utc::now())).unwrap();
    let critical = net.add_event(Event::new("cpu_spike", "infra", critical_props, Utc::now())).unwrap();
    let mut warning_props = PropertyMap::new();
    warning_props.insert("level".into(), "warning".into());
    let warning = net.add_event(Event::new("cpu_spike", "infra", warning_props, Utc::now())).unwrap();
    net.add_edge(critical, anchor, "rule-x").unwrap();
    net.add_edge(warning, anchor, "rule-x").unwrap();

    let mut expected = PropertyMap::new();
    expected.insert("level".into(), "critical".into());
    let cond = Condition::new().has_child(None).with_properties(expected);
    let expr = compile(&cond, anchor, &net).unwrap();
    assert!(evaluate(&expr, anchor, &net).unwrap());

    let matched = synapse_core::expr::eval::matched_contributors(&expr, anchor, &net).unwrap();
    assert!(matched.contains(&critical));
    assert!(!matched.contains(&warning));
}

#[test]
fn symmetric_window_admits_events_on_either_side_of_the_anchor() {
    let net = EventNetwork::new();
    let now = Utc::now();
    let anchor = leaf_at(&net, "alert", "infra", now);
    let earlier = leaf_at(&net, "cpu_spike", "infra", now - Duration::hours(1));
    let later = leaf_at(&net, "cpu_spike", "infra", now + Duration::hours(1));
    net.add_edge(earlier, anchor, "rule-x").unwrap();
    net.add_edge(later, anchor, "rule-x").unwrap();

    let cond = Condition::new().has_child(None).within(TimeWindow::new(2, TimeUnit::Hour));
    let expr = compile(&cond, anchor, &net).unwrap();
    let matched = synapse_core::expr::eval::matched_contributors(&expr, anchor, &net).unwrap();
    assert!(matched.contains(&earlier));
    assert!(matched.contains(&later));
}

#[test]
fn sibling_window_excludes_events_newer_than_the_anchor() {
    let net = EventNetwork::new();
    let now = Utc::now();
    let parent = leaf_at(&net, "alert", "infra", now);
    let anchor = leaf_at(&net, "cpu_spike", "infra", now);
    let older_sibling = leaf_at(&net, "cpu_spike", "infra", now - Duration::hours(1));
    let newer_sibling = leaf_at(&net, "cpu_spike", "infra", now + Duration::hours(1));
    net.add_edge(anchor, parent, "rule-x").unwrap();
    net.add_edge(older_sibling, parent, "rule-x").unwrap();
    net.add_edge(newer_sibling, parent, "rule-x").unwrap();

    let cond = Condition::new().has_siblings(None).within(TimeWindow::new(2, TimeUnit::Hour));
    let expr = compile(&cond, anchor, &net).unwrap();
    let matched = synapse_core::expr::eval::matched_contributors(&expr, anchor, &net).unwrap();
    assert!(matched.contains(&older_sibling));
    assert!(!matched.contains(&newer_sibling));
}

#[test]
fn exactly_counter_rejects_too_many_matches() {
    let net = EventNetwork::new();
    let anchor = leaf(&net, "alert", "infra");
    let a = leaf(&net, "cpu_spike", "infra");
    let b = leaf(&net, "cpu_spike", "infra");
    net.add_edge(a, anchor, "rule-x").unwrap();
    net.add_edge(b, anchor, "rule-x").unwrap();

    let cond = Condition::new()
        .has_child(None)
        .with_counter(synapse_core::expr::condition::Counter::exactly(1));
    let expr = compile(&cond, anchor, &net).unwrap();
    assert!(!evaluate(&expr, anchor, &net).unwrap());
}
