//! Rules: the binding between a set of anchor event types, a predicate, and
//! a derived-event template.
//!
//! A [`DeriveEventRule`] is the unit [`crate::runtime::SynapseRuntime`]
//! evaluates on every ingested event of a matching type. `process` is the
//! spec's `Process(event) -> (satisfied, contributors, error)`: it returns
//! the contributor set on success, or `Err(SynapseError::NotSatisfied)` —
//! a control signal, not a failure — when the predicate does not hold.

use crate::error::Result;
use crate::event::{EventId, EventTemplate};
use crate::expr::compiler::compile;
use crate::expr::condition::Condition;
use crate::expr::eval::{evaluate, matched_contributors};
use crate::network::EventNetwork;
use std::collections::BTreeSet;

/// A rule's identity, assigned at registration. Rules are referenced by
/// name in logs and in [`crate::runtime::SynapseRuntime`]'s rule registry.
pub type RuleId = String;

/// Binds a predicate to the event types it anchors on and the template it
/// materializes when satisfied.
#[derive(Debug, Clone)]
pub struct DeriveEventRule {
    pub id: RuleId,
    pub anchor_types: BTreeSet<String>,
    pub condition: Condition,
    pub template: EventTemplate,
}

impl DeriveEventRule {
    #[must_use]
    pub fn new(
        id: impl Into<RuleId>,
        anchor_types: impl IntoIterator<Item = String>,
        condition: Condition,
        template: EventTemplate,
    ) -> Self {
        Self {
            id: id.into(),
            anchor_types: anchor_types.into_iter().collect(),
            condition,
            template,
        }
    }

    /// Whether this rule is a candidate to evaluate for an event of
    /// `event_type`.
    #[must_use]
    pub fn applies_to_type(&self, event_type: &str) -> bool {
        self.anchor_types.contains(event_type)
    }

    /// Evaluate this rule for `anchor`. On success, returns the contributor
    /// set (the anchor plus every event its predicate's relation terms
    /// matched) the runtime should draw edges from into the derived event.
    /// Returns [`crate::error::SynapseError::NotSatisfied`] — swallowed by
    /// the runtime — when the predicate evaluates to `false`.
    pub fn process(&self, anchor: EventId, network: &EventNetwork) -> Result<BTreeSet<EventId>> {
        let expr = compile(&self.condition, anchor, network)?;
        if evaluate(&expr, anchor, network)? {
            matched_contributors(&expr, anchor, network)
        } else {
            Err(crate::error::SynapseError::NotSatisfied { anchor })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::value::PropertyMap;
    use crate::event::Event;
    use chrono::Utc;

    #[test]
    fn process_returns_not_satisfied_when_predicate_fails() {
        let net = EventNetwork::new();
        let anchor = net
            .add_event(Event::new("cpu_spike", "infra", PropertyMap::new(), Utc::now()))
            .unwrap();
        let rule = DeriveEventRule::new(
            "always-needs-sibling",
            ["cpu_spike".to_string()],
            Condition::new().has_siblings(None),
            EventTemplate::new("alert", "infra", PropertyMap::new()),
        );
        let err = rule.process(anchor, &net).unwrap_err();
        assert!(err.is_not_satisfied());
    }

    #[test]
    fn process_returns_contributors_when_predicate_holds() {
        let net = EventNetwork::new();
        let anchor = net
            .add_event(Event::new("cpu_spike", "infra", PropertyMap::new(), Utc::now()))
            .unwrap();
        let rule = DeriveEventRule::new(
            "self-typed",
            ["cpu_spike".to_string()],
            Condition::new().is_type_of("cpu_spike"),
            EventTemplate::new("alert", "infra", PropertyMap::new()),
        );
        let contributors = rule.process(anchor, &net).unwrap();
        assert!(contributors.contains(&anchor));
    }

    #[test]
    fn applies_to_type_checks_membership() {
        let rule = DeriveEventRule::new(
            "r",
            ["a".to_string(), "b".to_string()],
            Condition::new().has_peers(None),
            EventTemplate::new("x", "y", PropertyMap::new()),
        );
        assert!(rule.applies_to_type("a"));
        assert!(!rule.applies_to_type("c"));
    }
}
