//! [`Condition`]: the network-agnostic predicate value object rules and
//! pattern watchers are built from, plus the token vocabulary
//! [`crate::expr::shunting_yard`] turns into rule-free-form into RPN.
//!
//! A `Condition` knows nothing about any particular [`crate::network::EventNetwork`]
//! or anchor event — it is pure data, built once with the fluent builder
//! methods below and compiled against a concrete (anchor, network) pair by
//! [`crate::expr::compiler::compile`] whenever a rule or watcher needs to
//! evaluate it.

use crate::event::value::PropertyMap;
use crate::time::TimeWindow;

/// The qualifiers a single relation-quantified term is evaluated against:
/// how far to walk (`max_depth`), how many matches are required
/// (`counter`), what window around the anchor's timestamp counts
/// (`time_window`), and what property values a matching event must carry
/// (`property_values`). Each `Has*` term in a condition carries its own set
/// — two siblings terms in the same condition can have different windows —
/// rather than one set shared across the whole token stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationQualifiers {
    pub max_depth: Option<u32>,
    pub counter: Option<Counter>,
    pub time_window: Option<TimeWindow>,
    pub property_values: Option<PropertyMap>,
}

/// A relation-quantified or attribute term in a condition's token stream.
///
/// `of_event_type` on the `Has*` variants restricts which related events
/// count toward the relation — "has at least one child, and that child is
/// of type X". Both `of_event_type` and `qualifiers` are term-local
/// parameters, never written back onto anything shared with sibling terms
/// in the same condition.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationTerm {
    /// The anchor's own event type equals the given value.
    IsTypeOf(String),
    /// The anchor's own event domain equals the given value.
    InDomain(String),
    /// The anchor has at least one contributor (optionally of a given type).
    HasChild { of_event_type: Option<String>, qualifiers: RelationQualifiers },
    /// The anchor has at least one transitive derived event within
    /// `qualifiers.max_depth` (optionally of a given type).
    HasDescendants { of_event_type: Option<String>, qualifiers: RelationQualifiers },
    /// The anchor shares a parent with at least one other event (optionally
    /// of a given type).
    HasSiblings { of_event_type: Option<String>, qualifiers: RelationQualifiers },
    /// When `of_event_type` equals the anchor's own type (or is unset): the
    /// anchor has at least one peer (same type+domain, parentless). When it
    /// names a different type: there exists a parentless event of that type,
    /// other than the anchor, satisfying `qualifiers`.
    HasPeers { of_event_type: Option<String>, qualifiers: RelationQualifiers },
    /// The anchor has at least one cousin within `qualifiers.max_depth`
    /// (optionally of a given type).
    HasCousin { of_event_type: Option<String>, qualifiers: RelationQualifiers },
}

impl RelationTerm {
    fn qualifiers_mut(&mut self) -> Option<&mut RelationQualifiers> {
        match self {
            RelationTerm::IsTypeOf(_) | RelationTerm::InDomain(_) => None,
            RelationTerm::HasChild { qualifiers, .. }
            | RelationTerm::HasDescendants { qualifiers, .. }
            | RelationTerm::HasSiblings { qualifiers, .. }
            | RelationTerm::HasPeers { qualifiers, .. }
            | RelationTerm::HasCousin { qualifiers, .. } => Some(qualifiers),
        }
    }

    /// The qualifiers carried by this term, or the default (unqualified) set
    /// for terms that don't carry any (`IsTypeOf`/`InDomain`).
    pub fn qualifiers(&self) -> &RelationQualifiers {
        static DEFAULT: RelationQualifiers =
            RelationQualifiers { max_depth: None, counter: None, time_window: None, property_values: None };
        match self {
            RelationTerm::IsTypeOf(_) | RelationTerm::InDomain(_) => &DEFAULT,
            RelationTerm::HasChild { qualifiers, .. }
            | RelationTerm::HasDescendants { qualifiers, .. }
            | RelationTerm::HasSiblings { qualifiers, .. }
            | RelationTerm::HasPeers { qualifiers, .. }
            | RelationTerm::HasCousin { qualifiers, .. } => qualifiers,
        }
    }
}

/// A token in a condition's infix expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Term(RelationTerm),
    And,
    Or,
    LParen,
    RParen,
}

/// A minimum- or exact-count qualifier applied to a `Has*` term's matched
/// set, in place of the default "at least one" semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    pub how_many: u64,
    pub how_many_or_more: bool,
}

impl Counter {
    #[must_use]
    pub const fn exactly(how_many: u64) -> Self {
        Self { how_many, how_many_or_more: false }
    }

    #[must_use]
    pub const fn at_least(how_many: u64) -> Self {
        Self { how_many, how_many_or_more: true }
    }

    #[must_use]
    pub const fn satisfied_by(self, count: u64) -> bool {
        if self.how_many_or_more {
            count >= self.how_many
        } else {
            count == self.how_many
        }
    }
}

/// A network-agnostic predicate: just the infix token stream. Every
/// relation-quantified term in the stream carries its own qualifiers (see
/// [`RelationQualifiers`]); `Condition` itself holds nothing shared between
/// terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    pub tokens: Vec<Token>,
}

impl Condition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, token: Token) -> Self {
        self.tokens.push(token);
        self
    }

    /// Mutate the qualifiers of the most recently pushed term. Intended only
    /// for the `with_*`/`within` builder methods below, which apply to
    /// "whatever `Has*` term I just wrote" rather than to the condition as a
    /// whole. Panics if called before any `Has*` term has been pushed, or if
    /// the most recent token isn't one (a builder misuse, not a runtime
    /// condition).
    fn last_term_qualifiers_mut(&mut self) -> &mut RelationQualifiers {
        match self.tokens.last_mut() {
            Some(Token::Term(term)) => term
                .qualifiers_mut()
                .expect("qualifier setters only apply to relation-quantified terms"),
            _ => panic!("qualifier setters must immediately follow a has_* term"),
        }
    }

    #[must_use]
    pub fn is_type_of(self, event_type: impl Into<String>) -> Self {
        self.push(Token::Term(RelationTerm::IsTypeOf(event_type.into())))
    }

    #[must_use]
    pub fn in_domain(self, event_domain: impl Into<String>) -> Self {
        self.push(Token::Term(RelationTerm::InDomain(event_domain.into())))
    }

    #[must_use]
    pub fn has_child(self, of_event_type: Option<String>) -> Self {
        self.push(Token::Term(RelationTerm::HasChild { of_event_type, qualifiers: RelationQualifiers::default() }))
    }

    #[must_use]
    pub fn has_descendants(self, of_event_type: Option<String>) -> Self {
        self.push(Token::Term(RelationTerm::HasDescendants {
            of_event_type,
            qualifiers: RelationQualifiers::default(),
        }))
    }

    #[must_use]
    pub fn has_siblings(self, of_event_type: Option<String>) -> Self {
        self.push(Token::Term(RelationTerm::HasSiblings { of_event_type, qualifiers: RelationQualifiers::default() }))
    }

    #[must_use]
    pub fn has_peers(self, of_event_type: Option<String>) -> Self {
        self.push(Token::Term(RelationTerm::HasPeers { of_event_type, qualifiers: RelationQualifiers::default() }))
    }

    #[must_use]
    pub fn has_cousin(self, of_event_type: Option<String>) -> Self {
        self.push(Token::Term(RelationTerm::HasCousin { of_event_type, qualifiers: RelationQualifiers::default() }))
    }

    #[must_use]
    pub fn and(self) -> Self {
        self.push(Token::And)
    }

    #[must_use]
    pub fn or(self) -> Self {
        self.push(Token::Or)
    }

    #[must_use]
    pub fn open(self) -> Self {
        self.push(Token::LParen)
    }

    #[must_use]
    pub fn close(self) -> Self {
        self.push(Token::RParen)
    }

    /// Set `max_depth` on the term just pushed (`has_descendants`/`has_cousin`).
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.last_term_qualifiers_mut().max_depth = Some(max_depth);
        self
    }

    /// Set the count qualifier on the term just pushed.
    #[must_use]
    pub fn with_counter(mut self, counter: Counter) -> Self {
        self.last_term_qualifiers_mut().counter = Some(counter);
        self
    }

    /// Set the time window on the term just pushed.
    #[must_use]
    pub fn within(mut self, window: TimeWindow) -> Self {
        self.last_term_qualifiers_mut().time_window = Some(window);
        self
    }

    /// Require the term just pushed's matches to carry these property values.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.last_term_qualifiers_mut().property_values = Some(properties);
        self
    }
}
