//! synapse-core: a semantic derivation engine.
//!
//! An append-only, immutable [`network::EventNetwork`] — a DAG where edges
//! point from contributor to derived event, each tagged with the relation
//! that drew it (a rule id, or `"pattern_composition"`) — grows as events
//! are [`runtime::SynapseRuntime::ingest`]ed. A fluent predicate DSL
//! ([`expr`]) lets [`rule::DeriveEventRule`]s quantify over the network's
//! relation algebra ([`network::relations`]); the runtime evaluates and
//! materializes rules to a fixed point on every ingest, updates structural
//! memory ([`memory`]) with the motif and lineage shapes it observes, and
//! dispatches pattern watchers and compositions ([`watch`]) over each
//! materialization.
//!
//! # Modules
//!
//! - [`event`]: the `Event`/`EventId`/`EventTemplate` data model.
//! - [`network`]: `EventNetwork` and its relation algebra.
//! - [`expr`]: `Condition`, the shunting-yard compiler, and evaluation.
//! - [`rule`]: `DeriveEventRule`, the binding of predicate to template.
//! - [`runtime`]: `SynapseRuntime`, the ingest/materialize fixed-point loop.
//! - [`memory`]: motif and lineage shape tracking, relation caching.
//! - [`watch`]: pattern watchers and pattern composition.
//! - [`error`]: the crate's error taxonomy.
//! - [`config`]: in-process tunables.
//! - [`time`]: time-unit/time-window arithmetic for expression terms.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod event;
pub mod expr;
pub mod memory;
pub mod network;
pub mod rule;
pub mod runtime;
pub mod time;
pub mod watch;

pub use config::SynapseConfig;
pub use error::{Result, SynapseError, SynapseErrorCode};
pub use event::{Event, EventId, EventTemplate, ObservedEvent};
pub use network::EventNetwork;
pub use rule::{DeriveEventRule, RuleId};
pub use runtime::SynapseRuntime;
