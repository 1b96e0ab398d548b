//! Pattern composition: combining named pattern-watcher matches into a
//! higher-order derived event once every required pattern has recurred
//! often enough, optionally within a shared time window.
//!
//! A [`PatternCompositionWatcher`] does not watch the network directly —
//! [`crate::runtime::SynapseRuntime`] feeds it [`PatternMatch`](super::PatternMatch)
//! occurrences keyed by the originating watcher's id via [`PatternCompositionWatcher::record_match`].
//! Once every identifier in [`PatternCompositionSpec::required`] has been
//! seen at least its required number of times (within the time window, if
//! one is set), `record_match` returns a [`CompositionFired`] describing
//! the derived event the runtime should materialize and the contributor
//! events (the matched occurrences themselves) it should draw edges from.

use crate::event::{EventId, EventTemplate};
use crate::time::TimeWindow;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::RwLock;
use std::time::{Duration as StdDuration, Instant};

/// The recurrence requirement for a pattern composition.
#[derive(Debug, Clone)]
pub struct PatternCompositionSpec {
    pub composition_id: String,
    /// Pattern-watcher id -> minimum number of recent occurrences required.
    pub required: BTreeMap<String, u64>,
    /// If set, only occurrences within this window of "now" count toward a
    /// pattern's required occurrence count.
    pub time_window: Option<TimeWindow>,
    pub template: EventTemplate,
    /// Whether a successful firing clears recorded occurrences. Defaults to
    /// `false` in the constructor the runtime uses (spec.md §12): a
    /// composition can keep firing on the same accumulated matches.
    pub reset_on_fire: bool,
}

impl PatternCompositionSpec {
    #[must_use]
    pub fn new(
        composition_id: impl Into<String>,
        required: impl IntoIterator<Item = (String, u64)>,
        template: EventTemplate,
    ) -> Self {
        Self {
            composition_id: composition_id.into(),
            required: required.into_iter().collect(),
            time_window: None,
            template,
            reset_on_fire: false,
        }
    }

    #[must_use]
    pub fn within(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    #[must_use]
    pub fn reset_on_fire(mut self, reset: bool) -> Self {
        self.reset_on_fire = reset;
        self
    }
}

/// What a successful composition firing asks the runtime to do.
#[derive(Debug, Clone)]
pub struct CompositionFired {
    pub composition_id: String,
    pub contributors: BTreeSet<EventId>,
    pub template: EventTemplate,
}

#[derive(Debug, Clone)]
struct RecentMatch {
    event: EventId,
    at: DateTime<Utc>,
}

/// Stateful accumulator for one [`PatternCompositionSpec`].
#[derive(Debug)]
pub struct PatternCompositionWatcher {
    spec: PatternCompositionSpec,
    recent: RwLock<BTreeMap<String, VecDeque<RecentMatch>>>,
    last_cleanup: RwLock<Instant>,
    cleanup_interval: StdDuration,
}

impl PatternCompositionWatcher {
    #[must_use]
    pub fn new(spec: PatternCompositionSpec, cleanup_interval: StdDuration) -> Self {
        Self {
            spec,
            recent: RwLock::new(BTreeMap::new()),
            last_cleanup: RwLock::new(Instant::now()),
            cleanup_interval,
        }
    }

    #[must_use]
    pub fn composition_id(&self) -> &str {
        &self.spec.composition_id
    }

    /// Record that pattern `identifier` matched on `event` at `at`. Returns
    /// `Some` if this record caused every required identifier to reach its
    /// threshold.
    pub fn record_match(&self, identifier: &str, event: EventId, at: DateTime<Utc>) -> Option<CompositionFired> {
        if !self.spec.required.contains_key(identifier) {
            return None;
        }
        self.maybe_cleanup(at);
        {
            let mut recent = self.recent.write().expect("composition lock poisoned");
            recent.entry(identifier.to_string()).or_default().push_back(RecentMatch { event, at });
        }
        self.evaluate(at)
    }

    fn maybe_cleanup(&self, now: DateTime<Utc>) {
        let Some(window) = &self.spec.time_window else { return };
        let mut last = self.last_cleanup.write().expect("composition lock poisoned");
        if last.elapsed() < self.cleanup_interval {
            return;
        }
        *last = Instant::now();
        let cutoff = now - window.duration();
        let mut recent = self.recent.write().expect("composition lock poisoned");
        for queue in recent.values_mut() {
            while queue.front().map(|m| m.at < cutoff).unwrap_or(false) {
                queue.pop_front();
            }
        }
    }

    fn evaluate(&self, now: DateTime<Utc>) -> Option<CompositionFired> {
        let recent = self.recent.read().expect("composition lock poisoned");
        let mut contributors = BTreeSet::new();
        for (identifier, min_count) in &self.spec.required {
            let queue = recent.get(identifier)?;
            let in_window: Vec<&RecentMatch> = match &self.spec.time_window {
                Some(window) => {
                    let cutoff = now - window.duration();
                    queue.iter().filter(|m| m.at >= cutoff).collect()
                }
                None => queue.iter().collect(),
            };
            if (in_window.len() as u64) < *min_count {
                return None;
            }
            contributors.extend(in_window.iter().map(|m| m.event));
        }
        drop(recent);

        if self.spec.reset_on_fire {
            let mut recent = self.recent.write().expect("composition lock poisoned");
            recent.clear();
        }

        Some(CompositionFired {
            composition_id: self.spec.composition_id.clone(),
            contributors,
            template: self.spec.template.clone(),
        })
    }
}
