//! Relation query cache, invalidated by revision snapshot.
//!
//! A [`CacheKey`] bundles everything a cached relation answer depends on:
//! which relation, which anchor, at what depth and filter, under what
//! condition qualifiers (folded into `cond_hash`), against which network
//! revisions. Any edge or event insertion bumps the relevant revision
//! counters ([`crate::network::RevisionSnapshot`]), which changes the key,
//! which makes the old entry unreachable — there is no explicit eviction,
//! just key drift, the same strategy the teacher's own cache components use.

use crate::event::value::PropertyMap;
use crate::event::EventId;
use crate::network::RevisionSnapshot;
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// Which relation a cache entry answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Children,
    Parents,
    Ancestors,
    Descendants,
    Siblings,
    Peers,
    Cousins,
}

/// Order-independent hash of a condition's `property_values`, used so that
/// two conditions with equal-as-maps but differently-inserted property
/// values produce the same cache key (`BTreeMap` already iterates sorted,
/// so this only needs to hash in iteration order).
#[must_use]
pub fn hash_property_values(values: Option<&PropertyMap>) -> u64 {
    let Some(values) = values else { return 0 };
    let mut hasher = blake3::Hasher::new();
    for (key, value) in values {
        hasher.update(key.as_bytes());
        hasher.update(&[0u8]);
        if let Ok(encoded) = serde_json::to_vec(value) {
            hasher.update(&encoded);
        }
        hasher.update(&[0u8]);
    }
    let bytes = hasher.finalize();
    let raw = bytes.as_bytes();
    u64::from_le_bytes([raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7]])
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: RelationKind,
    pub anchor: EventId,
    pub max_depth: u32,
    pub filter_type: Option<String>,
    pub cond_hash: u64,
    pub revisions: RevisionSnapshot,
}

/// A revision-keyed memoization table for relation query results.
#[derive(Debug, Default)]
pub struct RelationCache {
    entries: RwLock<HashMap<CacheKey, BTreeSet<EventId>>>,
}

impl RelationCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<BTreeSet<EventId>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, value: BTreeSet<EventId>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, value);
        }
    }

    /// Return the cached value for `key` if present, otherwise run
    /// `compute`, cache its result, and return it.
    pub fn get_or_compute<F, E>(&self, key: CacheKey, compute: F) -> Result<BTreeSet<EventId>, E>
    where
        F: FnOnce() -> Result<BTreeSet<EventId>, E>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let computed = compute()?;
        self.insert(key, computed.clone());
        Ok(computed)
    }

    /// Number of entries currently cached, including ones made unreachable
    /// by a revision bump (they are simply never looked up again).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
