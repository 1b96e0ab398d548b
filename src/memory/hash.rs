//! Lineage signature hashing.
//!
//! A `Sig_k` is a 64-bit, order-independent (multiset) fingerprint of an
//! event's k-hop derivation shape: what type+domain it is, and what shapes
//! its contributors had at depth `k - 1`. Two events with the same `Sig_k`
//! look alike k hops deep regardless of which rule produced them or what
//! order their contributors were listed in — that's the whole point of
//! excluding `rule_id` from the hash and sorting `prev_sigs` first.

/// Base signature (`Sig_0`): a fingerprint of an event's type and domain
/// alone, with no contributor shape folded in yet.
#[must_use]
pub fn hash_base(event_type: &str, event_domain: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(event_type.as_bytes());
    hasher.update(&[0u8]);
    hasher.update(event_domain.as_bytes());
    truncate(hasher.finalize())
}

/// Fold a set of depth-`k-1` contributor signatures into a depth-`k`
/// lineage signature for an event whose own base signature is `base_sig`.
///
/// `rule_id` is accepted for symmetry with the source model's call sites
/// (and so a future caller can log which rule produced a given shape) but
/// is deliberately excluded from the hash itself: two derivations with an
/// identical contributor shape are the same motif-shape regardless of
/// which rule happened to fire, per spec. `prev_sigs` is sorted before
/// hashing so the result does not depend on contributor enumeration order.
#[must_use]
pub fn hash_lineage(depth: u32, base_sig: u64, rule_id: &str, prev_sigs: &[u64]) -> u64 {
    let _ = rule_id;
    let mut sorted = prev_sigs.to_vec();
    sorted.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    hasher.update(&depth.to_le_bytes());
    hasher.update(&base_sig.to_le_bytes());
    for sig in &sorted {
        hasher.update(&sig.to_le_bytes());
    }
    truncate(hasher.finalize())
}

fn truncate(hash: blake3::Hash) -> u64 {
    let bytes = hash.as_bytes();
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}
