//! In-process tunables for the runtime, memory, and composition subsystems.
//!
//! `SynapseConfig` is not a file or environment loader — external
//! configuration loading is explicitly out of scope for this core (spec.md
//! §1 lists it as an external collaborator). It exists so the values the
//! spec leaves implementation-defined (signature depth, bounded sample
//! sizes, cleanup cadence) are constructor arguments instead of magic
//! numbers, and so tests can inject small values deterministically.

use std::time::Duration;

/// Tunables shared by [`crate::runtime::SynapseRuntime`],
/// [`crate::memory::StructuralMemory`], and
/// [`crate::watch::composition::PatternCompositionWatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynapseConfig {
    /// Maximum k-hop depth for which lineage signatures (`Sig_k`) are
    /// computed and tracked. Watchers requesting a depth beyond this bound
    /// never fire.
    pub max_signature_depth: u32,

    /// Maximum number of instance samples retained per `MotifStats` entry.
    pub motif_sample_cap: usize,

    /// Maximum number of instance samples retained per `LineageStats` entry.
    pub lineage_sample_cap: usize,

    /// Minimum wall-clock interval between a
    /// [`crate::watch::composition::PatternCompositionWatcher`]'s recent-match
    /// cleanup passes ("≥ once per minute" in spec.md §4.9, made injectable).
    pub composition_cleanup_interval: Duration,
}

impl Default for SynapseConfig {
    fn default() -> Self {
        Self {
            max_signature_depth: 4,
            motif_sample_cap: 8,
            lineage_sample_cap: 8,
            composition_cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl SynapseConfig {
    /// A config with a tiny cleanup interval, for tests that want to
    /// observe composition cleanup without sleeping a full minute.
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            composition_cleanup_interval: Duration::from_millis(0),
            ..Self::default()
        }
    }
}
