//! The plist-style persisted-state snapshot (§6), realised concretely as a
//! `serde`-derived struct encoded with `serde_json` -- the property-list *format*
//! itself is an excluded external collaborator (§1), but the core still needs to
//! produce *a* key/value document, and JSON is the closest fit given the rest of
//! this crate's dependency stack (borrowed from `gifnksm-oxidris`, which has no
//! `serde` need of its own but demonstrates the idiom this crate reaches for).
use serde::{Deserialize, Serialize};

/// Which concrete backend a [`Snapshot`] was taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    Ibs,
    Ode,
    Sde,
    Pde,
}

/// Per-species IBS fields (§6): present only when `backend == Ibs`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IbsSnapshot {
    pub strategies: Vec<usize>,
    pub fitness: Vec<f64>,
    pub interactions: Vec<u32>,
}

/// A complete, restorable snapshot of one [`super::Model`]'s state. Restoring this
/// and continuing the run must reproduce the exact same forward trajectory
/// (byte-equivalence, §8), which is why the RNG seed and consumed-word count are
/// part of the document rather than left for the caller to track separately.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generation: f64,
    pub realtime: f64,
    pub model: BackendKind,
    pub state: Vec<f64>,
    pub state_change: Vec<f64>,
    pub fitness: Option<Vec<f64>>,
    pub dt: f64,
    pub forward: bool,
    pub adjusted_dynamics: bool,
    pub accuracy: f64,
    pub ibs: Option<IbsSnapshot>,
    pub rng_seed: u64,
    pub rng_words_consumed: u64,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
