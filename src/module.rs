//! The domain plug-in contract (§4.1): payoff kernels, trait bookkeeping,
//! player-update and population-update policy, mutation policy.
//!
//! A [`Module`] must be pure with respect to the arguments it receives -- no hidden
//! mutable state -- so the PDE supervisor can call it from multiple worker threads
//! (§4.1, last paragraph).
pub mod placeholders;
pub mod prelude;

use crate::fitness_map::FitnessMap;

/// Which of the five interaction/scoring capabilities a [`Module`] supports.
/// The core queries this once at `load` and dispatches accordingly (§9).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Capability {
    /// Discrete pairwise interactions (IBS, `nGroup == 2`).
    pub d_pairs: bool,
    /// Discrete group interactions (IBS, `nGroup > 2`).
    pub d_groups: bool,
    /// Continuous (mean-field) pairwise payoff, used by ODE/SDE/PDE.
    pub c_pairs: bool,
    /// Continuous group payoff.
    pub c_groups: bool,
    /// Exposes a constant, precomposed score table instead of computing payoffs.
    pub static_scores: bool,
}

/// Rule by which one individual (IBS) or one infinitesimal slice of frequency
/// (ODE/SDE/PDE) revises its trait, given the current fitness vector (§4.2).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlayerUpdate {
    Thermal,
    Best,
    BestResponse,
    Imitate,
    ImitateBetter,
    Proportional,
    /// IBS only: the focal simply samples a new trait uniformly at random.
    Random,
}

/// Rule by which the set of individuals to update is chosen (IBS only, §4.5).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PopulationUpdate {
    Sync { fraction: f64 },
    WrightFisher,
    Async,
    Once,
    MoranBirthDeath,
    MoranDeathBirth,
    MoranImitate,
    Ecology,
}

impl PopulationUpdate {
    pub fn is_synchronous(&self) -> bool {
        matches!(self, PopulationUpdate::Sync { .. } | PopulationUpdate::WrightFisher)
    }
}

/// When scores reset relative to trait changes (IBS, `--resetscores`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScoreReset {
    OnChange,
    OnUpdate,
    Ephemeral,
}

/// Discrete or continuous mutation operator applied after deterministic drift (§4.1).
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MutationKind {
    None,
    /// Mutate to a uniformly random other trait, at rate `rate`.
    Uniform { rate: f64 },
    /// Continuous Gaussian perturbation with the given standard deviation, at rate `rate`.
    Gaussian { rate: f64, sigma: f64 },
}

impl MutationKind {
    pub fn rate(&self) -> f64 {
        match self {
            MutationKind::None => 0.0,
            MutationKind::Uniform { rate } | MutationKind::Gaussian { rate, .. } => *rate,
        }
    }
}

/// The domain plug-in: payoff kernels plus the policy knobs that go with them.
///
/// Not `Clone`: the core always holds a `Module` behind a shared reference (`&dyn
/// Module`), including across the PDE supervisor's worker threads, so implementations
/// never need to be duplicated -- only their scratch buffers are (via `thread_local`).
pub trait Module: Send + Sync + std::fmt::Debug {
    /// Number of traits `T`.
    fn trait_count(&self) -> usize;

    /// Index of the dependent trait (determined by normalisation), if any.
    fn dependent(&self) -> Option<usize>;

    /// Index of the vacant trait (empty space), if any.
    fn vacant(&self) -> Option<usize>;

    /// Interaction group size: `2` for pairwise, `>2` for group interactions.
    fn n_group(&self) -> usize;

    fn capability(&self) -> Capability;

    fn player_update(&self) -> PlayerUpdate;

    fn population_update(&self) -> PopulationUpdate {
        PopulationUpdate::Async
    }

    fn mutation(&self) -> MutationKind {
        MutationKind::None
    }

    fn fitness_map(&self) -> FitnessMap {
        FitnessMap::default()
    }

    /// Update rate `r > 0` relative to other species in a multi-species model.
    fn update_rate(&self) -> f64 {
        1.0
    }

    /// Per-capita death rate, consulted only when [`Module::vacant`] is `Some`.
    fn death_rate(&self) -> f64 {
        0.0
    }

    /// Pairwise payoff: `my_trait` against `k` opponents in `opp_traits[..k]`;
    /// writes each opponent's score into `out_scores[..k]` and returns the focal's
    /// total score. Side-effect-free on population state.
    fn pair_scores(&self, my_trait: usize, opp_traits: &[usize], out_scores: &mut [f64]) -> f64;

    /// Group payoff for one interaction of size `k+1` (`group_traits` holds the other
    /// `k` co-players); writes their scores into `out_scores` and returns the focal's
    /// total score.
    fn group_scores(&self, my_trait: usize, group_traits: &[usize], out_scores: &mut [f64]) -> f64 {
        // Default: degrade a group interaction into `k` independent pairwise ones,
        // the same fallback EvoLudo-style engines use when a module only implements
        // the pairwise kernel.
        self.pair_scores(my_trait, group_traits, out_scores)
    }

    /// Mean payoff per trait given the current frequency/density vector `state`
    /// (length `trait_count()`), used by ODE/SDE/PDE. `out_scores[i]` receives the
    /// mean payoff earned by an individual of trait `i`.
    fn avg_scores(&self, state: &[f64], out_scores: &mut [f64]);

    /// A constant score table, present only when `capability().static_scores`.
    fn static_scores(&self) -> Option<&[f64]> {
        None
    }
}
