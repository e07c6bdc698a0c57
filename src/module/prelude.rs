//! Convenience re-exports for implementing or consuming a [`Module`](super::Module).
pub use super::placeholders::{MoranConstantSelection, RockPaperScissors, TwoByTwoGame};
pub use super::{Capability, Module, MutationKind, PlayerUpdate, PopulationUpdate, ScoreReset};
pub use crate::fitness_map::FitnessMap;
