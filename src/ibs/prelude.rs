//! Convenience re-exports for driving the IBS core directly.
pub use super::driver::{
    async_event, homogeneous_fast_path, sync_step, wright_fisher_step, IbsClock, IbsConfig, SpeciesSelect,
};
pub use super::migration::MigrationKind;
pub use super::population::IbsPopulation;
pub use super::sampler::GroupSampler;
pub use crate::module::prelude::*;
