//! Convenience re-exports for driving the ODE core directly.
pub use super::{
    compute_fitness, converged, correct_drift, derivative, ecology_derivative, euler_step_clamped,
    is_monomorphic, normalize_frequency, OdeConfig, OdeState, SpeciesSlice, ODE_MIN_STEP,
};
pub use crate::module::prelude::*;
