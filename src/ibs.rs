//! Individual-based stochastic simulation (§4.5): per-species site populations,
//! group samplers, migration, and the asynchronous/synchronous steppers.
pub mod driver;
pub mod migration;
pub mod population;
pub mod prelude;
pub mod sampler;
