//! `evo-dynamics`: the simulation core of an evolutionary-game research engine.
//!
//! A uniform substrate evolves a population of traits through time under four
//! interchangeable dynamical backends -- individual-based stochastic simulation
//! ([`ibs`]), ordinary differential equations ([`ode`]), stochastic differential
//! equations ([`sde`]), and reaction-diffusion-advection partial differential
//! equations ([`pde`]) -- all driven through the common lifecycle in [`model`].
//!
//! A [`module::Module`] supplies the domain-specific payoff kernels and policy
//! knobs; a [`geometry::Geometry`] supplies the neighbourhood structure IBS and PDE
//! run on; a [`model::Model`] binds one module to one concrete backend and exposes
//! `load/check/reset/init/next/relax/unload` plus milestone and change listeners.
//!
//! ```
//! use evo_dynamics::model::{Backend, Model};
//! use evo_dynamics::module::placeholders::TwoByTwoGame;
//! use evo_dynamics::ode::OdeState;
//!
//! let snowdrift = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
//! let backend = Backend::Ode {
//!     state: OdeState::new(&[2]),
//!     config: Default::default(),
//! };
//! let mut model = Model::new(snowdrift, backend, 1, 0.1);
//! model.init_frequencies(&[0.5, 0.5]);
//! while model.next() {}
//! ```
pub mod errors;
pub mod fitness_map;
pub mod geometry;
pub mod ibs;
pub mod model;
pub mod module;
pub mod ode;
pub mod pde;
pub mod rng;
pub mod sde;

pub use errors::{CheckReport, CheckWarning, TryFromBuilderError};
pub use fitness_map::FitnessMap;
pub use geometry::{Geometry, GeometryBuilder, LatticeType};
pub use model::{Backend, Mode, Model};
pub use module::{Capability, Module, MutationKind, PlayerUpdate, PopulationUpdate, ScoreReset};
pub use rng::EvoRng;
