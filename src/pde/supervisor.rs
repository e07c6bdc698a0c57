//! Fans the reaction and diffusion sweeps of one PDE step out over disjoint cell
//! ranges: a `rayon` `par_iter_mut` over chunks of the population, each worker
//! borrowing its own scratch buffer from a [`ThreadLocal`] rather than allocating
//! one per cell.
use std::cell::RefCell;

use rayon::prelude::*;
use thread_local::ThreadLocal;

use crate::geometry::Geometry;
use crate::module::{Module, PlayerUpdate};
use crate::pde::{diffuse_cell, react_cell, PdeConfig, PdeState};

/// Runs one full PDE sub-step (reaction sweep, then diffusion+advection sweep) over
/// `state`, splitting both sweeps across worker threads when the population is large
/// enough to be worth it.
#[allow(clippy::too_many_arguments)]
pub fn step(
    module: &(dyn Module + Sync),
    geometry: &Geometry,
    policy: PlayerUpdate,
    config: &PdeConfig,
    dependent: Option<usize>,
    vacant: Option<usize>,
    death_rate: f64,
    state: &mut PdeState,
) {
    let t = state.n_traits;
    let scratch: ThreadLocal<RefCell<Vec<f64>>> = ThreadLocal::new();

    let fitness_totals: Vec<f64> = state
        .density
        .par_chunks(t)
        .zip(state.next.par_chunks_mut(t))
        .map(|(cell, next_cell)| {
            let mut buf = scratch.get_or(|| RefCell::new(vec![0.0; t])).borrow_mut();
            react_cell(
                module,
                policy,
                cell,
                buf.as_mut_slice(),
                dependent,
                vacant,
                death_rate,
                config.noise,
                config.dt,
                next_cell,
            )
        })
        .collect();

    state.min_fitness = fitness_totals.iter().cloned().fold(f64::MAX, f64::min);
    state.max_fitness = fitness_totals.iter().cloned().fold(f64::MIN, f64::max);
    state.mean_fitness = fitness_totals.iter().sum::<f64>() / fitness_totals.len().max(1) as f64;

    let next_snapshot = state.next.clone();
    let next_of = |n: usize| next_snapshot[n * t..(n + 1) * t].to_vec();

    state
        .density
        .par_chunks_mut(t)
        .enumerate()
        .for_each(|(c, out_cell)| {
            diffuse_cell(geometry, c, next_of, config, dependent, out_cell);
        });

    state.time += config.dt;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::placeholders::TwoByTwoGame;
    use crate::rng::EvoRng;

    #[test]
    fn a_full_step_preserves_nonnegativity_everywhere() {
        let geo = Geometry::builder().square(6).build().unwrap();
        let game = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
        let mut config = PdeConfig::new(2);
        config.diffusion = vec![0.05, 0.05];
        config.dt = 0.001;
        config.check(&geo);

        let mut state = PdeState::new(geo.size(), 2);
        let mut rng = EvoRng::from_seed(3);
        crate::pde::init::apply(
            crate::pde::init::InitProfile::Random,
            &geo,
            &[0.3, 0.7],
            &[0.9, 0.1],
            &mut rng,
            &mut state.density,
        );

        for _ in 0..20 {
            step(&game, &geo, game.player_update(), &config, None, None, 0.0, &mut state);
        }
        assert!(state.density.iter().all(|&v| v >= 0.0));
    }
}
