//! End-to-end scenarios driven entirely through [`Model`], one per concrete
//! backend, mirroring a handful of textbook evolutionary-game outcomes.
use evo_dynamics::geometry::Geometry;
use evo_dynamics::ibs::driver::{IbsClock, IbsConfig};
use evo_dynamics::ibs::population::IbsPopulation;
use evo_dynamics::model::{Backend, Model};
use evo_dynamics::module::placeholders::{MoranConstantSelection, RockPaperScissors, TwoByTwoGame};
use evo_dynamics::ode::{self, OdeConfig, OdeState};
use evo_dynamics::pde::init::{self, InitProfile};
use evo_dynamics::pde::{PdeConfig, PdeState};
use evo_dynamics::sde::SdeConfig;

fn run_ode(game: TwoByTwoGame, y0: &[f64], steps: usize) -> Model<TwoByTwoGame> {
    let backend = Backend::Ode {
        state: OdeState::new(&[y0.len()]),
        config: OdeConfig::default(),
    };
    let mut model = Model::new(game, backend, 1, 0.1);
    model.init_frequencies(y0);
    for _ in 0..steps {
        if !model.next() {
            break;
        }
    }
    model
}

#[test]
fn snowdrift_converges_to_the_interior_mix() {
    let snowdrift = TwoByTwoGame::new(3.0, 1.0, 4.0, 0.0);
    let model = run_ode(snowdrift, &[0.9, 0.1], 2000);
    let snapshot = model.snapshot();
    let y = &snapshot.state;
    assert!((y[0] - 2.0 / 3.0).abs() < 0.05, "expected ~2/3 cooperators, got {y:?}");
}

#[test]
fn prisoners_dilemma_drives_defectors_to_fixation() {
    let pd = TwoByTwoGame::new(3.0, 0.0, 5.0, 1.0);
    let model = run_ode(pd, &[0.5, 0.5], 2000);
    let snapshot = model.snapshot();
    let y = &snapshot.state;
    assert!(y[1] > 0.95, "expected near-total defection, got {y:?}");
}

#[test]
fn rock_paper_scissors_under_demographic_noise_absorbs_in_a_corner_and_stays_there() {
    let rps = RockPaperScissors::default();
    let mut config = SdeConfig::new(30);
    config.ode.dt = 0.01;
    let backend = Backend::Sde {
        state: OdeState::new(&[3]),
        config,
    };
    let mut model = Model::new(rps, backend, 3, 1.0);
    model.init_frequencies(&[0.5, 0.3, 0.2]);

    for _ in 0..20_000 {
        if !model.next() {
            break;
        }
    }
    let snapshot = model.snapshot();
    let y = &snapshot.state;
    assert!(ode::is_monomorphic(y, None, None, 1e-3), "expected absorption at a corner, got {y:?}");

    let absorbed = y.clone();
    for _ in 0..50 {
        if !model.next() {
            break;
        }
    }
    let after_snapshot = model.snapshot();
    let after = &after_snapshot.state;
    for (a, b) in absorbed.iter().zip(after.iter()) {
        assert!((a - b).abs() < 1e-9, "an absorbed corner must not re-emerge without mutation");
    }
}

#[test]
fn pde_diffusion_preserves_rotational_symmetry_of_a_centered_circle() {
    let side = 8;
    let geometry = Geometry::builder().square(side).build().unwrap();
    let mut config = PdeConfig::new(2);
    config.diffusion = vec![0.05, 0.05];
    config.check(&geometry);

    let mut state = PdeState::new(geometry.size(), 2);
    let mut rng = evo_dynamics::rng::EvoRng::from_seed(1);
    init::apply(InitProfile::Circle, &geometry, &[0.5, 0.5], &[1.0, 0.0], &mut rng, &mut state.density);

    let game = TwoByTwoGame::new(1.0, 1.0, 1.0, 1.0); // a neutral game isolates pure diffusion
    let backend = Backend::Pde { geometry, state, config };
    let mut model = Model::new(game, backend, 1, 1.0);
    for _ in 0..20 {
        model.next();
    }

    // A centered, rotationally symmetric initial profile under isotropic diffusion
    // must keep the four 90-degree-rotated corners of the lattice in lockstep.
    let snapshot = model.snapshot();
    let cell = |x: usize, y: usize| (y * side + x) * 2;
    let corner_values: Vec<f64> = [(1, 1), (side - 2, 1), (side - 2, side - 2), (1, side - 2)]
        .iter()
        .map(|&(x, y)| snapshot.state[cell(x, y)])
        .collect();
    for v in &corner_values[1..] {
        assert!((v - corner_values[0]).abs() < 1e-9, "corners equidistant from center must match: {corner_values:?}");
    }
}

#[test]
fn pde_advection_carries_the_density_peak_around_the_ring() {
    let ring_size = 20;
    let geometry = Geometry::builder().linear(ring_size).build().unwrap();
    let game = TwoByTwoGame::new(1.0, 1.0, 1.0, 1.0);

    let mut config = PdeConfig::new(2);
    config.diffusion = vec![0.001, 0.001];
    config.advection = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
    config.advection[0][0] = 3.0;
    config.check(&geometry);

    let mut state = PdeState::new(geometry.size(), 2);
    let mut rng = evo_dynamics::rng::EvoRng::from_seed(2);
    init::apply(InitProfile::Perturbation, &geometry, &[0.5, 0.5], &[1.0, 0.0], &mut rng, &mut state.density);

    let peak_cell = |density: &[f64]| -> usize {
        (0..ring_size)
            .max_by(|&a, &b| density[a * 2].partial_cmp(&density[b * 2]).unwrap())
            .unwrap()
    };
    let start = peak_cell(&state.density);

    let backend = Backend::Pde { geometry, state, config };
    let mut model = Model::new(game, backend, 2, 1.0);
    for _ in 0..50 {
        model.next();
    }
    let final_snapshot = model.snapshot();
    let end = peak_cell(&final_snapshot.state);
    assert_ne!(start, end, "a nonzero advection coefficient must move the density peak");
}

#[test]
fn moran_birth_death_amplifier_eventually_fixes_or_extinguishes_the_mutant() {
    let geometry = Geometry::builder().meanfield(12).build().unwrap();
    let moran = MoranConstantSelection::new(3.0);
    let mut population = IbsPopulation::new(geometry.size(), 1);
    population.traits[0] = 0;
    population.fitness = vec![1.0; geometry.size()];
    population.fitness[0] = moran.relative_fitness;

    let backend = Backend::Ibs {
        geometry,
        population,
        config: IbsConfig::default(),
        clock: IbsClock::default(),
    };
    let mut model = Model::new(moran, backend, 4, 1.0);

    let mut steps = 0;
    while model.next() && steps < 50_000 {
        let strategies = model.snapshot().ibs.unwrap().strategies;
        let mutants = strategies.iter().filter(|&&t| t == 0).count();
        if mutants == 0 || mutants == strategies.len() {
            break;
        }
        steps += 1;
    }
    let strategies = model.snapshot().ibs.unwrap().strategies;
    let mutants = strategies.iter().filter(|&&t| t == 0).count();
    assert!(mutants == 0 || mutants == strategies.len(), "population must reach an absorbing state");
}
